//! Application is the composition root: it owns the [`Registry`], exposes the
//! registration surface and hands a [`Dispatcher`] to the server.
//!
//! # Examples
//!
//! ```no_run
//! use trellis::app::Application;
//!
//! let mut app = Application::new();
//! app.get("/hello", |_req, _res| Ok("Hello World!")).unwrap();
//! app.listen().unwrap();
//! ```

use std::fmt;
use std::io::{Error, ErrorKind};
use std::str::FromStr;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, ErrorHandler};
use crate::error::{RouteError, ServerError, ServerResult};
use crate::handler::Target;
use crate::http::{Body, HttpVerb, Request, Response};
use crate::router::{AcceptType, Registry, MATCH_ALL};
use crate::server::Server;

pub struct Application {
    config: ServerConfig,
    registry: Arc<Registry>,
    on_error: Option<ErrorHandler>,
    mapped: bool,
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("entries", &self.registry.len())
            .field("on_error", &self.on_error.is_some())
            .field("mapped", &self.mapped)
            .finish()
    }
}

impl Default for Application {
    fn default() -> Self {
        Application::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::new()),
            on_error: None,
            mapped: false,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Replaces the server configuration. Only allowed before the first
    /// route or filter is mapped.
    pub fn configure(&mut self, config: ServerConfig) -> Result<&mut Self, RouteError> {
        if self.mapped {
            return Err(RouteError::PreconditionViolation(
                "configure must be called before any route or filter is mapped".to_string(),
            ));
        }
        self.config = config;
        Ok(self)
    }

    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&ServerError) -> Response + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Registers a route under a verb given by name, e.g. `"get"`.
    pub fn add_route<A, F, B>(
        &mut self,
        verb_name: &str,
        pattern: &str,
        accept: A,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        A: Into<AcceptType>,
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        let verb = HttpVerb::from_str(verb_name)?;
        self.map(verb, pattern, accept.into(), Target::route(handler))
    }

    /// Registers a filter under a phase given by name, `"before"` or `"after"`.
    pub fn add_filter<A, F>(
        &mut self,
        phase_name: &str,
        pattern: &str,
        accept: A,
        filter: F,
    ) -> Result<&mut Self, RouteError>
    where
        A: Into<AcceptType>,
        F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
    {
        let phase = match HttpVerb::from_str(phase_name) {
            Ok(verb) if verb.is_filter_phase() => verb,
            _ => {
                return Err(RouteError::UnknownVerb {
                    kind: "filter phase",
                    name: phase_name.to_string(),
                })
            }
        };
        self.map(phase, pattern, accept.into(), Target::filter(filter))
    }

    fn map(
        &mut self,
        verb: HttpVerb,
        pattern: &str,
        accept: AcceptType,
        target: Target,
    ) -> Result<&mut Self, RouteError> {
        self.mapped = true;
        self.registry.register(verb, pattern, accept, target)?;
        Ok(self)
    }

    fn route<F, B>(
        &mut self,
        verb: HttpVerb,
        pattern: &str,
        handler: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.map(verb, pattern, AcceptType::Any, Target::route(handler))
    }

    pub fn get<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::GET, pattern, handler)
    }

    pub fn post<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::POST, pattern, handler)
    }

    pub fn put<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::PUT, pattern, handler)
    }

    pub fn delete<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::DELETE, pattern, handler)
    }

    pub fn head<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::HEAD, pattern, handler)
    }

    pub fn trace<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::TRACE, pattern, handler)
    }

    pub fn connect<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::CONNECT, pattern, handler)
    }

    pub fn options<F, B>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        self.route(HttpVerb::OPTIONS, pattern, handler)
    }

    pub fn before<F>(&mut self, pattern: &str, filter: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.map(HttpVerb::BEFORE, pattern, AcceptType::Any, Target::filter(filter))
    }

    pub fn after<F>(&mut self, pattern: &str, filter: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.map(HttpVerb::AFTER, pattern, AcceptType::Any, Target::filter(filter))
    }

    /// A before filter that runs for every request.
    pub fn before_all<F>(&mut self, filter: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.before(MATCH_ALL, filter)
    }

    /// An after filter that runs for every request, including unrouted ones.
    pub fn after_all<F>(&mut self, filter: F) -> Result<&mut Self, RouteError>
    where
        F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.after(MATCH_ALL, filter)
    }

    /// Removes every route and filter. Requests already resolving keep the
    /// table they started with.
    pub fn clear_routes(&mut self) -> &mut Self {
        self.registry.clear();
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> Dispatcher {
        let dispatcher = Dispatcher::new(Arc::clone(&self.registry));
        match &self.on_error {
            Some(handler) => dispatcher.with_error_handler(Arc::clone(handler)),
            None => dispatcher,
        }
    }

    pub fn server(&self) -> Server {
        Server::new(self.config.clone(), self.dispatcher())
    }

    /// Starts the server on the configured address and blocks until it stops.
    pub fn listen(&self) -> Result<(), Error> {
        self.config
            .validate()
            .map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;

        let rt = Runtime::new()?;
        let server = self.server();
        rt.block_on(async move {
            let bound = server.bind().await?;
            info!(address = %bound.local_addr(), entries = self.registry.len(), "Starting server");
            bound.serve().await
        })
    }
}
