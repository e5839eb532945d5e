//! Per-request dispatch protocol.
//!
//! ```text
//! RECEIVED → BEFORE_FILTERS → ROUTE_MATCH → (ROUTE_EXECUTED | NOT_FOUND)
//!          → AFTER_FILTERS → RESPONSE_SENT
//! ```
//!
//! Every failure raised by a route or filter, returned or panicked, stays
//! inside the dispatch that raised it and becomes part of the response.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, debug_span, error, warn};

use crate::error::{ServerError, ServerResult};
use crate::handler::Target;
use crate::http::{HttpVerb, Request, Response};
use crate::router::{Registry, Resolver, RouteMatch};

pub type ErrorHandler = Arc<dyn Fn(&ServerError) -> Response + Send + Sync>;

/// Runs requests through the filters and routes of a [`Registry`].
///
/// Cheap to clone and safe to share between threads; every call to
/// [`dispatch`](Dispatcher::dispatch) owns its own request and response.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: Resolver,
    on_error: Option<ErrorHandler>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            resolver: Resolver::new(registry),
            on_error: None,
        }
    }

    /// Replaces the default JSON rendering of 404 and 500 responses.
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.resolver.registry()
    }

    pub fn dispatch(&self, mut req: Request) -> Response {
        let verb = req.verb;
        let path = req.path.clone();
        let accept = req.accept().map(str::to_owned);
        let span = debug_span!("dispatch", verb = %verb, path = %path);
        let _entered = span.enter();

        let mut res = Response::new(200);
        let mut outcome: ServerResult<()> = Ok(());

        for filter in self
            .resolver
            .resolve_all(HttpVerb::BEFORE, &path, accept.as_deref())
        {
            outcome = invoke(&filter, &mut req, &mut res);
            if outcome.is_err() {
                break;
            }
        }

        let mut routed = true;
        if outcome.is_ok() {
            match self.resolver.resolve(verb, &path, accept.as_deref()) {
                Some(route) => outcome = invoke(&route, &mut req, &mut res),
                None => {
                    warn!(verb = %verb, path = %path, "No route matched");
                    routed = false;
                    outcome = Err(ServerError::NotFound);
                }
            }
        }
        if let Err(err) = outcome {
            self.apply_error(err, verb, &path, &mut res);
        }

        let mut after = self
            .resolver
            .resolve_all(HttpVerb::AFTER, &path, accept.as_deref());
        if !routed {
            after.retain(|filter| filter.entry.pattern().is_match_all());
        }
        for filter in after {
            if let Err(err) = invoke(&filter, &mut req, &mut res) {
                self.apply_error(err, verb, &path, &mut res);
                break;
            }
        }

        debug!(status = res.status, "Dispatch finished");
        res
    }

    /// Renders `err` over `res`, keeping headers earlier stages already set.
    fn apply_error(&self, err: ServerError, verb: HttpVerb, path: &str, res: &mut Response) {
        if err.is_failure() {
            error!(verb = %verb, path = %path, error = %err, "Handler failed");
        } else {
            debug!(
                verb = %verb,
                path = %path,
                status = err.status_code(),
                "Dispatch stopped early"
            );
        }

        let rendered = match (&self.on_error, &err) {
            (Some(handler), err) if !matches!(err, ServerError::Halt { .. }) => {
                catch_unwind(AssertUnwindSafe(|| handler(err))).unwrap_or_else(|panic| {
                    error!(error = %panic_message(panic), "Error handler panicked");
                    Response::error(err)
                })
            }
            _ => Response::error(&err),
        };
        res.status = rendered.status;
        res.body = rendered.body;
        for (name, value) in rendered.headers {
            res.header(name, value);
        }
    }
}

/// Calls a route or filter with the bindings of its own match.
fn invoke(matched: &RouteMatch, req: &mut Request, res: &mut Response) -> ServerResult<()> {
    req.params = matched.params.clone();
    let entry = &matched.entry;
    debug!(
        verb = %entry.verb(),
        pattern = %entry.pattern(),
        target = entry.target().kind(),
        "Invoking"
    );

    let result = catch_unwind(AssertUnwindSafe(|| -> ServerResult<()> {
        match entry.target() {
            Target::Route(route) => {
                let body = route.handle(req, res)?;
                res.body = body;
                Ok(())
            }
            Target::Filter(filter) => filter.handle(req, res),
        }
    }));
    result.unwrap_or_else(|panic| Err(ServerError::Panic(panic_message(panic))))
}

fn panic_message(err: Box<dyn Any + Send>) -> String {
    if let Some(msg) = err.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = err.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}
