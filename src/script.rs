//! Scripted single-shot endpoints for tests against a real socket.
//!
//! Only one scripted route is registered at a time. Each step also registers
//! an AFTER filter on the same path; when that filter runs it clears the
//! registry and installs the next step. The registry is never touched from
//! inside a route body.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{RouteError, ServerError, ServerResult};
use crate::handler::{RouteHandler, Target};
use crate::http::{Body, HttpVerb, Request, Response};
use crate::router::{AcceptType, PathPattern, Registry};
use crate::server::Server;

#[derive(Clone)]
enum Reply {
    Text(String),
    Handler(Arc<dyn RouteHandler>),
}

/// One step of a script: the endpoint to expose and what it answers.
#[derive(Clone)]
pub struct ScriptEntry {
    verb: HttpVerb,
    path: String,
    reply: Reply,
}

impl ScriptEntry {
    pub fn text<P: Into<String>, T: Into<String>>(verb: HttpVerb, path: P, body: T) -> Self {
        Self {
            verb,
            path: path.into(),
            reply: Reply::Text(body.into()),
        }
    }

    pub fn handler<P, F, B>(verb: HttpVerb, path: P, handler: F) -> Self
    where
        P: Into<String>,
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        Self {
            verb,
            path: path.into(),
            reply: Reply::Handler(Arc::new(handler)),
        }
    }

    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn route(&self) -> Target {
        match &self.reply {
            Reply::Text(text) => {
                let text = text.clone();
                Target::route(move |_req, _res| Ok(text.clone()))
            }
            Reply::Handler(handler) => Target::Route(Arc::clone(handler)),
        }
    }
}

struct Runner {
    registry: Arc<Registry>,
    entries: Vec<ScriptEntry>,
    /// Index of the step currently installed.
    step: Mutex<usize>,
    complete: AtomicBool,
}

impl Runner {
    fn install(self: &Arc<Self>, index: usize) -> Result<(), RouteError> {
        let entry = &self.entries[index];
        self.registry
            .register(entry.verb, &entry.path, AcceptType::Any, entry.route())?;

        let runner = Arc::downgrade(self);
        self.registry.register(
            HttpVerb::AFTER,
            &entry.path,
            AcceptType::Any,
            Target::filter(move |_req, _res| advance(&runner, index)),
        )?;
        debug!(step = index, verb = %entry.verb, path = %entry.path, "Script step installed");
        Ok(())
    }
}

fn advance(runner: &Weak<Runner>, served: usize) -> ServerResult<()> {
    let Some(runner) = runner.upgrade() else {
        return Ok(());
    };
    let mut step = runner.step.lock().unwrap_or_else(PoisonError::into_inner);
    if *step != served {
        return Ok(());
    }

    runner.registry.clear();
    *step = served + 1;
    if *step < runner.entries.len() {
        runner.install(*step).map_err(ServerError::handler)?;
    } else {
        runner.complete.store(true, Ordering::SeqCst);
        info!(steps = runner.entries.len(), "Script complete");
    }
    Ok(())
}

/// A running script over a [`Registry`].
pub struct Script {
    runner: Arc<Runner>,
}

impl Script {
    /// Clears `registry` and installs the first step. Every entry is checked
    /// up front so a bad path fails here rather than mid-script.
    pub fn start(registry: Arc<Registry>, entries: Vec<ScriptEntry>) -> Result<Script, RouteError> {
        for entry in &entries {
            if entry.verb.is_filter_phase() {
                return Err(RouteError::TargetMismatch {
                    verb: entry.verb,
                    target: "route",
                });
            }
            PathPattern::parse(&entry.path)?;
        }

        registry.clear();
        let runner = Arc::new(Runner {
            registry,
            complete: AtomicBool::new(entries.is_empty()),
            entries,
            step: Mutex::new(0),
        });
        if !runner.entries.is_empty() {
            runner.install(0)?;
        }
        Ok(Script { runner })
    }

    pub fn is_complete(&self) -> bool {
        self.runner.complete.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.runner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runner.entries.is_empty()
    }
}

/// A server on an ephemeral local port that serves a [`Script`].
pub struct MockServer {
    registry: Arc<Registry>,
    local_addr: SocketAddr,
    script: Mutex<Option<Script>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<io::Result<()>>>,
}

impl MockServer {
    pub async fn start() -> io::Result<MockServer> {
        Self::start_on(0).await
    }

    pub async fn start_on(port: u16) -> io::Result<MockServer> {
        let registry = Arc::new(Registry::new());
        let config = ServerConfig {
            bind_address: format!("127.0.0.1:{}", port),
            ..ServerConfig::default()
        };
        let bound = Server::new(config, Dispatcher::new(Arc::clone(&registry)))
            .bind()
            .await?;
        let local_addr = bound.local_addr();

        let (shutdown, stop) = oneshot::channel::<()>();
        let task = tokio::spawn(bound.serve_with_shutdown(async {
            let _ = stop.await;
        }));

        Ok(MockServer {
            registry,
            local_addr,
            script: Mutex::new(None),
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URI of the server, with a trailing slash.
    pub fn uri(&self) -> String {
        format!("http://localhost:{}/", self.local_addr.port())
    }

    /// Replaces whatever script was running.
    pub fn set_script(&self, entries: Vec<ScriptEntry>) -> Result<(), RouteError> {
        let script = Script::start(Arc::clone(&self.registry), entries)?;
        *self.script.lock().unwrap_or_else(PoisonError::into_inner) = Some(script);
        Ok(())
    }

    /// `false` until a script is set and every one of its steps was served.
    pub fn is_script_complete(&self) -> bool {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Script::is_complete)
            .unwrap_or(false)
    }

    /// Stops accepting connections and waits for the accept loop to exit.
    pub async fn close(mut self) -> io::Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
            None => Ok(()),
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
