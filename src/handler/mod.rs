use std::fmt;
use std::sync::Arc;

use crate::error::ServerResult;
use crate::http::{Body, Request, Response};

/// The primary handler for a verb + path. Its return value becomes the
/// response body.
pub trait RouteHandler: Send + Sync + 'static {
    fn handle(&self, req: &Request, res: &mut Response) -> ServerResult<Body>;
}

impl<F, B> RouteHandler for F
where
    F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
    B: Into<Body>,
{
    fn handle(&self, req: &Request, res: &mut Response) -> ServerResult<Body> {
        (self)(req, res).map(Into::into)
    }
}

/// A before/after hook. Filters observe and mutate the request and the
/// response but produce no body of their own.
pub trait FilterHandler: Send + Sync + 'static {
    fn handle(&self, req: &mut Request, res: &mut Response) -> ServerResult<()>;
}

impl<F> FilterHandler for F
where
    F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
{
    fn handle(&self, req: &mut Request, res: &mut Response) -> ServerResult<()> {
        (self)(req, res)
    }
}

/// What a registered entry invokes.
#[derive(Clone)]
pub enum Target {
    Route(Arc<dyn RouteHandler>),
    Filter(Arc<dyn FilterHandler>),
}

impl Target {
    pub fn route<F, B>(handler: F) -> Target
    where
        F: Fn(&Request, &mut Response) -> ServerResult<B> + Send + Sync + 'static,
        B: Into<Body>,
    {
        Target::Route(Arc::new(handler))
    }

    pub fn filter<F>(filter: F) -> Target
    where
        F: Fn(&mut Request, &mut Response) -> ServerResult<()> + Send + Sync + 'static,
    {
        Target::Filter(Arc::new(filter))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Route(_) => "route",
            Target::Filter(_) => "filter",
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
