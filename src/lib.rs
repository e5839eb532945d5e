//! # Trellis
//!
//! A small embedded HTTP routing core: path patterns with named parameters,
//! accept-type selection, ordered before/after filters and a first-match-wins
//! route table that is safe to read from many threads at once.
//!
//! ## Quick Start
//!
//! ```no_run
//! use trellis::app::Application;
//!
//! let mut app = Application::new();
//! app.get("/users/:name", |req, _res| {
//!     Ok(format!("Hello {}", req.param("name").unwrap_or("stranger")))
//! })
//! .unwrap();
//! app.listen().unwrap();
//! ```
//!
//! ## Filters
//!
//! ```no_run
//! use trellis::app::Application;
//! use trellis::error::ServerError;
//!
//! let mut app = Application::new();
//! app.before("/admin/:page", |req, _res| match req.get_header("authorization") {
//!     Some(_) => Ok(()),
//!     None => Err(ServerError::halt_with(401, "login first")),
//! })
//! .unwrap();
//! app.after_all(|_req, res| {
//!     res.header("X-Served-By", "trellis");
//!     Ok(())
//! })
//! .unwrap();
//! ```

pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod router;
pub mod script;
pub mod server;
pub extern crate serde_json;

pub use app::Application;
pub use dispatch::Dispatcher;
pub use error::{RouteError, ServerError, ServerResult};
pub use http::{Body, HttpVerb, Request, Response};

// Reexport serde_json
pub use serde_json::{json, Value};
