//! Filters example for Trellis
//!
//! This example demonstrates:
//! - A before filter guarding a section of the site with `halt`
//! - Before filters handing data to later stages through request attributes
//! - A global after filter decorating every response, including 404s
//! - Routes selected by the client's accept header

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use trellis::config::{load_config, ServerConfig};
use trellis::logging::init_from_config;
use trellis::{json, Application, ServerError};

static REQUESTS: AtomicU64 = AtomicU64::new(0);

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path)).expect("valid config file"),
        None => ServerConfig::default(),
    };
    init_from_config(&config);

    let mut app = Application::with_config(config);

    app.before_all(|req, _res| {
        req.set_attribute("request_id", REQUESTS.fetch_add(1, Ordering::Relaxed));
        Ok(())
    })
    .expect("valid filter");

    app.before("/admin/:page", |req, _res| {
        match req.get_header("authorization") {
            Some(token) if token.starts_with("Bearer ") => {
                req.set_attribute("user", "admin");
                Ok(())
            }
            _ => Err(ServerError::halt_with(401, "Authentication required")),
        }
    })
    .expect("valid filter");

    app.get("/admin/:page", |req, _res| {
        let user: String = req.typed_attribute("user").unwrap_or_default();
        Ok(format!("{} is viewing {}", user, req.param("page").unwrap_or("")))
    })
    .expect("valid route");

    app.add_route("get", "/status", "application/json", |_req, _res| {
        Ok(json!({ "status": "ok" }))
    })
    .expect("valid route");
    app.get("/status", |_req, _res| Ok("ok")).expect("valid route");

    app.after_all(|req, res| {
        res.header("X-Served-By", "trellis");
        if let Some(id) = req.typed_attribute::<u64>("request_id") {
            res.header("X-Request-Id", id.to_string());
        }
        Ok(())
    })
    .expect("valid filter");

    app.listen().expect("Server failed to start");
}
