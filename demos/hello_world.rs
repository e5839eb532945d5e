//! A minimal "Hello World!" server using Trellis
//!
//! Run with `cargo run --example hello_world` and open
//! http://127.0.0.1:4567/hello

use trellis::config::LogFormat;
use trellis::logging::init_logging;
use trellis::Application;

fn main() {
    init_logging("info", LogFormat::Pretty);

    let mut app = Application::new();
    app.get("/hello", |_req, _res| Ok("Hello World!"))
        .expect("valid route");
    app.get("/users/:name", |req, _res| {
        Ok(format!("Hello {}!", req.param("name").unwrap_or("stranger")))
    })
    .expect("valid route");

    app.listen().expect("Server failed to start");
}
