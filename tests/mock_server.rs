//! Scripted single-shot endpoints served over a real socket.

use trellis::script::{MockServer, ScriptEntry};
use trellis::HttpVerb;

mod common;

use common::request;

#[tokio::test]
async fn script_serves_each_step_once() {
    let server = MockServer::start().await.unwrap();
    let addr = server.local_addr();
    server
        .set_script(vec![
            ScriptEntry::text(HttpVerb::GET, "/login", "token-1"),
            ScriptEntry::text(HttpVerb::GET, "/login", "token-2"),
            ScriptEntry::handler(HttpVerb::POST, "/orders/:id", |req, res| {
                res.status(202);
                Ok(format!("order {}", req.param("id").unwrap_or("")))
            }),
        ])
        .unwrap();

    assert_eq!(request(addr, "GET", "/login", &[]).await.body, "token-1");
    assert!(!server.is_script_complete());
    assert_eq!(request(addr, "GET", "/login", &[]).await.body, "token-2");

    assert_eq!(request(addr, "GET", "/login", &[]).await.status, 404);

    let res = request(addr, "POST", "/orders/17", &[]).await;
    assert_eq!(res.status, 202);
    assert_eq!(res.body, "order 17");
    assert!(server.is_script_complete());

    assert_eq!(request(addr, "POST", "/orders/17", &[]).await.status, 404);
    server.close().await.unwrap();
}

#[tokio::test]
async fn a_new_script_replaces_the_old_one() {
    let server = MockServer::start().await.unwrap();
    let addr = server.local_addr();
    server
        .set_script(vec![ScriptEntry::text(HttpVerb::GET, "/old", "old")])
        .unwrap();
    server
        .set_script(vec![ScriptEntry::text(HttpVerb::GET, "/new", "new")])
        .unwrap();

    assert_eq!(request(addr, "GET", "/old", &[]).await.status, 404);
    assert_eq!(request(addr, "GET", "/new", &[]).await.body, "new");
    assert!(server.is_script_complete());

    server.close().await.unwrap();
}
