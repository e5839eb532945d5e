//! Minimal HTTP/1.1 collaborator that feeds requests to a [`Dispatcher`].
//!
//! One request per connection, no TLS, no keep-alive. Dispatch runs on the
//! blocking pool so a slow route never stalls the accept loop.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ServerError, ServerResult};
use crate::http::{HttpVerb, Request, RequestBody, Response};

const MAX_HEADERS: usize = 100;

pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl Server {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    pub async fn bind(self) -> io::Result<BoundServer> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Server listening");
        Ok(BoundServer {
            listener,
            local_addr,
            config: self.config,
            dispatcher: self.dispatcher,
        })
    }
}

/// A server holding its listening socket.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) -> io::Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves. Connections already accepted are
    /// left to finish on their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let permits = Arc::new(Semaphore::new(self.config.max_connections));
        let read_timeout = self.config.read_timeout();
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Connection failed");
                        continue;
                    }
                },
            };

            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, dispatcher, read_timeout).await {
                    debug!(peer = %peer, error = %e, "Connection error");
                }
                drop(permit);
            });
        }

        info!(address = %self.local_addr, "Server stopped");
        Ok(())
    }
}

async fn handle_connection<S>(
    mut stream: S,
    dispatcher: Dispatcher,
    read_timeout: Duration,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let parsed = match tokio::time::timeout(read_timeout, read_request(&mut stream)).await {
        Ok(parsed) => parsed,
        Err(_) => Err(ServerError::RequestTimeout),
    };

    let (response, head_only) = match parsed {
        Ok(None) => return Ok(()),
        Ok(Some(request)) => {
            let head_only = request.verb == HttpVerb::HEAD;
            let dispatched =
                tokio::task::spawn_blocking(move || dispatcher.dispatch(request)).await;
            let response = dispatched
                .unwrap_or_else(|e| Response::error(&ServerError::Panic(e.to_string())));
            (response, head_only)
        }
        Err(ServerError::Io(e)) => return Err(e),
        Err(err) => {
            debug!(error = %err, "Rejected request");
            (Response::error(&err), false)
        }
    };

    write_response(&mut stream, &response, head_only).await
}

/// Reads one request. `Ok(None)` means the peer closed without sending one.
async fn read_request<S>(stream: &mut S) -> ServerResult<Option<Request>>
where
    S: AsyncRead + Unpin,
{
    let mut buf_reader = BufReader::new(stream);
    let mut request_line = String::new();
    buf_reader.read_line(&mut request_line).await?;

    if request_line.trim().is_empty() {
        return Ok(None);
    }

    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| ServerError::BadRequest("missing method".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| ServerError::BadRequest("missing request target".to_string()))?;
    let verb = HttpVerb::from_request(method)
        .ok_or_else(|| ServerError::NotImplemented(method.to_string()))?;

    // The path stays percent-encoded; segments are decoded while matching.
    let (path, raw_query) = target.split_once('?').unwrap_or((target, ""));

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if buf_reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if headers.len() >= MAX_HEADERS {
            return Err(ServerError::BadRequest("too many headers".to_string()));
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let mut data = Vec::new();
    if let Some(length) = headers.get("content-length") {
        let length: u64 = length
            .parse()
            .map_err(|_| ServerError::BadRequest("invalid content-length".to_string()))?;
        buf_reader.take(length).read_to_end(&mut data).await?;
    }
    let content_type = headers.get("content-type").cloned().unwrap_or_default();

    let mut request = Request::new(verb, path)
        .with_query(raw_query)
        .with_body(RequestBody::new(content_type, data));
    request.headers = headers;
    Ok(Some(request))
}

async fn write_response<S>(stream: &mut S, response: &Response, head_only: bool) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let body = response.body.to_bytes();
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason_phrase(response.status));
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if response.get_header("content-type").is_none() {
        if let Some(content_type) = response.body.default_content_type() {
            head.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
    }
    if response.get_header("date").is_none() {
        head.push_str(&format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now())));
    }
    head.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", body.len()));

    stream.write_all(head.as_bytes()).await?;
    if !head_only {
        stream.write_all(&body).await?;
    }
    stream.flush().await?;
    stream.shutdown().await
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Target;
    use crate::router::Registry;

    async fn parse(raw: &str) -> ServerResult<Option<Request>> {
        let mut reader = raw.as_bytes();
        read_request(&mut reader).await
    }

    #[tokio::test]
    async fn parses_request_line_headers_and_body() {
        let req = parse(concat!(
            "POST /users/al%20ice?debug=1 HTTP/1.1\r\n",
            "Accept: application/json\r\n",
            "Content-Type: text/plain\r\n",
            "Content-Length: 5\r\n\r\n",
            "hello",
        ))
        .await
        .unwrap()
        .unwrap();

        assert_eq!(req.verb, HttpVerb::POST);
        assert_eq!(req.path, "/users/al%20ice");
        assert_eq!(req.query_param("debug"), Some("1"));
        assert_eq!(req.accept(), Some("application/json"));
        assert_eq!(req.body.as_string(), "hello");
        assert_eq!(req.body.content_type(), "text/plain");
    }

    #[tokio::test]
    async fn unknown_verbs_and_garbage_are_rejected() {
        assert!(matches!(
            parse("PATCH /x HTTP/1.1\r\n\r\n").await,
            Err(ServerError::NotImplemented(ref m)) if m == "PATCH"
        ));
        assert!(matches!(
            parse("BEFORE /x HTTP/1.1\r\n\r\n").await,
            Err(ServerError::NotImplemented(_))
        ));
        assert!(matches!(parse("GET\r\n\r\n").await, Err(ServerError::BadRequest(_))));
        assert!(matches!(parse("").await, Ok(None)));
    }

    #[tokio::test]
    async fn writes_status_line_and_derived_headers() {
        let mut res = Response::new(201);
        res.body("created");
        let mut out = Vec::new();
        write_response(&mut out, &res, false).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
        assert!(text.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(text.contains("Content-Length: 7\r\n"));
        assert!(text.contains("Date: "));
        assert!(text.ends_with("\r\n\r\ncreated"));
    }

    #[tokio::test]
    async fn head_responses_omit_the_body() {
        let res = Response::text("abc");
        let mut out = Vec::new();
        write_response(&mut out, &res, true).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 3\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn serves_over_tcp_until_shutdown() {
        let registry = Arc::new(Registry::new());
        registry
            .register(
                HttpVerb::GET,
                "/ping",
                "*/*",
                Target::route(|_req, _res| Ok("pong")),
            )
            .unwrap();
        let config = ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        let bound = Server::new(config, Dispatcher::new(registry)).bind().await.unwrap();
        let addr = bound.local_addr();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(bound.serve_with_shutdown(async {
            let _ = stop_rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /ping HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.ends_with("pong"));

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
