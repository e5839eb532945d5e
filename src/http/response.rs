use std::borrow::Cow;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::ServerError;

/// Whatever a route produced as its response body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Text(text) => text.is_empty(),
            Body::Json(_) => false,
            Body::Bytes(bytes) => bytes.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Body::Empty => Cow::Borrowed(&[]),
            Body::Text(text) => Cow::Borrowed(text.as_bytes()),
            Body::Json(value) => Cow::Owned(value.to_string().into_bytes()),
            Body::Bytes(bytes) => Cow::Borrowed(bytes),
        }
    }

    /// Content type implied by the body when no filter or route set one.
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Body::Empty => None,
            Body::Text(_) => Some("text/plain; charset=utf-8"),
            Body::Json(_) => Some("application/json"),
            Body::Bytes(_) => Some("application/octet-stream"),
        }
    }
}

impl From<()> for Body {
    fn from(_: ()) -> Body {
        Body::Empty
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Body {
        Body::Text(s.to_string())
    }
}

impl From<String> for Body {
    fn from(s: String) -> Body {
        Body::Text(s)
    }
}

impl From<Value> for Body {
    fn from(v: Value) -> Body {
        Body::Json(v)
    }
}

impl From<Vec<u8>> for Body {
    fn from(b: Vec<u8>) -> Body {
        Body::Bytes(b)
    }
}

impl<T: Into<Body>> From<Option<T>> for Body {
    fn from(b: Option<T>) -> Body {
        b.map(Into::into).unwrap_or_default()
    }
}

/// The response builder attached to a dispatch. Filters and the route mutate
/// it in place; the server collaborator writes it out.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Body,
    pub headers: HashMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        Response::new(200)
    }
}

impl Response {
    pub fn new(status: u16) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: Body::Empty,
        }
    }

    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn body<B: Into<Body>>(&mut self, body: B) -> &mut Self {
        self.body = body.into();
        self
    }

    /// Sets a header, replacing any existing header whose name differs only
    /// in ASCII case.
    pub fn header<K: AsRef<str>, V: AsRef<str>>(&mut self, name: K, value: V) -> &mut Self {
        let name = name.as_ref();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.as_ref().to_string());
        self
    }

    /// Header lookup ignoring ASCII case.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_header("Content-Type")
            .or_else(|| self.body.default_content_type())
    }

    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, ServerError> {
        let value = serde_json::to_value(value)
            .map_err(|e| ServerError::Handler(format!("JSON serialization error: {}", e)))?;
        self.header("Content-Type", "application/json");
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn text<T: Into<String>>(content: T) -> Response {
        let mut response = Response::new(200);
        response
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(content.into());
        response
    }

    /// Default rendering of a per-request failure.
    pub fn error(err: &ServerError) -> Response {
        let status = err.status_code();
        let mut response = Response::new(status);
        match err {
            ServerError::Halt { body, .. } => {
                if let Some(body) = body {
                    response.body(body.as_str());
                }
            }
            _ => {
                response.header("Content-Type", "application/json");
                response.body = Body::Json(serde_json::json!({
                    "error": {
                        "message": err.to_string(),
                        "status": status
                    }
                }));
            }
        }
        response
    }
}
