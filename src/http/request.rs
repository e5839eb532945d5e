use std::collections::HashMap;

use serde_json::Value;

use crate::http::HttpVerb;
use crate::router::Params;

#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    pub(crate) content_type: String,
    pub(crate) data: Vec<u8>,
}

impl RequestBody {
    pub fn new<C: Into<String>>(content_type: C, data: Vec<u8>) -> RequestBody {
        RequestBody {
            content_type: content_type.into(),
            data,
        }
    }

    pub fn from_string(s: &str) -> RequestBody {
        RequestBody::new("text/plain", s.as_bytes().to_vec())
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_string(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn json<T>(&self) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.content_type.starts_with("application/json") {
            serde_json::from_slice(&self.data).ok()
        } else {
            None
        }
    }

    /// Decodes an `application/x-www-form-urlencoded` body. Later keys win.
    pub fn form(&self) -> Option<HashMap<String, String>> {
        if !self
            .content_type
            .starts_with("application/x-www-form-urlencoded")
        {
            return None;
        }
        Some(decode_pairs(&String::from_utf8_lossy(&self.data)))
    }
}

/// Splits `a=1&b=2` into decoded pairs. Undecodable pairs are kept raw.
pub(crate) fn decode_pairs(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// The per-dispatch request context.
///
/// Created by the server collaborator (or directly in tests), mutated by
/// before-filters, read by the route and handed to after-filters. A request is
/// owned by exactly one dispatch.
#[derive(Debug, Clone)]
pub struct Request {
    pub verb: HttpVerb,
    /// Path as received, still percent-encoded.
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    /// Bindings of the pattern currently being executed.
    pub params: Params,
    /// Values attached by filters for later stages of the same dispatch.
    pub attributes: HashMap<String, Value>,
    pub body: RequestBody,
}

impl Request {
    pub fn new<P: Into<String>>(verb: HttpVerb, path: P) -> Request {
        Request {
            verb,
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
            params: Params::default(),
            attributes: HashMap::new(),
            body: RequestBody::default(),
        }
    }

    /// Builder-style header setter. Header names are stored lowercase.
    pub fn with_header<K: AsRef<str>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_accept<V: Into<String>>(self, accept: V) -> Self {
        self.with_header("accept", accept)
    }

    pub fn with_query(mut self, raw_query: &str) -> Self {
        self.query.extend(decode_pairs(raw_query));
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The negotiated accept type, if the client sent one.
    pub fn accept(&self) -> Option<&str> {
        self.get_header("accept")
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute<T>(&mut self, key: &str, value: T)
    where
        T: serde::Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.attributes.insert(key.to_string(), value);
        }
    }

    pub fn typed_attribute<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.attributes
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn headers_are_case_insensitive() {
        let req = Request::new(HttpVerb::GET, "/").with_header("Accept", "text/html");
        assert_eq!(req.get_header("ACCEPT"), Some("text/html"));
        assert_eq!(req.accept(), Some("text/html"));
    }

    #[test]
    fn query_is_percent_decoded() {
        let req = Request::new(HttpVerb::GET, "/search").with_query("q=hello%20world&tag=a+b&flag");
        assert_eq!(req.query_param("q"), Some("hello world"));
        assert_eq!(req.query_param("tag"), Some("a b"));
        assert_eq!(req.query_param("flag"), Some(""));
    }

    #[test]
    fn attributes_round_trip_through_serde() {
        #[derive(serde::Serialize, Deserialize, Debug, PartialEq)]
        struct User {
            name: String,
        }

        let mut req = Request::new(HttpVerb::GET, "/");
        req.set_attribute("user", User { name: "alice".into() });
        assert_eq!(
            req.typed_attribute::<User>("user"),
            Some(User { name: "alice".into() })
        );
        assert_eq!(req.attribute("user").and_then(|v| v["name"].as_str()), Some("alice"));
    }

    #[test]
    fn form_body_requires_matching_content_type() {
        let body = RequestBody::new("application/x-www-form-urlencoded", b"a=1&b=two%21".to_vec());
        let form = body.form().unwrap();
        assert_eq!(form.get("b").map(String::as_str), Some("two!"));
        assert!(RequestBody::from_string("a=1").form().is_none());
    }

    #[test]
    fn json_body_is_decoded() {
        let body = RequestBody::new("application/json; charset=utf-8", br#"{"n": 3}"#.to_vec());
        let value: Value = body.json().unwrap();
        assert_eq!(value["n"], 3);
    }
}
