use std::fmt;
use std::str::FromStr;

use crate::error::RouteError;

/// HTTP verbs a route can be registered under, plus the two pseudo-verbs used
/// for filter registration.
#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum HttpVerb {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    TRACE,
    CONNECT,
    OPTIONS,
    BEFORE,
    AFTER,
}

impl HttpVerb {
    /// Verbs that can appear on an inbound request.
    pub const REQUEST_VERBS: [HttpVerb; 8] = [
        HttpVerb::GET,
        HttpVerb::POST,
        HttpVerb::PUT,
        HttpVerb::DELETE,
        HttpVerb::HEAD,
        HttpVerb::TRACE,
        HttpVerb::CONNECT,
        HttpVerb::OPTIONS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::GET => "GET",
            HttpVerb::POST => "POST",
            HttpVerb::PUT => "PUT",
            HttpVerb::DELETE => "DELETE",
            HttpVerb::HEAD => "HEAD",
            HttpVerb::TRACE => "TRACE",
            HttpVerb::CONNECT => "CONNECT",
            HttpVerb::OPTIONS => "OPTIONS",
            HttpVerb::BEFORE => "BEFORE",
            HttpVerb::AFTER => "AFTER",
        }
    }

    /// `true` for BEFORE and AFTER.
    pub fn is_filter_phase(&self) -> bool {
        matches!(self, HttpVerb::BEFORE | HttpVerb::AFTER)
    }

    /// Parses a verb as it appears on the wire. Filter phases are rejected.
    pub fn from_request(s: &str) -> Option<HttpVerb> {
        HttpVerb::REQUEST_VERBS
            .iter()
            .copied()
            .find(|verb| verb.as_str() == s)
    }
}

impl FromStr for HttpVerb {
    type Err = RouteError;

    /// Case-insensitive, so `get`, `GET` and `before` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::GET),
            "POST" => Ok(HttpVerb::POST),
            "PUT" => Ok(HttpVerb::PUT),
            "DELETE" => Ok(HttpVerb::DELETE),
            "HEAD" => Ok(HttpVerb::HEAD),
            "TRACE" => Ok(HttpVerb::TRACE),
            "CONNECT" => Ok(HttpVerb::CONNECT),
            "OPTIONS" => Ok(HttpVerb::OPTIONS),
            "BEFORE" => Ok(HttpVerb::BEFORE),
            "AFTER" => Ok(HttpVerb::AFTER),
            _ => Err(RouteError::UnknownVerb {
                kind: "verb",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("get".parse::<HttpVerb>().unwrap(), HttpVerb::GET);
        assert_eq!("Options".parse::<HttpVerb>().unwrap(), HttpVerb::OPTIONS);
        assert_eq!("after".parse::<HttpVerb>().unwrap(), HttpVerb::AFTER);
        assert!("PATCHY".parse::<HttpVerb>().is_err());
    }

    #[test]
    fn wire_verbs_exclude_filter_phases() {
        assert_eq!(HttpVerb::from_request("DELETE"), Some(HttpVerb::DELETE));
        assert_eq!(HttpVerb::from_request("BEFORE"), None);
        assert_eq!(HttpVerb::from_request("get"), None);
        assert!(HttpVerb::REQUEST_VERBS.iter().all(|v| !v.is_filter_phase()));
    }
}
