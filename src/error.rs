use std::io;

use thiserror::Error;

use crate::http::HttpVerb;

/// A path pattern that could not be parsed at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),
    #[error("pattern `{pattern}` has an empty segment at position {position}")]
    EmptySegment { pattern: String, position: usize },
    #[error("pattern `{pattern}` has a parameter with no name at position {position}")]
    EmptyParameterName { pattern: String, position: usize },
    #[error("pattern `{pattern}` declares parameter `{name}` more than once")]
    DuplicateParameter { pattern: String, name: String },
    #[error("pattern `{0}` uses a wildcard segment, only the whole pattern `*` is supported")]
    UnsupportedWildcard(String),
}

/// Errors surfaced synchronously to whoever registers routes or configures the
/// application.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] PatternError),
    #[error("unknown {kind} `{name}`")]
    UnknownVerb { kind: &'static str, name: String },
    #[error("a {target} cannot be registered under {verb}")]
    TargetMismatch { verb: HttpVerb, target: &'static str },
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),
}

/// Per-request failures. These never escape the dispatcher, they are turned
/// into a response instead.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
    #[error("Request timeout")]
    RequestTimeout,
    #[error("Method not implemented: {0}")]
    NotImplemented(String),
    #[error("Halted with status {status}")]
    Halt { status: u16, body: Option<String> },
    #[error("Handler error: {0}")]
    Handler(String),
    #[error("Panic: {0}")]
    Panic(String),
}

impl ServerError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::NotFound => 404,
            ServerError::RequestTimeout => 408,
            ServerError::NotImplemented(_) => 501,
            ServerError::Halt { status, .. } => *status,
            ServerError::Io(_) | ServerError::Handler(_) | ServerError::Panic(_) => 500,
        }
    }

    /// Stops the current dispatch with the given status and no body.
    pub fn halt(status: u16) -> Self {
        ServerError::Halt { status, body: None }
    }

    /// Stops the current dispatch with the given status and body.
    pub fn halt_with<B: Into<String>>(status: u16, body: B) -> Self {
        ServerError::Halt {
            status,
            body: Some(body.into()),
        }
    }

    /// Wraps any displayable failure raised inside a route or filter.
    pub fn handler<E: std::fmt::Display>(err: E) -> Self {
        ServerError::Handler(err.to_string())
    }

    pub(crate) fn is_failure(&self) -> bool {
        !matches!(self, ServerError::Halt { .. } | ServerError::NotFound)
    }
}

/// Failures while loading or validating a [`ServerConfig`](crate::config::ServerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ServerError::NotFound.status_code(), 404);
        assert_eq!(ServerError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(ServerError::handler("boom").status_code(), 500);
        assert_eq!(ServerError::Panic("boom".into()).status_code(), 500);
        assert_eq!(ServerError::halt(418).status_code(), 418);
        assert_eq!(ServerError::NotImplemented("PATCH".into()).status_code(), 501);
    }

    #[test]
    fn halt_and_not_found_are_not_failures() {
        assert!(!ServerError::halt_with(401, "nope").is_failure());
        assert!(!ServerError::NotFound.is_failure());
        assert!(ServerError::handler("boom").is_failure());
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Validation failed: a, b");
    }
}
