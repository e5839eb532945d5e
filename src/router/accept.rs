use std::fmt;

/// The media type an entry was registered for.
///
/// Negotiation is deliberately exact: no wildcard subtypes, no quality values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AcceptType {
    #[default]
    Any,
    Exact(String),
}

impl AcceptType {
    /// `"*/*"`, `"any"` and the empty string all mean [`AcceptType::Any`].
    pub fn parse(raw: &str) -> AcceptType {
        match raw.trim() {
            "" | "*/*" | "any" => AcceptType::Any,
            exact => AcceptType::Exact(exact.to_string()),
        }
    }

    pub fn accepts(&self, request_accept: Option<&str>) -> bool {
        match self {
            AcceptType::Any => true,
            AcceptType::Exact(expected) => request_accept == Some(expected.as_str()),
        }
    }
}

impl From<&str> for AcceptType {
    fn from(raw: &str) -> Self {
        AcceptType::parse(raw)
    }
}

impl fmt::Display for AcceptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptType::Any => f.write_str("*/*"),
            AcceptType::Exact(media) => f.write_str(media),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_accepts_everything() {
        let any = AcceptType::parse("*/*");
        assert_eq!(any, AcceptType::Any);
        assert!(any.accepts(None));
        assert!(any.accepts(Some("application/json")));
        assert_eq!(AcceptType::parse("any"), AcceptType::Any);
    }

    #[test]
    fn exact_requires_identical_header() {
        let json = AcceptType::parse("application/json");
        assert!(json.accepts(Some("application/json")));
        assert!(!json.accepts(Some("application/*")));
        assert!(!json.accepts(Some("application/json;q=0.9")));
        assert!(!json.accepts(None));
    }
}
