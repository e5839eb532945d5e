use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use crate::error::PatternError;

/// Path parameters bound by a successful match, in left-to-right segment
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed route pattern such as `/users/:name/posts`.
///
/// The special pattern `*` matches every path and binds nothing; it is what
/// global filters are registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    match_all: bool,
}

pub const MATCH_ALL: &str = "*";

impl PathPattern {
    pub fn parse(raw: &str) -> Result<PathPattern, PatternError> {
        if raw == MATCH_ALL {
            return Ok(PathPattern {
                raw: raw.to_string(),
                segments: Vec::new(),
                match_all: true,
            });
        }

        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_string()));
        }

        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        for (position, part) in split_segments(raw).enumerate() {
            if part.is_empty() {
                return Err(PatternError::EmptySegment {
                    pattern: raw.to_string(),
                    position,
                });
            }
            if part.contains('*') {
                return Err(PatternError::UnsupportedWildcard(raw.to_string()));
            }
            match part.strip_prefix(':') {
                Some("") => {
                    return Err(PatternError::EmptyParameterName {
                        pattern: raw.to_string(),
                        position,
                    })
                }
                Some(name) => {
                    if !seen.insert(name) {
                        return Err(PatternError::DuplicateParameter {
                            pattern: raw.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(PathPattern {
            raw: raw.to_string(),
            segments,
            match_all: false,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_match_all(&self) -> bool {
        self.match_all
    }

    /// Matches a request path segment for segment. Returns the bindings on
    /// success.
    ///
    /// `path` is split before percent-decoding, so an encoded `%2F` stays
    /// inside its segment.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut params = Params::default();
        if self.match_all {
            return Some(params);
        }

        let mut parts = split_segments(path);
        for segment in &self.segments {
            let part = decode_segment(parts.next()?);
            match segment {
                Segment::Literal(literal) if *literal == part => {}
                Segment::Param(name) if !part.is_empty() => params.push(name, &part),
                _ => return None,
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Undecodable segments are compared as received.
fn decode_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// Segments of `path` with the leading slash and one trailing slash dropped.
/// The root path has no segments.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.split('/').filter({
        let root = path.is_empty();
        move |_| !root
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> PathPattern {
        PathPattern::parse(raw).unwrap()
    }

    #[test]
    fn literal_pattern_matches_identical_path_without_bindings() {
        let p = pattern("/hello");
        assert_eq!(p.matches("/hello"), Some(Params::default()));
        assert!(p.matches("/Hello").is_none());
        assert!(p.matches("/hello/world").is_none());
        assert!(p.matches("/").is_none());
    }

    #[test]
    fn trailing_slash_is_ignored_on_both_sides() {
        assert!(pattern("/a/b").matches("/a/b/").is_some());
        assert!(pattern("/a/b/").matches("/a/b").is_some());
    }

    #[test]
    fn root_pattern_matches_only_root() {
        let root = pattern("/");
        assert!(root.segments().is_empty());
        assert!(root.matches("/").is_some());
        assert!(root.matches("").is_some());
        assert!(root.matches("/a").is_none());
    }

    #[test]
    fn params_bind_in_segment_order() {
        let p = pattern("/users/:name/posts/:post");
        let params = p.matches("/users/alice/posts/42").unwrap();
        let collected: Vec<_> = params.iter().collect();
        assert_eq!(collected, vec![("name", "alice"), ("post", "42")]);
        assert_eq!(params.get("post"), Some("42"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn segment_count_must_match() {
        let p = pattern("/users/:name");
        assert!(p.matches("/users").is_none());
        assert!(p.matches("/users/").is_none());
        assert!(p.matches("/users/alice/extra").is_none());
    }

    #[test]
    fn param_rejects_empty_segment() {
        let p = pattern("/a/:x/b");
        assert!(p.matches("/a//b").is_none());
    }

    #[test]
    fn match_all_matches_anything() {
        let p = pattern("*");
        assert!(p.is_match_all());
        assert_eq!(p.matches("/any/thing/at/all"), Some(Params::default()));
        assert!(p.matches("/").is_some());
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert_eq!(
            PathPattern::parse("hello"),
            Err(PatternError::MissingLeadingSlash("hello".into()))
        );
        assert!(matches!(
            PathPattern::parse("/a//b"),
            Err(PatternError::EmptySegment { position: 1, .. })
        ));
        assert!(matches!(
            PathPattern::parse("/a/:"),
            Err(PatternError::EmptyParameterName { position: 1, .. })
        ));
        assert!(matches!(
            PathPattern::parse("/:id/x/:id"),
            Err(PatternError::DuplicateParameter { ref name, .. }) if name == "id"
        ));
        assert!(matches!(
            PathPattern::parse("/files/*"),
            Err(PatternError::UnsupportedWildcard(_))
        ));
    }

    #[test]
    fn encoded_slash_stays_inside_one_segment() {
        let params = pattern("/users/:name").matches("/users/a%2Fb").unwrap();
        assert_eq!(params.get("name"), Some("a/b"));
        assert!(pattern("/:a/:b").matches("/a%2Fb").is_none());
    }

    #[test]
    fn segments_are_decoded_before_comparison() {
        assert!(pattern("/caf\u{e9}/menu").matches("/caf%C3%A9/menu").is_some());
        let params = pattern("/files/:name").matches("/files/my%20doc").unwrap();
        assert_eq!(params.get("name"), Some("my doc"));
    }

    #[test]
    fn distinct_params_bind_distinct_segments() {
        let params = pattern("/:a/:b").matches("/x/y").unwrap();
        assert_ne!(params.get("a"), params.get("b"));
        let same = pattern("/:a/:b").matches("/x/x").unwrap();
        assert_eq!(same.get("a"), same.get("b"));
    }
}
