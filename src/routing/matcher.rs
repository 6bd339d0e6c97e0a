//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Compile declarative patterns (`/leads/{id}` or `/leads/:id`) once at startup
//! - Match a request path against a compiled pattern
//! - Extract named parameters in declaration order
//!
//! # Design Decisions
//! - Both parameter syntaxes compile to the same `Segment::Param`
//! - Matching is anchored at both ends (no prefix matches)
//! - Literal segments compare byte-for-byte (case-sensitive)
//! - One trailing slash is ignored on patterns and request paths; empty
//!   interior segments (`/a//b`) are never normalized and never match
//! - No regex, matching is a single pass over the path segments

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::http::ApiError;

/// Error raised when a path pattern cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with '/'")]
    MissingLeadingSlash(String),

    #[error("pattern `{0}` contains an empty segment")]
    EmptySegment(String),

    #[error("pattern `{pattern}` has an invalid parameter segment `{segment}`")]
    InvalidParam { pattern: String, segment: String },

    #[error("pattern `{pattern}` declares parameter `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },
}

/// One segment of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Captures one non-empty request segment under the given name.
    Param(String),
}

/// The matchable form of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    source: String,
    segments: Vec<Segment>,
}

impl CompiledPattern {
    /// Compile a pattern. See [`compile`].
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        compile(pattern)
    }

    /// The pattern text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parameter names in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path, returning the extracted parameters on success.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let path = trim_trailing_slash(path);
        let rest = path.strip_prefix('/')?;

        // Root pattern has no segments and only matches "/".
        if self.segments.is_empty() {
            return rest.is_empty().then(RouteParams::default);
        }

        let mut params = RouteParams::default();
        let mut parts = rest.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if lit.as_bytes() != part.as_bytes() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push(name.clone(), part.to_string());
                }
            }
        }

        // Anchored: the path must be fully consumed.
        if parts.next().is_some() {
            return None;
        }

        Some(params)
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile a path pattern into a [`CompiledPattern`].
///
/// Accepts `:name` and `{name}` parameter segments. Parameter names are limited
/// to ASCII alphanumerics and `_` and must be unique within the pattern.
pub fn compile(pattern: &str) -> Result<CompiledPattern, PatternError> {
    let trimmed = trim_trailing_slash(pattern);
    let rest = trimmed
        .strip_prefix('/')
        .ok_or_else(|| PatternError::MissingLeadingSlash(pattern.to_string()))?;

    let mut segments = Vec::new();
    if !rest.is_empty() {
        for part in rest.split('/') {
            if part.is_empty() {
                return Err(PatternError::EmptySegment(pattern.to_string()));
            }
            segments.push(parse_segment(pattern, part)?);
        }
    }

    let mut seen: Vec<&str> = Vec::new();
    for segment in &segments {
        if let Segment::Param(name) = segment {
            if seen.contains(&name.as_str()) {
                return Err(PatternError::DuplicateParam {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                });
            }
            seen.push(name);
        }
    }

    Ok(CompiledPattern {
        source: pattern.to_string(),
        segments,
    })
}

fn parse_segment(pattern: &str, part: &str) -> Result<Segment, PatternError> {
    let name = if let Some(name) = part.strip_prefix(':') {
        Some(name)
    } else if part.starts_with('{') || part.ends_with('}') {
        let inner = part
            .strip_prefix('{')
            .and_then(|p| p.strip_suffix('}'))
            .ok_or_else(|| invalid_param(pattern, part))?;
        Some(inner)
    } else {
        None
    };

    match name {
        Some(name) if is_valid_name(name) => Ok(Segment::Param(name.to_string())),
        Some(_) => Err(invalid_param(pattern, part)),
        None => Ok(Segment::Literal(part.to_string())),
    }
}

fn invalid_param(pattern: &str, segment: &str) -> PatternError {
    PatternError::InvalidParam {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Collapse a single trailing slash, leaving the root path alone.
///
/// A trailing slash that sits after an empty segment (`//`, `/leads//`) is
/// kept so the empty segment still fails to match.
pub(crate) fn trim_trailing_slash(path: &str) -> &str {
    match path.strip_suffix('/') {
        Some(rest) if !rest.is_empty() && !rest.ends_with('/') => rest,
        _ => path,
    }
}

/// Parameters extracted from a matched path, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, String)>,
}

impl RouteParams {
    fn push(&mut self, name: String, value: String) {
        self.entries.push((name, value));
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up and parse a parameter. Missing or unparseable values are a 400.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ApiError> {
        let raw = self
            .get(name)
            .ok_or_else(|| ApiError::BadRequest(format!("missing path parameter `{name}`")))?;
        raw.parse()
            .map_err(|_| ApiError::BadRequest(format!("invalid path parameter `{name}`")))
    }

    /// Values in declaration order, for handlers that bind parameters positionally.
    pub fn positional(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, v)| v.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_brace_param_extraction() {
        let pattern = compile("/leads/{id}/score-history").unwrap();
        let got = pattern.matches("/leads/42/score-history").unwrap();
        assert_eq!(got.entries, params(&[("id", "42")]));
    }

    #[test]
    fn test_colon_and_brace_are_equivalent() {
        let colon = compile("/leads/:id").unwrap();
        let brace = compile("/leads/{id}").unwrap();
        assert_eq!(colon.segments(), brace.segments());
        assert_eq!(colon.matches("/leads/42"), brace.matches("/leads/42"));
        assert_eq!(colon.matches("/leads/42").unwrap().get("id"), Some("42"));
    }

    #[test]
    fn test_anchored_match() {
        let pattern = compile("/leads/{id}").unwrap();
        assert!(pattern.matches("/leads/42/extra").is_none());
        assert!(pattern.matches("/leads").is_none());
        assert!(pattern.matches("/api/leads/42").is_none());
    }

    #[test]
    fn test_literals_are_case_sensitive() {
        let pattern = compile("/leads/{id}").unwrap();
        assert!(pattern.matches("/Leads/42").is_none());
    }

    #[test]
    fn test_trailing_slash_collapsed() {
        let pattern = compile("/leads/{id}").unwrap();
        assert_eq!(pattern.matches("/leads/7/").unwrap().get("id"), Some("7"));

        let with_slash = compile("/leads/").unwrap();
        assert!(with_slash.matches("/leads").is_some());
    }

    #[test]
    fn test_empty_segments_never_match() {
        let pattern = compile("/leads/{id}/notes").unwrap();
        assert!(pattern.matches("/leads//notes").is_none());
        assert!(pattern.matches("//leads/1/notes").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let root = compile("/").unwrap();
        assert!(root.matches("/").is_some());
        assert!(root.matches("/leads").is_none());
        assert!(root.matches("//").is_none());
    }

    #[test]
    fn test_trailing_slash_after_empty_segment_is_kept() {
        assert_eq!(trim_trailing_slash("/leads/"), "/leads");
        assert_eq!(trim_trailing_slash("/"), "/");
        assert_eq!(trim_trailing_slash("//"), "//");
        assert_eq!(trim_trailing_slash("/leads//"), "/leads//");

        let pattern = compile("/leads").unwrap();
        assert!(pattern.matches("/leads/").is_some());
        assert!(pattern.matches("/leads//").is_none());
    }

    #[test]
    fn test_multiple_params_keep_declaration_order() {
        let pattern = compile("/accounts/:account/contacts/{contact}").unwrap();
        let got = pattern.matches("/accounts/a1/contacts/c9").unwrap();
        assert_eq!(got.positional(), vec!["a1", "c9"]);
        assert_eq!(
            pattern.param_names().collect::<Vec<_>>(),
            vec!["account", "contact"]
        );
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            compile("leads"),
            Err(PatternError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            compile("/leads//notes"),
            Err(PatternError::EmptySegment(_))
        ));
        assert!(matches!(
            compile("/leads/{id"),
            Err(PatternError::InvalidParam { .. })
        ));
        assert!(matches!(
            compile("/leads/:"),
            Err(PatternError::InvalidParam { .. })
        ));
        assert!(matches!(
            compile("/a/{id}/b/:id"),
            Err(PatternError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_parse_param() {
        let pattern = compile("/leads/{id}").unwrap();
        let got = pattern.matches("/leads/42").unwrap();
        assert_eq!(got.parse::<u32>("id").unwrap(), 42);

        let bad = pattern.matches("/leads/abc").unwrap();
        assert!(matches!(bad.parse::<u32>("id"), Err(ApiError::BadRequest(_))));
        assert!(matches!(bad.parse::<u32>("nope"), Err(ApiError::BadRequest(_))));
    }
}
