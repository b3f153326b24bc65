// Route pattern parsing

use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Name under which a wildcard capture is bound
pub const WILDCARD_PARAM: &str = "*";

/// Segment list for a request path. Most paths fit inline.
pub type PathSegments<'a> = SmallVec<[&'a str; 8]>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("`*` must be the last segment in `{0}`")]
    WildcardNotLast(String),

    #[error("empty parameter name in `{0}`")]
    EmptyParamName(String),

    #[error("parameter `{name}` appears more than once in `{pattern}`")]
    DuplicateParamName { pattern: String, name: String },

    #[error("route pattern `{0}` must start with `/`")]
    NotAbsolute(String),
}

/// One `/`-delimited unit of a route pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Static(String),
    Param(String),
    Wildcard,
}

/// A parsed route pattern such as `/users/:id/files/*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern. Empty segments (`//`, trailing `/`) are ignored.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw.to_string()));
        }

        let parts = split_path(raw);
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: SmallVec<[&str; 4]> = SmallVec::new();

        for (index, part) in parts.iter().enumerate() {
            let segment = if *part == WILDCARD_PARAM {
                if index + 1 != parts.len() {
                    return Err(PatternError::WildcardNotLast(raw.to_string()));
                }
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName(raw.to_string()));
                }
                if names.contains(&name) {
                    return Err(PatternError::DuplicateParamName {
                        pattern: raw.to_string(),
                        name: name.to_string(),
                    });
                }
                names.push(name);
                Segment::Param(name.to_string())
            } else {
                Segment::Static(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern as written at registration
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when every segment is a literal
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Static(_)))
    }

    /// Names of the captures in order; a wildcard contributes `*`
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Static(_) => None,
            Segment::Param(name) => Some(name.as_str()),
            Segment::Wildcard => Some(WILDCARD_PARAM),
        })
    }

    /// Canonical form: single slashes, no trailing slash
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Static(literal) => out.push_str(literal),
                Segment::Param(name) => {
                    out.push(':');
                    out.push_str(name);
                }
                Segment::Wildcard => out.push_str(WILDCARD_PARAM),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a path into its non-empty segments
pub fn split_path(path: &str) -> PathSegments<'_> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Join segments back into a path with a leading slash
pub fn join_segments(segments: &[&str]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Collapse duplicate slashes and drop a trailing slash
pub fn normalize_path(path: &str) -> String {
    join_segments(&split_path(path))
}

/// Segment-boundary prefix test: `/api` covers `/api` and `/api/x`,
/// never `/apix`.
pub fn has_segment_prefix(path: &[&str], prefix: &[&str]) -> bool {
    prefix.len() <= path.len() && path.iter().zip(prefix).all(|(a, b)| a == b)
}
