//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route path patterns once at load time
//! - Match request paths segment by segment
//! - Capture `{name}` variables for path rewriting
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Empty segments are ignored, so a trailing slash does not change the match
//! - `**` is only allowed as the last segment, keeping matching linear
//! - No regex in the hot path

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Error returned for a malformed path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    NotAbsolute,
    #[error("'**' is only allowed as the last segment")]
    InnerCatchAll,
    #[error("malformed variable segment '{0}'")]
    BadVariable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// Segment containing `*`, matched within the segment.
    Glob(String),
    Variable(String),
    CatchAll,
}

/// Variables captured by a successful match.
pub type Captures = HashMap<String, String>;

/// A compiled path predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern such as `/aggregate/{service}/v3/api-docs` or `/eureka/**`.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute);
        }

        let parts: Vec<&str> = split_path(raw).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let segment = if *part == "**" {
                if i + 1 != parts.len() {
                    return Err(PatternError::InnerCatchAll);
                }
                Segment::CatchAll
            } else if part.starts_with('{') || part.ends_with('}') {
                let name = part
                    .strip_prefix('{')
                    .and_then(|p| p.strip_suffix('}'))
                    .filter(|n| !n.is_empty() && !n.contains(['{', '}']))
                    .ok_or_else(|| PatternError::BadVariable(part.to_string()))?;
                Segment::Variable(name.to_string())
            } else if part.contains('*') {
                Segment::Glob(part.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns true if the path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }

    /// Match the path, returning captured variables on success.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let mut captures = Captures::new();
        let mut parts = split_path(path);

        for segment in &self.segments {
            match segment {
                Segment::CatchAll => return Some(captures),
                Segment::Literal(lit) => {
                    if parts.next()? != lit.as_str() {
                        return None;
                    }
                }
                Segment::Glob(glob) => {
                    if !glob_match(glob, parts.next()?) {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    captures.insert(name.clone(), parts.next()?.to_string());
                }
            }
        }

        // Every request segment must be consumed.
        match parts.next() {
            None => Some(captures),
            Some(_) => None,
        }
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Expand `{name}` placeholders in a rewrite template.
///
/// Unknown placeholders are kept verbatim.
pub fn expand_template(template: &str, captures: &Captures) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        match after.find('}') {
            Some(end) => {
                let name = &after[1..end];
                match captures.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&after[..=end]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Single-segment glob where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pieces: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match pieces.split_first() {
        Some(split) => split,
        None => return text.is_empty(),
    };
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for piece in middle {
        match remaining.find(piece) {
            Some(idx) => remaining = &remaining[idx + piece.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last)
}
