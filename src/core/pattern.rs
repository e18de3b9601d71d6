//! URL pattern compilation and matching.
//!
//! A pattern is a `/`-separated list of segments. Each segment is one of:
//! * a literal, compared byte for byte with the request segment
//! * a placeholder `:name`, optionally preceded by a literal prefix within the
//!   same segment (`year-:year`), binding one non-empty request segment
//! * a trailing `*`, binding the rest of the path under [`SPLAT`]
//!
//! Matching is anchored on both ends and never backtracks: every segment has at
//! most one variable part, so a request either matches a pattern in exactly one
//! way or not at all.
use std::fmt;

use thiserror::Error;

/// Reserved capture name for the trailing wildcard.
pub const SPLAT: &str = "splat";

/// Errors raised while compiling a pattern string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PatternError {
    #[error("pattern must start with '/'")]
    MissingLeadingSlash,

    #[error("wildcard '*' is only allowed as the whole final segment")]
    MisplacedWildcard,

    #[error("placeholder in segment '{0}' has no name")]
    EmptyPlaceholder(String),

    #[error("segment '{0}' holds more than one placeholder")]
    MultiplePlaceholders(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder { prefix: String, name: String },
    Splat,
}

impl Segment {
    fn parse(raw: &str, is_last: bool) -> Result<Self, PatternError> {
        if raw == "*" {
            return if is_last {
                Ok(Segment::Splat)
            } else {
                Err(PatternError::MisplacedWildcard)
            };
        }
        if raw.contains('*') {
            return Err(PatternError::MisplacedWildcard);
        }

        match raw.split_once(':') {
            None => Ok(Segment::Literal(raw.to_string())),
            Some((_, "")) => Err(PatternError::EmptyPlaceholder(raw.to_string())),
            Some((_, name)) if name.contains(':') => {
                Err(PatternError::MultiplePlaceholders(raw.to_string()))
            }
            Some((prefix, name)) => Ok(Segment::Placeholder {
                prefix: prefix.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Match one request segment, recording a capture when this is a placeholder.
    fn bind(&self, part: &str, captures: &mut Captures) -> bool {
        match self {
            Segment::Literal(literal) => literal == part,
            Segment::Placeholder { prefix, name } => match part.strip_prefix(prefix.as_str()) {
                Some(value) if !value.is_empty() => {
                    captures.push(name, value);
                    true
                }
                _ => false,
            },
            Segment::Splat => false,
        }
    }
}

/// A compiled URL pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a pattern string such as `/news/:year/*`.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        let rest = source
            .strip_prefix('/')
            .ok_or(PatternError::MissingLeadingSlash)?;

        let raw_segments: Vec<&str> = rest.split('/').collect();
        let last = raw_segments.len() - 1;
        let segments = raw_segments
            .iter()
            .enumerate()
            .map(|(i, raw)| Segment::parse(raw, i == last))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The pattern as written in the rule file.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern ends with a `*` wildcard.
    pub fn has_splat(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Splat))
    }

    /// Match a request path, returning the captures on success.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let rest = path.strip_prefix('/')?;
        let mut captures = Captures::default();

        if self.has_splat() {
            let fixed = &self.segments[..self.segments.len() - 1];
            let mut parts = rest.splitn(fixed.len() + 1, '/');
            for segment in fixed {
                if !segment.bind(parts.next()?, &mut captures) {
                    return None;
                }
            }
            captures.push(SPLAT, parts.next()?);
        } else {
            let mut parts = rest.split('/');
            for segment in &self.segments {
                if !segment.bind(parts.next()?, &mut captures) {
                    return None;
                }
            }
            if parts.next().is_some() {
                return None;
            }
        }

        Some(captures)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Values bound by a single successful match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<(String, String)>);

impl Captures {
    fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    /// Value captured under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value captured by the trailing wildcard.
    pub fn splat(&self) -> Option<&str> {
        self.get(SPLAT)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
