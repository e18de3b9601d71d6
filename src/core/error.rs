use thiserror::Error;

use crate::core::pattern::PatternError;

/// Errors raised while parsing `_headers` or `_redirects`.
///
/// Each variant carries the 1-based line number and the raw text of the
/// offending line so startup failures point straight at the culprit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuleError {
    /// The rule file is not valid UTF-8
    #[error("rule file is not valid UTF-8: {0}")]
    Encoding(String),

    /// A pattern line did not compile
    #[error("line {line}: invalid pattern '{text}': {source}")]
    InvalidPattern {
        line: usize,
        text: String,
        #[source]
        source: PatternError,
    },

    /// A new path started before the previous one received any directive
    #[error("line {line}: expected header, got path: {text}")]
    MissingDirective { line: usize, text: String },

    /// An indented directive appeared before any path
    #[error("line {line}: dangling header without path: {text}")]
    DanglingDirective { line: usize, text: String },

    /// A directive line is not of the form `Key: value`
    #[error("line {line}: incorrect directive, expected 'Key: value': {text}")]
    MalformedDirective { line: usize, text: String },

    /// Header name or value is not a valid HTTP token
    #[error("line {line}: invalid header: {text}")]
    InvalidHeader { line: usize, text: String },

    /// A `Basic-Auth` pair is missing its `:` separator
    #[error("line {line}: invalid Basic-Auth credential '{pair}'")]
    InvalidCredential { line: usize, pair: String },

    /// A second `Basic-Auth` line for the same path
    #[error("line {line}: duplicated Basic-Auth line: {text}")]
    DuplicateBasicAuth { line: usize, text: String },

    /// The file ended while a path was still waiting for its headers
    #[error("line {line}: unclosed path: {text}")]
    UnclosedRule { line: usize, text: String },

    /// A redirect rule with fewer than two fields
    #[error("line {line}: invalid redirect rule: {text}")]
    TooFewFields { line: usize, text: String },

    /// Only query constraints were given, no destination followed
    #[error("line {line}: redirect rule has no destination: {text}")]
    MissingDestination { line: usize, text: String },

    /// Status field is not an integer HTTP status code
    #[error("line {line}: invalid status code: {text}")]
    InvalidStatus { line: usize, text: String },

    /// Fields left over after the status code
    #[error("line {line}: invalid line, unexpected trailing fields: {text}")]
    ExcessFields { line: usize, text: String },
}

impl RuleError {
    /// Line number the error refers to, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            RuleError::Encoding(_) => None,
            RuleError::InvalidPattern { line, .. }
            | RuleError::MissingDirective { line, .. }
            | RuleError::DanglingDirective { line, .. }
            | RuleError::MalformedDirective { line, .. }
            | RuleError::InvalidHeader { line, .. }
            | RuleError::InvalidCredential { line, .. }
            | RuleError::DuplicateBasicAuth { line, .. }
            | RuleError::UnclosedRule { line, .. }
            | RuleError::TooFewFields { line, .. }
            | RuleError::MissingDestination { line, .. }
            | RuleError::InvalidStatus { line, .. }
            | RuleError::ExcessFields { line, .. } => Some(*line),
        }
    }
}

/// Result type for rule parsing
pub type RuleResult<T> = Result<T, RuleError>;
