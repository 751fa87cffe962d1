//! Error types shared by the routing core.
//!
//! Request-time outcomes (no route, failed validation) are response statuses,
//! not errors. The types here cover configuration-time faults only.

use thiserror::Error;

/// Faults detected while compiling a URI template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `{}` with nothing between the braces.
    #[error("empty variable at offset {offset} in pattern {pattern:?}")]
    EmptyVariable { pattern: String, offset: usize },

    /// A character that cannot appear in a variable name.
    #[error("invalid character {found:?} inside variable at offset {offset} in pattern {pattern:?}")]
    InvalidVariableChar {
        pattern: String,
        offset: usize,
        found: char,
    },

    /// A `}` with no opening brace.
    #[error("unbalanced '}}' at offset {offset} in pattern {pattern:?}")]
    UnbalancedBrace { pattern: String, offset: usize },

    /// A `{` never closed before the end of the pattern.
    #[error("unterminated variable in pattern {pattern:?}")]
    UnterminatedVariable { pattern: String },

    /// The generated regular expression was rejected.
    #[error("pattern {pattern:?} does not compile: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Faults raised while building or starting a routing tree.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A virtual host pattern (domain, port or scheme) is not a valid regex.
    #[error("invalid host pattern {pattern:?}: {source}")]
    InvalidHostPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A validation format is not a valid regex.
    #[error("invalid validation format {format:?}: {source}")]
    InvalidFormat {
        format: String,
        #[source]
        source: regex::Error,
    },

    /// A configured target is missing, doubled or carries a bad status.
    #[error("invalid target at {location}: {reason}")]
    InvalidTarget { location: String, reason: String },

    /// A handler refused to start.
    #[error("unable to start {component}: {reason}")]
    Start { component: String, reason: String },
}
