//! Framework error types.

use thiserror::Error;

/// A binding pattern that failed to compile.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    #[error("invalid pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for pattern construction.
pub type PatternResult<T> = Result<T, PatternError>;
