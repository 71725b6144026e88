//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// A source could not be parsed or extracted.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    ValidationError { message: String },

    /// Missing required field.
    #[error("missing required configuration field: {field}")]
    MissingField { field: String },

    /// Two services share a name.
    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    /// Two bots of one service share a name.
    #[error("duplicate bot name '{bot}' in service '{service}'")]
    DuplicateBot { service: String, bot: String },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
