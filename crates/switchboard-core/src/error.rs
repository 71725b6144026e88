//! Error types shared by adapters and the dispatch core.
//!
//! Runtime-level errors (registration conflicts, missing bots, handler
//! failures) live in `switchboard-runtime`.

use thiserror::Error;

use crate::update::UpdateKind;

// =============================================================================
// Update Errors
// =============================================================================

/// A canonical update that breaks the schema contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// Only callbacks may arrive without a backing message.
    #[error("{kind} update has no message")]
    MissingMessage {
        /// Kind of the offending update.
        kind: UpdateKind,
    },

    /// A command with nothing after the slash.
    #[error("command update has an empty name")]
    EmptyCommand,
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors raised while converting a raw platform payload.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The payload is not valid for the platform's update schema.
    #[error("failed to parse update: {reason}")]
    Parse {
        /// Reason for failure.
        reason: String,
    },

    /// The payload is well formed but carries nothing the core can route.
    #[error("unsupported update: {what}")]
    Unsupported {
        /// Description of the unsupported content.
        what: String,
    },

    /// The converted update violates the canonical schema.
    #[error(transparent)]
    Invalid(#[from] UpdateError),
}

impl AdapterError {
    /// Creates a parse error.
    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported-update error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound platform calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The bot's outbound queue is closed.
    #[error("bot '{bot}' is not connected")]
    NotConnected {
        /// Bot whose connection is gone.
        bot: String,
    },

    /// Failed to encode request parameters.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The request cannot be expressed for this platform.
    #[error("'{method}' rejected: {reason}")]
    Rejected {
        /// Platform method name.
        method: String,
        /// Why the call was refused.
        reason: String,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates a rejected-call error.
    pub fn rejected(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for update validation.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
