//! Runtime error types.
//!
//! Every not-found error names the missing key and the container it was
//! looked up in. Handler failures keep the handler's error as their source.

use thiserror::Error;

use switchboard_core::{AdapterError, ApiError};

use crate::config::ConfigError;

/// Errors raised by bots, services, the event router and the manager.
#[derive(Error, Debug)]
pub enum RuntimeError {
    // =========================================================================
    // Registration conflicts
    // =========================================================================
    #[error("service '{0}' is already registered")]
    ServiceExists(String),

    #[error("bot '{bot}' is already registered in service '{service}'")]
    BotExists { service: String, bot: String },

    // =========================================================================
    // Not found
    // =========================================================================
    #[error("service '{0}' not found")]
    ServiceNotFound(String),

    #[error("bot '{bot}' not found in service '{service}'")]
    BotNotFound { service: String, bot: String },

    #[error("event '{0}' not found")]
    EventNotFound(String),

    #[error("event '{event}' is not registered for service '{service}'")]
    EventNotRegisteredForService { service: String, event: String },

    #[error("handler for event '{event}' not registered on bot '{bot}'")]
    HandlerNotRegistered { bot: String, event: String },

    #[error("no bot in service '{service}' handles event '{event}'")]
    NoBotForEvent { service: String, event: String },

    #[error("chat id not provided for event '{event}'")]
    MissingChatId { event: String },

    // =========================================================================
    // Invariant violations
    // =========================================================================
    #[error("bot '{bot}' already has a webhook bound")]
    WebhookAlreadyBound { bot: String },

    #[error("bot '{bot}' is listening; its webhook can no longer change")]
    BotListening { bot: String },

    // =========================================================================
    // Handler and adapter failures
    // =========================================================================
    #[error("event '{event}' failed on bot '{service}/{bot}': {source}")]
    Handler {
        service: String,
        bot: String,
        event: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("webhook handler failed on bot '{service}/{bot}': {source}")]
    Webhook {
        service: String,
        bot: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("bot '{service}/{bot}' could not convert update: {source}")]
    Adapter {
        service: String,
        bot: String,
        #[source]
        source: AdapterError,
    },

    #[error("bot '{bot}' connection error: {source}")]
    Connection {
        bot: String,
        #[source]
        source: ApiError,
    },

    #[error("no adapter for platform '{0}'")]
    UnknownPlatform(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
