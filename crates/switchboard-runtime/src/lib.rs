//! Switchboard Runtime: bots, services and the caller-facing manager.
//!
//! This crate provides:
//! - Bot lifecycle and ownership ([`ManagedBot`], [`BotState`])
//! - Services grouping bots behind one adapter ([`Service`])
//! - Named event routing across services ([`EventRouter`])
//! - The entry point for webhooks and events ([`ServiceManager`])
//! - Layered configuration and logging setup
//!
//! ```ignore
//! use switchboard_runtime::ServiceManager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ServiceManager::builder()
//!         .adapter(Arc::new(TelegramAdapter::new()))
//!         .build()?;
//!
//!     manager
//!         .start_bot("telegram", "main", Some(Webhook::new().command("start", on_start)))
//!         .await?;
//!
//!     // Feed raw payloads from the HTTP layer:
//!     manager.handle_webhook("telegram", "main", raw).await?;
//!     Ok(())
//! }
//! ```
//!
//! Handlers only ever see a [`BotRef`](switchboard_core::BotRef). The
//! [`ManagedBot`] that owns the webhook and events stays with the runtime.

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod manager;
pub mod router;
pub mod service;

#[cfg(test)]
mod testing;

pub use bot::{BotState, ManagedBot};
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, ServiceConfig, SwitchboardConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use manager::{ManagerBuilder, ServiceManager};
pub use router::{DEFAULT_BOT, EmitRequest, EventRouter};
pub use service::Service;
