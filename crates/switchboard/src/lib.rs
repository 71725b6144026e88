//! # Switchboard
//!
//! Multi-platform chat bot dispatch. Raw webhook payloads from Telegram or
//! Max are converted into one canonical update and routed to at most one
//! handler; named events let the rest of the process talk to users through
//! the same bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   raw JSON   ┌─────────┐  CanonicalUpdate  ┌─────────┐
//! │ HTTP / queue │─────────────▶│ Adapter │──────────────────▶│ Webhook │──▶ handler(bot, update)
//! └──────────────┘              └─────────┘                   └─────────┘
//!                                                                  │
//! ┌──────────────┐  emit(name)  ┌─────────────┐                    ▼
//! │ your process │─────────────▶│ EventRouter │──▶ event(bot, ctx) ──▶ OutboundCall queue
//! └──────────────┘              └─────────────┘
//! ```
//!
//! - **Core**: the canonical update model and the adapter contracts
//! - **Framework**: handlers, the registry, webhooks and named events
//! - **Runtime**: bots, services, the manager, configuration and logging
//! - **Adapters**: `telegram` and `max`, each behind a feature of that name
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use switchboard::prelude::*;
//! use switchboard::telegram::TelegramAdapter;
//!
//! async fn start(bot: BotRef, update: UpdateRef) -> anyhow::Result<()> {
//!     bot.send_message(update.chat_id(), "Hello!", &MessageOptions::default()).await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = ServiceManager::builder()
//!         .adapter(Arc::new(TelegramAdapter::new()))
//!         .build()?;
//!
//!     manager
//!         .start_bot("telegram", "main", Some(Webhook::new().command("start", start)))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `telegram`, `max`: platform adapters (default)
//! - `toml-config` (default), `yaml-config`: config file formats
//! - `json-log`: JSON log output

pub use switchboard_core as core;
pub use switchboard_framework as framework;
pub use switchboard_runtime as runtime;

#[cfg(feature = "max")]
pub use switchboard_adapter_max as max;
#[cfg(feature = "telegram")]
pub use switchboard_adapter_telegram as telegram;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use switchboard::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use switchboard_runtime::{
        EmitRequest, LoggingBuilder, ManagedBot, RuntimeError, Service, ServiceManager,
    };

    // Handlers and routing
    pub use switchboard_framework::{
        Binding, BotEvent, BoxedEvent, Dispatched, EventContext, Matches, Pattern, UpdateRef,
        Webhook, event,
    };

    // Canonical model and the bot interface handlers receive
    pub use switchboard_core::{
        Bot, BotRef, Button, CanonicalUpdate, ChatId, InputFile, MessageId, MessageOptions,
        ParseMode, UpdateKind, UpdatePayload, add_tag,
    };
}
