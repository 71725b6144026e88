//! # Switchboard Core
//!
//! The canonical update model and the contracts every platform plugs into.
//!
//! ## Layers
//!
//! - **Update model**: [`CanonicalUpdate`] and its payloads, the only shape
//!   the dispatch core ever matches on.
//! - **Platform contracts**: [`Adapter`] converts raw webhook payloads and
//!   creates a [`Connection`] per bot token; connections encode outbound calls
//!   onto a queue behind a [`ConnectionHandle`].
//! - **Bot interface**: [`Bot`] is the read-only view handlers receive.
//! - **Text utilities**: the idempotent [`add_tag`] mutator and
//!   [`MediaType`] classification.
//!
//! ```text
//! raw JSON ──▶ Adapter::convert_update ──▶ CanonicalUpdate ──▶ handler(bot, update)
//!                                                                   │
//!                      OutboundCall ◀── Connection ◀── Bot::send_* ◀┘
//! ```

pub mod adapter;
pub mod bot;
pub mod connection;
pub mod error;
pub mod media;
pub mod message;
pub mod tag;
pub mod update;

pub use adapter::{Adapter, BoxedAdapter};
pub use bot::{Bot, BotRef};
pub use connection::{
    BoxedConnection, Connection, ConnectionHandle, OutboundCall, OutboundReceiver,
    OutboundSender, outbound_queue,
};
pub use error::{
    AdapterError, AdapterResult, ApiError, ApiResult, UpdateError, UpdateResult,
};
pub use media::MediaType;
pub use message::{Button, ButtonKind, InputFile, MessageOptions, ParseMode};
pub use tag::{add_tag, tags};
pub use update::{
    CanonicalUpdate, Callback, CallbackData, Chat, ChatId, ChatType, Command, Contact, Location,
    MatchGroups, MessageId, MessageInfo, PlatformId, Sender, UpdateKind, UpdatePayload, UserId,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Bot, BotRef, Button, CanonicalUpdate, ChatId, InputFile, MessageId, MessageOptions,
        ParseMode, UpdateKind, UpdatePayload, add_tag,
    };
}
