//! # Switchboard Adapter for Telegram
//!
//! Converts Telegram Bot API updates into canonical updates and encodes
//! outbound calls (`sendMessage`, `sendPhoto`, `editMessageText`, ...) onto
//! the bot's outbound queue.
//!
//! ```rust,ignore
//! use switchboard_adapter_telegram::TelegramAdapter;
//! use switchboard_runtime::{Service, ServiceManager};
//!
//! let manager = ServiceManager::new();
//! let service = manager.register_service(Service::new("tg", Arc::new(TelegramAdapter)))?;
//! service.register_bot("main", &token)?;
//! ```
//!
//! ## Classification
//!
//! | Telegram update                    | Canonical type |
//! |------------------------------------|----------------|
//! | `callback_query` with `data`       | `callback`     |
//! | message text starting with `/`     | `command`      |
//! | message with `contact`             | `contact`      |
//! | message with `location`            | `location`     |
//! | any other message (photo, sticker) | `text`         |
//!
//! Updates without a message or a callback query are rejected as unsupported.
//!
//! Outbound HTML is reduced to the tags Telegram accepts, see [`prepare_text`].

mod adapter;
pub mod connection;
pub mod convert;
pub mod keyboard;
pub mod model;
pub mod text;

pub use adapter::{PLATFORM, TelegramAdapter};
pub use connection::TelegramConnection;
pub use keyboard::MAX_CALLBACK_DATA;
pub use text::prepare_text;
