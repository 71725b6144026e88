//! # Switchboard Adapter for Max
//!
//! Converts Max Bot API updates into canonical updates and encodes outbound
//! calls onto the bot's outbound queue.
//!
//! | Max update                          | Canonical type |
//! |-------------------------------------|----------------|
//! | `message_callback` with a payload   | `callback`     |
//! | `bot_started`                       | `command` (`/start <payload>`) |
//! | message text starting with `/`      | `command`      |
//! | message with a `contact` attachment | `contact`      |
//! | message with a `location` attachment| `location`     |
//! | any other message (image, sticker)  | `text`         |
//!
//! Buttons are always sent as an `inline_keyboard` attachment; Max has no
//! separate reply keyboard.

mod adapter;
pub mod connection;
pub mod convert;
pub mod keyboard;
pub mod model;

pub use adapter::{MaxAdapter, PLATFORM};
pub use connection::MaxConnection;
