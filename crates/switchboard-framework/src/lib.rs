//! # Switchboard Framework
//!
//! Handler-level building blocks on top of `switchboard-core`:
//!
//! - [`Handler`] / [`into_handler`]: async functions as handlers, with
//!   parameters extracted through [`FromDispatch`].
//! - [`HandlerRegistry`]: command, action, text, contact and location
//!   bindings, and the resolution algorithm that picks at most one of them.
//! - [`Webhook`]: a fluent or declarative set of bindings with its own
//!   registry and an optional fallback; usable as a `tower::Service`.
//! - [`BotEvent`]: named events raised from inside the process.

pub mod error;
pub mod event;
pub mod handler;
pub mod registry;
pub mod webhook;

pub use error::{PatternError, PatternResult};
pub use event::{BotEvent, BoxedEvent, EventContext, FnEvent, derive_event_name, event};
pub use handler::{
    BoxedHandler, DispatchContext, FromDispatch, Handler, IntoHandlerResult, Matches, UpdateRef,
    into_handler,
};
pub use registry::{HandlerRegistry, Matched, Pattern, Resolution, Route};
pub use webhook::{Binding, Dispatched, Webhook};

pub use regex::Regex;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Binding, BotEvent, BoxedEvent, Dispatched, EventContext, Matches, Pattern, UpdateRef,
        Webhook, event,
    };
}
