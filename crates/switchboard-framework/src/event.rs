//! Named events triggered from inside the process.
//!
//! Unlike webhook updates, events are raised by the host (a scheduler, an
//! HTTP endpoint, another bot) by name. An event handler receives the bot it
//! runs on and an [`EventContext`] carrying the target chat and a JSON
//! payload.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use switchboard_core::{BotRef, ChatId};

/// Target and payload of one event emission.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub chat_id: ChatId,
    pub payload: Value,
}

impl EventContext {
    pub fn new(chat_id: impl Into<ChatId>, payload: Value) -> Self {
        Self {
            chat_id: chat_id.into(),
            payload,
        }
    }
}

/// A named, cross-platform event handler.
///
/// The default [`name`](BotEvent::name) is derived from the type name:
/// `DailyReportEvent` is registered as `daily-report`.
#[async_trait]
pub trait BotEvent: Send + Sync + 'static {
    fn name(&self) -> String {
        derive_event_name(std::any::type_name::<Self>())
    }

    /// Chat the event targets when the caller supplies none.
    fn chat_id(&self) -> Option<ChatId> {
        None
    }

    async fn handle(&self, bot: BotRef, ctx: EventContext) -> anyhow::Result<()>;
}

/// A shared event trait object.
pub type BoxedEvent = Arc<dyn BotEvent>;

/// Kebab-cases the last path segment of a type name, dropping an `Event`
/// suffix.
pub fn derive_event_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let base = base.rsplit("::").next().unwrap_or(base);
    let base = match base.strip_suffix("Event") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => base,
    };

    let chars: Vec<char> = base.chars().collect();
    let mut name = String::with_capacity(base.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            name.push('-');
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                name.push('-');
            }
        }
        name.extend(c.to_lowercase());
    }
    name
}

// ============================================================================
// Function events
// ============================================================================

type EventFnBox =
    Arc<dyn Fn(BotRef, EventContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// An event backed by a closure.
#[derive(Clone)]
pub struct FnEvent {
    name: String,
    chat_id: Option<ChatId>,
    f: EventFnBox,
}

/// Creates an event from an async closure.
pub fn event<F, Fut>(name: impl Into<String>, f: F) -> FnEvent
where
    F: Fn(BotRef, EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnEvent {
        name: name.into(),
        chat_id: None,
        f: Arc::new(move |bot, ctx| Box::pin(f(bot, ctx))),
    }
}

impl FnEvent {
    /// Fixes the chat used when the caller supplies none.
    pub fn chat_id(mut self, chat_id: impl Into<ChatId>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn boxed(self) -> BoxedEvent {
        Arc::new(self)
    }
}

#[async_trait]
impl BotEvent for FnEvent {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn chat_id(&self) -> Option<ChatId> {
        self.chat_id.clone()
    }

    async fn handle(&self, bot: BotRef, ctx: EventContext) -> anyhow::Result<()> {
        (self.f)(bot, ctx).await
    }
}

impl fmt::Debug for FnEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvent")
            .field("name", &self.name)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}
