//! Managed bot instances.
//!
//! A [`ManagedBot`] is the full-access owner of one bot identity: its
//! connection, its bound webhook and its named events. Handlers never see
//! it; they receive a [`BotRef`] backed by a private view that only exposes
//! accessors and outbound calls.
//!
//! ```compile_fail
//! use switchboard_core::BotRef;
//! use switchboard_framework::Webhook;
//!
//! // The read-only reference has no way to rebind the webhook.
//! fn rebind(bot: BotRef) {
//!     bot.register_webhook(Webhook::new());
//! }
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Created ─▶ InstanceBuilt ─┬─▶ Idle ──────────┐
//!                           └─▶ WebhookBound ──┴─▶ Listening
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use switchboard_core::{
    ApiResult, Bot, BotRef, BoxedAdapter, BoxedConnection, CanonicalUpdate, ChatId,
    ConnectionHandle, InputFile, MessageId, MessageOptions, OutboundSender,
};
use switchboard_framework::{BoxedEvent, Dispatched, EventContext, Webhook};

use crate::error::{RuntimeError, RuntimeResult};

/// Lifecycle state of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotState {
    /// Registered, no connection yet.
    Created,
    /// Connection created.
    InstanceBuilt,
    /// Started without a webhook; serves events only.
    Idle,
    /// Webhook bound, not yet listening.
    WebhookBound,
    /// Receiving updates.
    Listening,
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::InstanceBuilt => "instance-built",
            Self::Idle => "idle",
            Self::WebhookBound => "webhook-bound",
            Self::Listening => "listening",
        };
        f.write_str(s)
    }
}

struct BotCore {
    name: String,
    service: String,
    adapter: BoxedAdapter,
    connection: BoxedConnection,
    state: RwLock<BotState>,
    webhook: RwLock<Option<Webhook>>,
    events: RwLock<HashMap<String, BoxedEvent>>,
}

impl BotCore {
    fn set_state(&self, state: BotState) {
        let mut guard = self.state.write();
        let old = *guard;
        *guard = state;
        debug!(
            service = %self.service,
            bot = %self.name,
            old_state = %old,
            new_state = %state,
            "bot state changed"
        );
    }

    fn event_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.events.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// A bot owned by a service. Cloning shares the same bot.
#[derive(Clone)]
pub struct ManagedBot {
    core: Arc<BotCore>,
}

impl ManagedBot {
    /// Creates a bot and its connection.
    pub fn new(
        service: impl Into<String>,
        name: impl Into<String>,
        token: &str,
        adapter: BoxedAdapter,
        outbound_tx: OutboundSender,
    ) -> Self {
        let name = name.into();
        let service = service.into();
        debug!(service = %service, bot = %name, state = %BotState::Created, "bot created");

        let handle = ConnectionHandle::new(name.clone(), outbound_tx);
        let connection = adapter.create_connection(token, handle);
        let bot = Self {
            core: Arc::new(BotCore {
                name,
                service,
                adapter,
                connection,
                state: RwLock::new(BotState::Created),
                webhook: RwLock::new(None),
                events: RwLock::new(HashMap::new()),
            }),
        };
        bot.core.set_state(BotState::InstanceBuilt);
        bot
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn service(&self) -> &str {
        &self.core.service
    }

    pub fn platform(&self) -> &'static str {
        self.core.adapter.name()
    }

    pub fn state(&self) -> BotState {
        *self.core.state.read()
    }

    pub fn connection(&self) -> &BoxedConnection {
        &self.core.connection
    }

    pub fn has_webhook(&self) -> bool {
        self.core.webhook.read().is_some()
    }

    /// Names of the registered events, sorted.
    pub fn event_names(&self) -> Vec<String> {
        self.core.event_names()
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.core.events.read().contains_key(name)
    }

    /// The read-only reference handed to handlers.
    pub fn view(&self) -> BotRef {
        Arc::new(BotView {
            core: Arc::clone(&self.core),
        })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Stores an event under its name, replacing any previous one.
    pub fn register_event(&self, event: BoxedEvent) {
        let name = event.name();
        debug!(bot = %self.core.name, event = %name, "registering event");
        if self.core.events.write().insert(name.clone(), event).is_some() {
            debug!(bot = %self.core.name, event = %name, "event handler replaced");
        }
    }

    /// Runs an event against the chat fixed on the event.
    pub async fn handle_event(&self, name: &str, payload: Value) -> RuntimeResult<()> {
        self.invoke_event(name, None, payload).await
    }

    /// Runs an event against an explicit chat.
    pub async fn handle_event_in(
        &self,
        name: &str,
        chat_id: ChatId,
        payload: Value,
    ) -> RuntimeResult<()> {
        self.invoke_event(name, Some(chat_id), payload).await
    }

    async fn invoke_event(
        &self,
        name: &str,
        chat_id: Option<ChatId>,
        payload: Value,
    ) -> RuntimeResult<()> {
        let event = self.core.events.read().get(name).cloned().ok_or_else(|| {
            RuntimeError::HandlerNotRegistered {
                bot: self.core.name.clone(),
                event: name.to_owned(),
            }
        })?;
        let chat_id = chat_id
            .or_else(|| event.chat_id())
            .ok_or_else(|| RuntimeError::MissingChatId {
                event: name.to_owned(),
            })?;

        self.run_event(&event, name, EventContext { chat_id, payload })
            .await
    }

    /// Invokes an event handler on this bot, wrapping its error.
    pub(crate) async fn run_event(
        &self,
        event: &BoxedEvent,
        name: &str,
        ctx: EventContext,
    ) -> RuntimeResult<()> {
        debug!(bot = %self.core.name, event = %name, chat = %ctx.chat_id, "running event");
        event
            .handle(self.view(), ctx)
            .await
            .map_err(|source| RuntimeError::Handler {
                service: self.core.service.clone(),
                bot: self.core.name.clone(),
                event: name.to_owned(),
                source,
            })
    }

    // =========================================================================
    // Webhook
    // =========================================================================

    /// Binds a webhook. A bot binds at most one, and never once listening.
    pub fn register_webhook(&self, webhook: Webhook) -> RuntimeResult<()> {
        if self.state() == BotState::Listening {
            warn!(bot = %self.core.name, "rejecting webhook: bot is listening");
            return Err(RuntimeError::BotListening {
                bot: self.core.name.clone(),
            });
        }

        {
            let mut slot = self.core.webhook.write();
            if slot.is_some() {
                warn!(bot = %self.core.name, "rejecting webhook: one is already bound");
                return Err(RuntimeError::WebhookAlreadyBound {
                    bot: self.core.name.clone(),
                });
            }
            debug!(
                bot = %self.core.name,
                webhook = webhook.get_name().unwrap_or("unnamed"),
                bindings = webhook.registry().len(),
                "binding webhook"
            );
            *slot = Some(webhook);
        }
        self.core.set_state(BotState::WebhookBound);
        Ok(())
    }

    /// Converts a raw platform payload and dispatches it.
    ///
    /// Without a webhook the payload is dropped unconverted.
    pub async fn handle_webhook(&self, raw: Value) -> RuntimeResult<Dispatched> {
        if !self.has_webhook() {
            debug!(bot = %self.core.name, "no webhook bound, dropping payload");
            return Ok(Dispatched::Unmatched);
        }

        let update = self
            .core
            .adapter
            .convert_update(raw)
            .and_then(|update| {
                update.validate()?;
                Ok(update)
            })
            .map_err(|source| RuntimeError::Adapter {
                service: self.core.service.clone(),
                bot: self.core.name.clone(),
                source,
            })?;

        self.dispatch_update(update).await
    }

    /// Dispatches an already converted update through the bound webhook.
    ///
    /// Without a webhook the update is dropped.
    pub async fn dispatch_update(&self, update: CanonicalUpdate) -> RuntimeResult<Dispatched> {
        let Some(webhook) = self.core.webhook.read().clone() else {
            debug!(bot = %self.core.name, "no webhook bound, dropping update");
            return Ok(Dispatched::Unmatched);
        };

        webhook
            .dispatch(self.view(), update)
            .await
            .map_err(|source| RuntimeError::Webhook {
                service: self.core.service.clone(),
                bot: self.core.name.clone(),
                source,
            })
    }

    /// Binds `webhook` and starts listening. Without a webhook this only
    /// marks a freshly built bot as idle.
    pub async fn start(&self, webhook: Option<Webhook>) -> RuntimeResult<()> {
        let Some(webhook) = webhook else {
            if self.state() == BotState::InstanceBuilt {
                self.core.set_state(BotState::Idle);
            }
            return Ok(());
        };

        self.register_webhook(webhook)?;
        self.core
            .connection
            .listen()
            .await
            .map_err(|source| RuntimeError::Connection {
                bot: self.core.name.clone(),
                source,
            })?;
        self.core.set_state(BotState::Listening);
        info!(service = %self.core.service, bot = %self.core.name, "bot listening");
        Ok(())
    }
}

impl fmt::Debug for ManagedBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedBot")
            .field("service", &self.core.service)
            .field("name", &self.core.name)
            .field("platform", &self.platform())
            .field("state", &self.state())
            .finish()
    }
}

// =============================================================================
// Read-only view
// =============================================================================

struct BotView {
    core: Arc<BotCore>,
}

#[async_trait]
impl Bot for BotView {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn service(&self) -> &str {
        &self.core.service
    }

    fn platform(&self) -> &str {
        self.core.adapter.name()
    }

    fn is_listening(&self) -> bool {
        *self.core.state.read() == BotState::Listening
    }

    fn event_names(&self) -> Vec<String> {
        self.core.event_names()
    }

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        self.core.connection.send_message(chat, text, options).await
    }

    async fn send_file(
        &self,
        chat: &ChatId,
        file: &InputFile,
        caption: Option<&str>,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        self.core
            .connection
            .send_file(chat, file, caption, options)
            .await
    }

    async fn edit_message(
        &self,
        chat: &ChatId,
        message: &MessageId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        self.core
            .connection
            .edit_message(chat, message, text, options)
            .await
    }

    async fn edit_caption(
        &self,
        chat: &ChatId,
        message: &MessageId,
        caption: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        self.core
            .connection
            .edit_caption(chat, message, caption, options)
            .await
    }
}
