//! Cross-service event routing.
//!
//! The router holds event handlers keyed by event name, then by service
//! name. [`EventRouter::emit`] picks the handler for one service, the bot to
//! run it on and the target chat, then runs it once.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use switchboard_core::ChatId;
use switchboard_framework::{BoxedEvent, EventContext};

use crate::error::{RuntimeError, RuntimeResult};
use crate::service::Service;

/// Bot used by [`EventRouter::emit`] when the request names none.
pub const DEFAULT_BOT: &str = "default";

/// One emission of a named event.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitRequest {
    pub event: String,
    pub bot: Option<String>,
    pub chat_id: Option<ChatId>,
    pub payload: Value,
}

impl EmitRequest {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            bot: None,
            chat_id: None,
            payload,
        }
    }

    /// Runs the event on this bot instead of the default one.
    pub fn bot(mut self, bot: impl Into<String>) -> Self {
        self.bot = Some(bot.into());
        self
    }

    /// Targets this chat instead of the handler's fixed chat.
    pub fn chat_id(mut self, chat_id: impl Into<ChatId>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }
}

/// Event handlers keyed by event name, then service name.
pub struct EventRouter {
    default_bot: String,
    routes: RwLock<HashMap<String, HashMap<String, BoxedEvent>>>,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_default_bot(DEFAULT_BOT)
    }

    pub fn with_default_bot(bot: impl Into<String>) -> Self {
        Self {
            default_bot: bot.into(),
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_bot(&self) -> &str {
        &self.default_bot
    }

    /// Registers `event` for `service` under the event's name. Replaces any
    /// handler already registered for that pair.
    pub fn register(&self, service: impl Into<String>, event: BoxedEvent) {
        let service = service.into();
        let name = event.name();
        debug!(service = %service, event = %name, "registering event route");
        self.routes
            .write()
            .entry(name)
            .or_default()
            .insert(service, event);
    }

    pub fn contains(&self, event: &str, service: &str) -> bool {
        self.routes
            .read()
            .get(event)
            .is_some_and(|services| services.contains_key(service))
    }

    /// Registered event names, sorted.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.routes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Runs the handler registered for `request.event` on `service`.
    pub async fn emit(&self, service: &Service, request: EmitRequest) -> RuntimeResult<()> {
        let EmitRequest {
            event: name,
            bot,
            chat_id,
            payload,
        } = request;

        let handler = self.lookup(&name, service.name())?;
        let bot = service.get_bot(bot.as_deref().unwrap_or(&self.default_bot))?;
        let chat_id = chat_id
            .or_else(|| handler.chat_id())
            .ok_or_else(|| RuntimeError::MissingChatId {
                event: name.clone(),
            })?;

        debug!(service = %service.name(), bot = %bot.name(), event = %name, "emitting event");
        bot.run_event(&handler, &name, EventContext { chat_id, payload })
            .await
    }

    fn lookup(&self, event: &str, service: &str) -> RuntimeResult<BoxedEvent> {
        let routes = self.routes.read();
        let services = routes
            .get(event)
            .ok_or_else(|| RuntimeError::EventNotFound(event.to_owned()))?;
        services
            .get(service)
            .cloned()
            .ok_or_else(|| RuntimeError::EventNotRegisteredForService {
                service: service.to_owned(),
                event: event.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use serde_json::json;
    use switchboard_core::MessageOptions;
    use switchboard_framework::event;

    use crate::testing::EchoAdapter;

    fn service(name: &str) -> Service {
        let service = Service::new(name, Arc::new(EchoAdapter));
        service.register_bot(DEFAULT_BOT, "t0").unwrap();
        service.register_bot("alerts", "t1").unwrap();
        service
    }

    fn notify() -> BoxedEvent {
        event("notify", |bot, ctx: EventContext| async move {
            let text = ctx.payload["text"].as_str().unwrap_or_default().to_owned();
            bot.send_message(&ctx.chat_id, &text, &MessageOptions::default())
                .await?;
            anyhow::Ok(())
        })
        .boxed()
    }

    #[tokio::test]
    async fn test_unknown_event() {
        let router = EventRouter::new();
        let err = router
            .emit(&service("tg"), EmitRequest::new("notify", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::EventNotFound(name) if name == "notify"));
    }

    #[tokio::test]
    async fn test_event_registered_elsewhere() {
        let router = EventRouter::new();
        router.register("max", notify());

        let err = router
            .emit(&service("tg"), EmitRequest::new("notify", json!({})).chat_id(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::EventNotRegisteredForService { service, event }
                if service == "tg" && event == "notify"
        ));
    }

    #[tokio::test]
    async fn test_missing_chat_id() {
        let router = EventRouter::new();
        router.register("tg", notify());

        let err = router
            .emit(&service("tg"), EmitRequest::new("notify", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::MissingChatId { event } if event == "notify"));
    }

    #[tokio::test]
    async fn test_emit_uses_default_bot_and_fixed_chat() {
        let router = EventRouter::new();
        router.register(
            "tg",
            event("notify", |bot, ctx: EventContext| async move {
                bot.send_message(&ctx.chat_id, bot.name(), &MessageOptions::default())
                    .await?;
                anyhow::Ok(())
            })
            .chat_id(-100)
            .boxed(),
        );
        let service = service("tg");
        let mut rx = service.take_outbound().unwrap();

        router
            .emit(&service, EmitRequest::new("notify", json!({})))
            .await
            .unwrap();
        let call = rx.try_recv().unwrap();
        assert_eq!(call.bot, DEFAULT_BOT);
        assert_eq!(call.params, json!({"chat": -100, "text": DEFAULT_BOT}));
    }

    #[tokio::test]
    async fn test_caller_chat_and_bot_win() {
        let router = EventRouter::new();
        router.register("tg", notify());
        let service = service("tg");
        let mut rx = service.take_outbound().unwrap();

        let request = EmitRequest::new("notify", json!({"text": "disk full"}))
            .bot("alerts")
            .chat_id(42);
        router.emit(&service, request).await.unwrap();

        let call = rx.try_recv().unwrap();
        assert_eq!(call.bot, "alerts");
        assert_eq!(call.params, json!({"chat": 42, "text": "disk full"}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_handler_runs_once_and_errors_propagate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = EventRouter::new();
        router.register(
            "tg",
            event("flaky", move |_, _| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("upstream timeout"))
                }
            })
            .boxed(),
        );

        let err = router
            .emit(&service("tg"), EmitRequest::new("flaky", json!({})).chat_id(1))
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            RuntimeError::Handler { ref bot, ref event, .. } if bot == DEFAULT_BOT && event == "flaky"
        ));
    }

    #[tokio::test]
    async fn test_unknown_bot() {
        let router = EventRouter::with_default_bot("main");
        router.register("tg", notify());

        let err = router
            .emit(&service("tg"), EmitRequest::new("notify", json!({})).chat_id(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::BotNotFound { bot, .. } if bot == "main"));
    }

    #[tokio::test]
    async fn test_unknown_bot_reported_before_missing_chat() {
        let router = EventRouter::new();
        router.register("tg", notify());

        let err = router
            .emit(&service("tg"), EmitRequest::new("notify", json!({})).bot("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::BotNotFound { bot, .. } if bot == "ghost"));
    }
}
