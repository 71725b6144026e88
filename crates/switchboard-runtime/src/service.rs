//! Services: one adapter, many bots.

use std::collections::HashMap;
use std::fmt;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use switchboard_core::{BoxedAdapter, OutboundReceiver, OutboundSender, outbound_queue};
use switchboard_framework::BoxedEvent;

use crate::bot::ManagedBot;
use crate::error::{RuntimeError, RuntimeResult};

#[derive(Default)]
struct Bots {
    order: Vec<ManagedBot>,
    index: HashMap<String, usize>,
}

/// A named group of bots sharing one platform adapter and one outbound
/// queue.
pub struct Service {
    name: String,
    adapter: BoxedAdapter,
    outbound_tx: OutboundSender,
    outbound_rx: Mutex<Option<OutboundReceiver>>,
    bots: RwLock<Bots>,
}

impl Service {
    pub fn new(name: impl Into<String>, adapter: BoxedAdapter) -> Self {
        let (outbound_tx, outbound_rx) = outbound_queue();
        let name = name.into();
        debug!(service = %name, platform = adapter.name(), "service created");
        Self {
            name,
            adapter,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            bots: RwLock::new(Bots::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the platform behind this service's adapter.
    pub fn platform(&self) -> &'static str {
        self.adapter.name()
    }

    /// Takes the receiving end of the outbound queue. Only the first call
    /// gets it; the transport draining it owns it from then on.
    pub fn take_outbound(&self) -> Option<OutboundReceiver> {
        self.outbound_rx.lock().take()
    }

    /// Creates and registers a bot. A name already taken is rejected and
    /// leaves the existing bot untouched.
    pub fn register_bot(&self, name: &str, token: &str) -> RuntimeResult<ManagedBot> {
        self.register_bot_with_events(name, token, Vec::<BoxedEvent>::new())
    }

    /// Creates a bot with its events already registered.
    pub fn register_bot_with_events(
        &self,
        name: &str,
        token: &str,
        events: impl IntoIterator<Item = BoxedEvent>,
    ) -> RuntimeResult<ManagedBot> {
        let mut bots = self.bots.write();
        if bots.index.contains_key(name) {
            return Err(RuntimeError::BotExists {
                service: self.name.clone(),
                bot: name.to_owned(),
            });
        }

        let bot = ManagedBot::new(
            self.name.clone(),
            name,
            token,
            self.adapter.clone(),
            self.outbound_tx.clone(),
        );
        for event in events {
            bot.register_event(event);
        }

        let position = bots.order.len();
        bots.order.push(bot.clone());
        bots.index.insert(name.to_owned(), position);
        info!(service = %self.name, bot = %name, "bot registered");
        Ok(bot)
    }

    pub fn get_bot(&self, name: &str) -> RuntimeResult<ManagedBot> {
        let bots = self.bots.read();
        bots.index
            .get(name)
            .map(|&i| bots.order[i].clone())
            .ok_or_else(|| RuntimeError::BotNotFound {
                service: self.name.clone(),
                bot: name.to_owned(),
            })
    }

    /// Bot names in registration order.
    pub fn bot_names(&self) -> Vec<String> {
        self.bots
            .read()
            .order
            .iter()
            .map(|bot| bot.name().to_owned())
            .collect()
    }

    /// Bots in registration order.
    pub fn bots(&self) -> Vec<ManagedBot> {
        self.bots.read().order.clone()
    }

    /// First bot, in registration order, that has `event` registered.
    pub fn find_bot_with_event(&self, event: &str) -> Option<ManagedBot> {
        self.bots
            .read()
            .order
            .iter()
            .find(|bot| bot.has_event(event))
            .cloned()
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("platform", &self.platform())
            .field("bots", &self.bot_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use serde_json::json;
    use switchboard_core::{ChatId, MessageOptions};
    use switchboard_framework::event;

    use crate::testing::EchoAdapter;

    fn service() -> Service {
        Service::new("echo", Arc::new(EchoAdapter))
    }

    #[test]
    fn test_duplicate_bot_keeps_original() {
        let service = service();
        let first = service.register_bot("main", "a").unwrap();
        first.register_event(event("ping", |_, _| async { Ok(()) }).boxed());

        let err = service.register_bot("main", "b").unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::BotExists { service, bot } if service == "echo" && bot == "main"
        ));
        assert!(service.get_bot("main").unwrap().has_event("ping"));
        assert_eq!(service.bot_names(), ["main"]);
    }

    #[test]
    fn test_missing_bot_names_key_and_container() {
        let err = service().get_bot("ghost").unwrap_err();
        assert_eq!(err.to_string(), "bot 'ghost' not found in service 'echo'");
    }

    #[test]
    fn test_find_bot_with_event_uses_registration_order() {
        let service = service();
        service.register_bot("a", "1").unwrap();
        service
            .register_bot_with_events("b", "2", [event("ping", |_, _| async { Ok(()) }).boxed()])
            .unwrap();
        service
            .register_bot_with_events("c", "3", [event("ping", |_, _| async { Ok(()) }).boxed()])
            .unwrap();

        assert_eq!(service.find_bot_with_event("ping").unwrap().name(), "b");
        assert!(service.find_bot_with_event("pong").is_none());
    }

    #[tokio::test]
    async fn test_bots_share_outbound_queue() {
        let service = service();
        let mut rx = service.take_outbound().unwrap();
        assert!(service.take_outbound().is_none());

        let a = service.register_bot("a", "1").unwrap();
        let b = service.register_bot("b", "2").unwrap();
        let options = MessageOptions::default();
        a.view().send_message(&ChatId::from(1), "from a", &options).await.unwrap();
        b.view().send_message(&ChatId::from(2), "from b", &options).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.bot.as_str(), second.bot.as_str()), ("a", "b"));
        assert_eq!(second.params, json!({"chat": 2, "text": "from b"}));
    }
}
