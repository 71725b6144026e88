//! The Telegram adapter.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use switchboard_core::{Adapter, AdapterResult, BoxedConnection, CanonicalUpdate, ConnectionHandle};

use crate::connection::TelegramConnection;
use crate::convert::convert;
use crate::model::Update;

/// Platform name services use to select this adapter.
pub const PLATFORM: &str = "telegram";

/// Stateless Telegram adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TelegramAdapter;

impl TelegramAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter for TelegramAdapter {
    fn name(&self) -> &'static str {
        PLATFORM
    }

    fn create_connection(&self, token: &str, handle: ConnectionHandle) -> BoxedConnection {
        // The token only authenticates transport requests, never payloads.
        debug!(bot = %handle.bot(), token_len = token.len(), "creating telegram connection");
        Arc::new(TelegramConnection::new(handle))
    }

    fn convert_update(&self, raw: Value) -> AdapterResult<CanonicalUpdate> {
        let update: Update = serde_json::from_value(raw.clone())?;
        convert(update, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use switchboard_core::{AdapterError, ChatId, MessageOptions};

    #[test]
    fn test_convert_through_adapter() {
        let raw = json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "from": {"id": 5, "is_bot": false},
                "chat": {"id": 5, "type": "private"},
                "date": 1,
                "text": "/help"
            }
        });
        let update = TelegramAdapter.convert_update(raw).unwrap();
        assert_eq!(update.command().unwrap().name, "help");
        assert!(matches!(
            TelegramAdapter.convert_update(json!([1, 2])),
            Err(AdapterError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_uses_handle() {
        let (handle, mut rx) = ConnectionHandle::channel("support");
        let conn = TelegramAdapter.create_connection("123:abc", handle);
        conn.send_message(&ChatId::from(5), "hi", &MessageOptions::default())
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().bot, "support");
    }
}
