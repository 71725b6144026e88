//! The Max adapter.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use switchboard_core::{Adapter, AdapterResult, BoxedConnection, CanonicalUpdate, ConnectionHandle};

use crate::connection::MaxConnection;
use crate::convert::convert;
use crate::model::Update;

/// Platform name services use to select this adapter.
pub const PLATFORM: &str = "max";

#[derive(Debug, Clone, Copy, Default)]
pub struct MaxAdapter;

impl MaxAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter for MaxAdapter {
    fn name(&self) -> &'static str {
        PLATFORM
    }

    fn create_connection(&self, token: &str, handle: ConnectionHandle) -> BoxedConnection {
        debug!(bot = %handle.bot(), token_len = token.len(), "creating max connection");
        Arc::new(MaxConnection::new(handle))
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
    use switchboard_core::{AdapterError, ChatId, MessageOptions, UpdateKind};

    #[test]
    fn test_convert_through_adapter() {
        let raw = json!({
            "update_type": "message_callback",
            "timestamp": 1,
            "callback": {"callback_id": "c", "payload": "{\"action\":\"buy\"}", "user": {"user_id": 3}}
        });
        let update = MaxAdapter.convert_update(raw.clone()).unwrap();
        assert_eq!(update.kind(), UpdateKind::Callback);
        assert_eq!(update.chat.id, ChatId::from(3));
        assert_eq!(update.raw, raw);

        assert!(matches!(
            MaxAdapter.convert_update(json!({"timestamp": 1})),
            Err(AdapterError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_uses_handle() {
        let (handle, mut rx) = ConnectionHandle::channel("max-support");
        let conn = MaxAdapter.create_connection("token", handle);
        conn.send_message(&ChatId::from(-20), "hi", &MessageOptions::default())
            .await
            .unwrap();

        let call = rx.try_recv().unwrap();
        assert_eq!(call.bot, "max-support");
        assert_eq!(call.params["chat_id"], -20);
    }
}
