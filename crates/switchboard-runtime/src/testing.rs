//! Test doubles shared by the runtime tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use switchboard_core::{
    Adapter, AdapterResult, ApiResult, BoxedConnection, CanonicalUpdate, Chat, ChatId,
    Connection, ConnectionHandle, InputFile, MessageId, MessageInfo, MessageOptions, Sender,
    UpdatePayload,
};

/// Adapter whose raw payloads are serialized canonical updates.
pub(crate) struct EchoAdapter;

impl Adapter for EchoAdapter {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn create_connection(&self, _token: &str, handle: ConnectionHandle) -> BoxedConnection {
        Arc::new(EchoConnection { handle })
    }

    fn convert_update(&self, raw: Value) -> AdapterResult<CanonicalUpdate> {
        Ok(serde_json::from_value::<CanonicalUpdate>(raw.clone())?.with_raw(raw))
    }
}

/// Connection that queues every call under a `send`/`edit` method.
pub(crate) struct EchoConnection {
    handle: ConnectionHandle,
}

#[async_trait]
impl Connection for EchoConnection {
    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        _options: &MessageOptions,
    ) -> ApiResult<()> {
        self.handle.call("send", json!({ "chat": chat, "text": text }))
    }

    async fn send_file(
        &self,
        chat: &ChatId,
        file: &InputFile,
        caption: Option<&str>,
        _options: &MessageOptions,
    ) -> ApiResult<()> {
        self.handle.call(
            "send_file",
            json!({ "chat": chat, "file": file.file_name(), "caption": caption }),
        )
    }

    async fn edit_message(
        &self,
        chat: &ChatId,
        message: &MessageId,
        text: &str,
        _options: &MessageOptions,
    ) -> ApiResult<()> {
        self.handle
            .call("edit", json!({ "chat": chat, "message": message, "text": text }))
    }

    async fn edit_caption(
        &self,
        chat: &ChatId,
        message: &MessageId,
        caption: &str,
        _options: &MessageOptions,
    ) -> ApiResult<()> {
        self.handle.call(
            "edit_caption",
            json!({ "chat": chat, "message": message, "caption": caption }),
        )
    }
}

/// Raw payload for a plain text message in chat 7.
pub(crate) fn text_payload(text: &str) -> Value {
    let payload = match switchboard_core::Command::parse(text) {
        Some(command) => UpdatePayload::Command(command),
        None => UpdatePayload::Text,
    };
    let update = CanonicalUpdate::new(Sender::new(7), Chat::new(7), payload)
        .with_message(MessageInfo::new(1, 1_700_000_000).with_text(text));
    serde_json::to_value(update).unwrap()
}

/// Raw payload for a message without text, like a photo or a sticker.
pub(crate) fn media_payload() -> Value {
    let update = CanonicalUpdate::new(Sender::new(7), Chat::new(7), UpdatePayload::Text)
        .with_message(MessageInfo::new(2, 1_700_000_000));
    serde_json::to_value(update).unwrap()
}
