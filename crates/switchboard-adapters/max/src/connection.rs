//! Outbound Max Bot API calls.
//!
//! Max addresses group chats by chat id and dialogs by user id. Chat ids
//! are negative, so the sign of the target picks the recipient field.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use switchboard_core::{
    ApiError, ApiResult, ChatId, Connection, ConnectionHandle, InputFile, MediaType, MessageId,
    MessageOptions, ParseMode,
};

use crate::keyboard::inline_keyboard;

const SEND: &str = "sendMessage";
const EDIT: &str = "editMessage";

/// Connection for one Max bot token.
pub struct MaxConnection {
    handle: ConnectionHandle,
}

impl MaxConnection {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle }
    }
}

/// `chat_id` for chats, `user_id` for dialogs.
fn recipient(method: &str, chat: &ChatId) -> ApiResult<(&'static str, i64)> {
    let id = chat
        .as_i64()
        .ok_or_else(|| ApiError::rejected(method, format!("'{chat}' is not a numeric id")))?;
    Ok((if id < 0 { "chat_id" } else { "user_id" }, id))
}

fn format(options: &MessageOptions) -> Option<&'static str> {
    options.parse_mode.map(|mode| match mode {
        ParseMode::Html => "html",
        ParseMode::Markdown | ParseMode::MarkdownV2 => "markdown",
    })
}

/// Body fields shared by sends and edits.
fn body(text: &str, options: &MessageOptions, attachments: Vec<Value>) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("text".into(), json!(text));
    if let Some(format) = format(options) {
        body.insert("format".into(), json!(format));
    }
    if options.disable_notification {
        body.insert("notify".into(), json!(false));
    }

    let attachments: Vec<Value> = attachments
        .into_iter()
        .chain(inline_keyboard(&options.buttons))
        .collect();
    if !attachments.is_empty() {
        body.insert("attachments".into(), Value::Array(attachments));
    }
    body
}

fn attachment_type(media: MediaType) -> &'static str {
    match media {
        MediaType::Photo => "image",
        MediaType::Video => "video",
        MediaType::Audio => "audio",
        MediaType::Document => "file",
    }
}

/// Adds the recipient field to a send body.
fn addressed(chat: &ChatId, mut body: Map<String, Value>) -> ApiResult<Value> {
    let (field, id) = recipient(SEND, chat)?;
    body.insert(field.into(), json!(id));
    Ok(Value::Object(body))
}

impl MaxConnection {
    fn edit(
        &self,
        message: &MessageId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        let mut params = body(text, options, Vec::new());
        params.insert("message_id".into(), json!(message.to_string()));
        self.handle.call(EDIT, Value::Object(params))
    }
}

#[async_trait]
impl Connection for MaxConnection {
    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        let params = addressed(chat, body(text, options, Vec::new()))?;
        self.handle.call(SEND, params)
    }

    async fn send_file(
        &self,
        chat: &ChatId,
        file: &InputFile,
        caption: Option<&str>,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        let media = file
            .file_name()
            .map_or(MediaType::Document, MediaType::classify);
        let kind = attachment_type(media);
        debug!(bot = %self.handle.bot(), kind, chat = %chat, "sending file");

        // Uploaded files get their token from the transport after upload.
        let (payload, upload) = match file {
            InputFile::Path(path) => (json!({}), Some(path.clone())),
            InputFile::Url(url) => (json!({ "url": url }), None),
            InputFile::Id(token) => (json!({ "token": token }), None),
        };
        let attachment = json!({ "type": kind, "payload": payload });
        let params = addressed(
            chat,
            body(caption.unwrap_or_default(), options, vec![attachment]),
        )?;

        match upload {
            Some(path) => self.handle.call_with_upload(SEND, params, path),
            None => self.handle.call(SEND, params),
        }
    }

    async fn edit_message(
        &self,
        _chat: &ChatId,
        message: &MessageId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        self.edit(message, text, options)
    }

    /// Max keeps a single text per message, so the caption replaces it.
    async fn edit_caption(
        &self,
        _chat: &ChatId,
        message: &MessageId,
        caption: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        self.edit(message, caption, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use switchboard_core::{Button, OutboundReceiver};

    fn connection() -> (MaxConnection, OutboundReceiver) {
        let (handle, rx) = ConnectionHandle::channel("max-main");
        (MaxConnection::new(handle), rx)
    }

    #[tokio::test]
    async fn test_recipient_by_sign() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::default();

        conn.send_message(&ChatId::from(7), "hi", &options).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().params, json!({"user_id": 7, "text": "hi"}));

        conn.send_message(&ChatId::from("-100"), "hi", &options).await.unwrap();
        assert_eq!(rx.try_recv().unwrap().params, json!({"chat_id": -100, "text": "hi"}));

        let err = conn
            .send_message(&ChatId::from("@room"), "hi", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_options() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::new()
            .parse_mode(ParseMode::MarkdownV2)
            .button(Button::callback("Ok", json!("ok")))
            .silent();
        conn.send_message(&ChatId::from(-1), "*x*", &options).await.unwrap();

        let params = rx.try_recv().unwrap().params;
        assert_eq!(params["format"], "markdown");
        assert_eq!(params["notify"], false);
        assert_eq!(params["attachments"][0]["payload"]["buttons"][0][0]["payload"], "ok");
    }

    #[tokio::test]
    async fn test_send_file() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::new().button(Button::callback("More", None));

        conn.send_file(&ChatId::from(7), &InputFile::path("/srv/report.pdf"), None, &options)
            .await
            .unwrap();
        let call = rx.try_recv().unwrap();
        assert_eq!(call.method, "sendMessage");
        assert_eq!(call.upload, Some(PathBuf::from("/srv/report.pdf")));
        assert_eq!(call.params["text"], "");
        assert_eq!(call.params["attachments"][0], json!({"type": "file", "payload": {}}));
        assert_eq!(call.params["attachments"][1]["type"], "inline_keyboard");

        conn.send_file(&ChatId::from(7), &InputFile::url("https://x/p.png"), Some("pic"), &options)
            .await
            .unwrap();
        let params = rx.try_recv().unwrap().params;
        assert_eq!(params["attachments"][0]["type"], "image");
        assert_eq!(params["attachments"][0]["payload"]["url"], "https://x/p.png");
        assert_eq!(params["text"], "pic");
    }

    #[tokio::test]
    async fn test_edit_caption_replaces_text() {
        let (conn, mut rx) = connection();
        conn.edit_caption(
            &ChatId::from(7),
            &MessageId::from("mid.42"),
            "#done\n\nphoto",
            &MessageOptions::default(),
        )
        .await
        .unwrap();

        let call = rx.try_recv().unwrap();
        assert_eq!(call.method, "editMessage");
        assert_eq!(call.params, json!({"message_id": "mid.42", "text": "#done\n\nphoto"}));
    }
}
