//! Outbound Bot API calls.
//!
//! Every call is encoded as a Bot API method plus a JSON body and queued on
//! the bot's [`ConnectionHandle`]. Local files are referenced as
//! `attach://<name>` and handed to the transport for multipart upload.
//! Text and captions go through [`prepare_text`] first.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use switchboard_core::{
    ApiError, ApiResult, ChatId, Connection, ConnectionHandle, InputFile, MediaType, MessageId,
    MessageOptions, ParseMode,
};

use crate::keyboard::{inline_markup, reply_markup};
use crate::text::prepare_text;

/// Connection for one Telegram bot token.
pub struct TelegramConnection {
    handle: ConnectionHandle,
}

impl TelegramConnection {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle }
    }
}

fn parse_mode(options: &MessageOptions) -> &'static str {
    match options.parse_mode.unwrap_or_default() {
        ParseMode::Html => "HTML",
        ParseMode::Markdown => "Markdown",
        ParseMode::MarkdownV2 => "MarkdownV2",
    }
}

/// Fields shared by every send call.
fn base_params(chat: &ChatId, options: &MessageOptions) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("chat_id".into(), json!(chat));
    params.insert("parse_mode".into(), json!(parse_mode(options)));
    if options.disable_notification {
        params.insert("disable_notification".into(), json!(true));
    }
    if let Some(markup) = reply_markup(&options.buttons) {
        params.insert("reply_markup".into(), markup);
    }
    params
}

fn edit_params(chat: &ChatId, message: &MessageId, options: &MessageOptions) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert("chat_id".into(), json!(chat));
    params.insert("message_id".into(), json!(message));
    params.insert("parse_mode".into(), json!(parse_mode(options)));
    if let Some(markup) = inline_markup(&options.buttons) {
        params.insert("reply_markup".into(), markup);
    }
    params
}

/// Upload method and its file field for a media type.
fn upload_method(media: MediaType) -> (&'static str, &'static str) {
    match media {
        MediaType::Photo => ("sendPhoto", "photo"),
        MediaType::Video => ("sendVideo", "video"),
        MediaType::Audio => ("sendAudio", "audio"),
        MediaType::Document => ("sendDocument", "document"),
    }
}

#[async_trait]
impl Connection for TelegramConnection {
    fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        let mut params = base_params(chat, options);
        let text = prepare_text(text, options.parse_mode.unwrap_or_default());
        params.insert("text".into(), json!(text));
        self.handle.call("sendMessage", Value::Object(params))
    }

    async fn send_file(
        &self,
        chat: &ChatId,
        file: &InputFile,
        caption: Option<&str>,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        // File ids carry no name; Telegram accepts any id as a document.
        let media = file
            .file_name()
            .map_or(MediaType::Document, MediaType::classify);
        let (method, field) = upload_method(media);
        debug!(bot = %self.handle.bot(), method, chat = %chat, "sending file");

        let mut params = base_params(chat, options);
        if let Some(caption) = caption {
            let caption = prepare_text(caption, options.parse_mode.unwrap_or_default());
            params.insert("caption".into(), json!(caption));
        }

        match file {
            InputFile::Path(path) => {
                let name = file.file_name().ok_or_else(|| {
                    ApiError::rejected(method, format!("'{}' has no file name", path.display()))
                })?;
                params.insert(field.into(), json!(format!("attach://{name}")));
                self.handle
                    .call_with_upload(method, Value::Object(params), path.clone())
            }
            InputFile::Url(url) => {
                params.insert(field.into(), json!(url));
                self.handle.call(method, Value::Object(params))
            }
            InputFile::Id(id) => {
                params.insert(field.into(), json!(id));
                self.handle.call(method, Value::Object(params))
            }
        }
    }

    async fn edit_message(
        &self,
        chat: &ChatId,
        message: &MessageId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        let mut params = edit_params(chat, message, options);
        let text = prepare_text(text, options.parse_mode.unwrap_or_default());
        params.insert("text".into(), json!(text));
        self.handle.call("editMessageText", Value::Object(params))
    }

    async fn edit_caption(
        &self,
        chat: &ChatId,
        message: &MessageId,
        caption: &str,
        options: &MessageOptions,
    ) -> ApiResult<()> {
        let mut params = edit_params(chat, message, options);
        let caption = prepare_text(caption, options.parse_mode.unwrap_or_default());
        params.insert("caption".into(), json!(caption));
        self.handle.call("editMessageCaption", Value::Object(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use switchboard_core::{Button, OutboundReceiver};

    fn connection() -> (TelegramConnection, OutboundReceiver) {
        let (handle, rx) = ConnectionHandle::channel("shop");
        (TelegramConnection::new(handle), rx)
    }

    #[tokio::test]
    async fn test_send_message_defaults_to_html() {
        let (conn, mut rx) = connection();
        conn.send_message(&ChatId::from(7), "<b>hi</b>", &MessageOptions::default())
            .await
            .unwrap();

        let call = rx.try_recv().unwrap();
        assert_eq!(call.method, "sendMessage");
        assert_eq!(
            call.params,
            json!({"chat_id": 7, "parse_mode": "HTML", "text": "<b>hi</b>"})
        );
    }

    #[tokio::test]
    async fn test_send_message_with_options() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::new()
            .parse_mode(ParseMode::MarkdownV2)
            .button(Button::callback("Yes", json!("yes")))
            .silent();
        conn.send_message(&ChatId::from("@channel"), "*hi*", &options)
            .await
            .unwrap();

        let params = rx.try_recv().unwrap().params;
        assert_eq!(params["chat_id"], "@channel");
        assert_eq!(params["parse_mode"], "MarkdownV2");
        assert_eq!(params["disable_notification"], true);
        assert_eq!(params["reply_markup"]["inline_keyboard"][0][0]["callback_data"], "yes");
    }

    #[tokio::test]
    async fn test_send_file_picks_method_by_extension() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::default();

        conn.send_file(&ChatId::from(7), &InputFile::path("/tmp/cat.JPG"), Some("cat"), &options)
            .await
            .unwrap();
        let call = rx.try_recv().unwrap();
        assert_eq!(call.method, "sendPhoto");
        assert_eq!(call.params["photo"], "attach://cat.JPG");
        assert_eq!(call.params["caption"], "cat");
        assert_eq!(call.upload, Some(PathBuf::from("/tmp/cat.JPG")));

        conn.send_file(&ChatId::from(7), &InputFile::url("https://x.io/a.mp3"), None, &options)
            .await
            .unwrap();
        let call = rx.try_recv().unwrap();
        assert_eq!(call.method, "sendAudio");
        assert_eq!(call.params["audio"], "https://x.io/a.mp3");
        assert!(call.upload.is_none());

        conn.send_file(&ChatId::from(7), &InputFile::Id("AgAD".into()), None, &options)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().method, "sendDocument");
    }

    #[tokio::test]
    async fn test_edit_drops_reply_keyboard() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::new().button(Button::request_contact("Phone"));
        conn.edit_message(&ChatId::from(7), &MessageId::from(42), "new", &options)
            .await
            .unwrap();

        let call = rx.try_recv().unwrap();
        assert_eq!(call.method, "editMessageText");
        assert_eq!(
            call.params,
            json!({"chat_id": 7, "message_id": 42, "parse_mode": "HTML", "text": "new"})
        );

        conn.edit_caption(&ChatId::from(7), &MessageId::from(42), "cap", &options)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().method, "editMessageCaption");
    }

    #[tokio::test]
    async fn test_html_text_is_prepared() {
        let (conn, mut rx) = connection();
        let options = MessageOptions::default();

        conn.send_message(&ChatId::from(7), "<div>Hi</div><br/><b>there</b>", &options)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().params["text"], "Hi\n<b>there</b>");

        conn.send_file(&ChatId::from(7), &InputFile::Id("AgAD".into()), Some("a<br>b"), &options)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().params["caption"], "a\nb");

        conn.edit_message(&ChatId::from(7), &MessageId::from(42), "<span>x</span>", &options)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().params["text"], "x");

        conn.edit_caption(&ChatId::from(7), &MessageId::from(42), "<p>y</p>", &options)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().params["caption"], "\ny");

        let markdown = MessageOptions::new().parse_mode(ParseMode::Markdown);
        conn.send_message(&ChatId::from(7), "<br>*x*", &markdown)
            .await
            .unwrap();
        assert_eq!(rx.try_recv().unwrap().params["text"], "<br>*x*");
    }

    #[tokio::test]
    async fn test_listen_then_closed() {
        let (conn, _rx) = connection();
        conn.listen().await.unwrap();
        assert!(conn.handle().is_listening());

        conn.handle().close();
        let err = conn
            .send_message(&ChatId::from(7), "hi", &MessageOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotConnected { .. }));
    }
}
