//! The read-only bot interface handed to handlers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::message::{InputFile, MessageOptions};
use crate::tag::add_tag;
use crate::update::{ChatId, MessageId};

/// What a handler can see and do with the bot that received its update.
///
/// The interface exposes accessors and outbound operations only. Bot state
/// (the bound webhook, event registrations, the lifecycle) is owned by the
/// runtime and cannot be reached through it.
#[async_trait]
pub trait Bot: Send + Sync + 'static {
    /// Bot name, unique within its service.
    fn name(&self) -> &str;

    /// Name of the owning service.
    fn service(&self) -> &str;

    /// Platform of the owning service's adapter.
    fn platform(&self) -> &str;

    /// Whether the bot has started listening.
    fn is_listening(&self) -> bool;

    /// Names of the events registered on this bot, sorted.
    fn event_names(&self) -> Vec<String>;

    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    async fn send_file(
        &self,
        chat: &ChatId,
        file: &InputFile,
        caption: Option<&str>,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    async fn edit_message(
        &self,
        chat: &ChatId,
        message: &MessageId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    async fn edit_caption(
        &self,
        chat: &ChatId,
        message: &MessageId,
        caption: &str,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    /// Adds `tag` to the tag group of a sent message and edits it.
    ///
    /// `text` is the message as currently rendered. Returns the new text; if
    /// the tag is already present no edit is made.
    async fn add_message_tag(
        &self,
        chat: &ChatId,
        message: &MessageId,
        text: &str,
        tag: &str,
        options: &MessageOptions,
    ) -> ApiResult<String> {
        let tagged = add_tag(text, tag);
        if tagged != text {
            self.edit_message(chat, message, &tagged, options).await?;
        }
        Ok(tagged)
    }

    /// Like [`add_message_tag`](Self::add_message_tag), for a file caption.
    async fn add_file_tag(
        &self,
        chat: &ChatId,
        message: &MessageId,
        caption: &str,
        tag: &str,
        options: &MessageOptions,
    ) -> ApiResult<String> {
        let tagged = add_tag(caption, tag);
        if tagged != caption {
            self.edit_caption(chat, message, &tagged, options).await?;
        }
        Ok(tagged)
    }
}

/// A shared read-only bot reference.
pub type BotRef = Arc<dyn Bot>;
