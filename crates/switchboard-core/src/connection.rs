//! Platform connection contract and the outbound call queue.
//!
//! Adapters never perform network I/O themselves. A [`Connection`] encodes
//! each outbound operation as an [`OutboundCall`] and pushes it onto the queue
//! held by its [`ConnectionHandle`]; whatever transport the host process runs
//! drains the [`OutboundReceiver`] and talks to the platform.
//!
//! ```text
//! bot.send_message(..) ─▶ Connection ─▶ OutboundCall ─▶ queue ─▶ transport
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::error::{ApiError, ApiResult};
use crate::message::{InputFile, MessageOptions};
use crate::update::{ChatId, MessageId};

// =============================================================================
// Outbound queue
// =============================================================================

/// One encoded platform API request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCall {
    /// Bot the call is made on behalf of.
    pub bot: String,
    /// Platform method, e.g. `sendMessage`.
    pub method: String,
    /// JSON body of the request.
    pub params: Value,
    /// Local file the transport must attach as multipart upload.
    pub upload: Option<PathBuf>,
}

/// Sending half of the outbound queue.
pub type OutboundSender = mpsc::UnboundedSender<OutboundCall>;

/// Receiving half of the outbound queue, drained by the transport.
pub type OutboundReceiver = mpsc::UnboundedReceiver<OutboundCall>;

/// Creates an outbound queue.
pub fn outbound_queue() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

// =============================================================================
// Handle
// =============================================================================

/// Handle to one bot's connection.
///
/// Cloning is cheap; all clones share the queue, the shutdown signal and
/// the listening flag.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    bot: String,
    outbound_tx: OutboundSender,
    shutdown_tx: Arc<watch::Sender<bool>>,
    listening: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// Creates a handle that pushes onto `outbound_tx`.
    pub fn new(bot: impl Into<String>, outbound_tx: OutboundSender) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            bot: bot.into(),
            outbound_tx,
            shutdown_tx: Arc::new(shutdown_tx),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a handle with its own queue.
    pub fn channel(bot: impl Into<String>) -> (Self, OutboundReceiver) {
        let (tx, rx) = outbound_queue();
        (Self::new(bot, tx), rx)
    }

    /// Name of the bot this handle belongs to.
    pub fn bot(&self) -> &str {
        &self.bot
    }

    /// Queues a call without an upload.
    pub fn call(&self, method: impl Into<String>, params: Value) -> ApiResult<()> {
        self.push(method.into(), params, None)
    }

    /// Queues a call that carries a local file.
    pub fn call_with_upload(
        &self,
        method: impl Into<String>,
        params: Value,
        upload: PathBuf,
    ) -> ApiResult<()> {
        self.push(method.into(), params, Some(upload))
    }

    fn push(&self, method: String, params: Value, upload: Option<PathBuf>) -> ApiResult<()> {
        if self.is_closed() {
            return Err(self.not_connected());
        }
        trace!(bot = %self.bot, method = %method, "queueing outbound call");
        self.outbound_tx
            .send(OutboundCall {
                bot: self.bot.clone(),
                method,
                params,
                upload,
            })
            .map_err(|_| self.not_connected())
    }

    fn not_connected(&self) -> ApiError {
        ApiError::NotConnected {
            bot: self.bot.clone(),
        }
    }

    /// Closes this connection. Later calls fail with `NotConnected`.
    pub fn close(&self) {
        self.shutdown_tx.send_replace(true);
        self.listening.store(false, Ordering::Release);
    }

    /// Whether the connection was closed or its queue dropped.
    pub fn is_closed(&self) -> bool {
        *self.shutdown_tx.borrow() || self.outbound_tx.is_closed()
    }

    /// Subscribes to the shutdown signal.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Marks the connection as receiving updates.
    pub fn mark_listening(&self) {
        self.listening.store(true, Ordering::Release);
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }
}

// =============================================================================
// Connection trait
// =============================================================================

/// Outbound side of a platform, bound to one bot token.
///
/// None of these methods are called by dispatch itself; handlers reach them
/// through the bot they receive.
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    /// Handle carrying the outbound queue.
    fn handle(&self) -> &ConnectionHandle;

    /// Sends a text message.
    async fn send_message(
        &self,
        chat: &ChatId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    /// Sends a file with an optional caption.
    async fn send_file(
        &self,
        chat: &ChatId,
        file: &InputFile,
        caption: Option<&str>,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    /// Replaces the text of a sent message.
    async fn edit_message(
        &self,
        chat: &ChatId,
        message: &MessageId,
        text: &str,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    /// Replaces the caption of a sent file.
    async fn edit_caption(
        &self,
        chat: &ChatId,
        message: &MessageId,
        caption: &str,
        options: &MessageOptions,
    ) -> ApiResult<()>;

    /// Switches the connection into listening mode.
    async fn listen(&self) -> ApiResult<()> {
        let handle = self.handle();
        if handle.is_closed() {
            return Err(ApiError::NotConnected {
                bot: handle.bot().to_owned(),
            });
        }
        handle.mark_listening();
        Ok(())
    }
}

/// A shared connection trait object.
pub type BoxedConnection = Arc<dyn Connection>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_call_is_queued() {
        let (handle, mut rx) = ConnectionHandle::channel("shop");
        handle.call("sendMessage", json!({"text": "hi"})).unwrap();

        let call = rx.recv().await.unwrap();
        assert_eq!(call.bot, "shop");
        assert_eq!(call.method, "sendMessage");
        assert_eq!(call.params["text"], "hi");
        assert!(call.upload.is_none());
    }

    #[test]
    fn test_closed_handle_rejects_calls() {
        let (handle, _rx) = ConnectionHandle::channel("shop");
        let clone = handle.clone();
        clone.mark_listening();
        handle.close();

        assert!(clone.is_closed());
        assert!(!clone.is_listening());
        assert!(matches!(
            clone.call("sendMessage", json!({})),
            Err(ApiError::NotConnected { bot }) if bot == "shop"
        ));
    }

    #[test]
    fn test_dropped_receiver_closes_handle() {
        let (handle, rx) = ConnectionHandle::channel("shop");
        drop(rx);
        assert!(handle.is_closed());
    }
}
