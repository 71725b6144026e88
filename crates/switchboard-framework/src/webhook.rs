//! Webhooks: declarative handler sets bound to a bot.
//!
//! A [`Webhook`] is built once, from a fluent builder or from an explicit
//! list of [`Binding`]s, and copies every binding into its own private
//! [`HandlerRegistry`]. Two webhooks never share handler tables.
//!
//! ```rust,ignore
//! let webhook = Webhook::new()
//!     .name("shop")
//!     .command("start", on_start)
//!     .action(Pattern::regex(r"^buy:(?P<id>\d+)$")?, on_buy)
//!     .text("help", on_help)
//!     .contact(on_contact)
//!     .unknown(on_unknown);
//! ```
//!
//! # Tower Service Integration
//!
//! `Webhook` implements `tower::Service<(BotRef, CanonicalUpdate)>`, so
//! middleware can wrap webhook dispatch:
//!
//! ```rust,ignore
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(16)
//!     .service(webhook);
//! ```

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{Instrument, Level, debug, span, trace};

use switchboard_core::{BotRef, CanonicalUpdate};

use crate::handler::{BoxedHandler, DispatchContext, Handler, into_handler};
use crate::registry::{HandlerRegistry, Pattern, Route};

// ============================================================================
// Binding
// ============================================================================

/// One declared binding.
#[derive(Clone)]
pub enum Binding {
    Command(String, BoxedHandler),
    Action(Pattern, BoxedHandler),
    Text(Pattern, BoxedHandler),
    Contact(BoxedHandler),
    Location(BoxedHandler),
    /// Fallback for updates nothing else resolves.
    Unknown(BoxedHandler),
}

impl Binding {
    pub fn command<F, T>(name: impl Into<String>, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self::Command(name.into(), into_handler(handler))
    }

    pub fn action<F, T>(pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self::Action(pattern.into(), into_handler(handler))
    }

    pub fn text<F, T>(pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self::Text(pattern.into(), into_handler(handler))
    }

    pub fn contact<F, T>(handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self::Contact(into_handler(handler))
    }

    pub fn location<F, T>(handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self::Location(into_handler(handler))
    }

    pub fn unknown<F, T>(handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        Self::Unknown(into_handler(handler))
    }
}

// ============================================================================
// Webhook
// ============================================================================

#[derive(Clone, Default)]
struct WebhookInner {
    name: Option<String>,
    registry: HandlerRegistry,
    unknown: Option<BoxedHandler>,
}

/// A set of handlers with their own registry.
///
/// Cloning is cheap. Builder methods copy the registry only when a clone is
/// still shared.
#[derive(Clone, Default)]
pub struct Webhook {
    inner: Arc<WebhookInner>,
}

/// Outcome of dispatching one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A binding resolved the update and its handler ran.
    Handled(Route),
    /// Nothing resolved; the `unknown` fallback ran.
    Fallback,
    /// Nothing resolved and there is no fallback. Not an error.
    Unmatched,
}

impl Webhook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a webhook by walking `bindings` once, in order.
    pub fn from_bindings(bindings: impl IntoIterator<Item = Binding>) -> Self {
        bindings.into_iter().fold(Self::new(), Self::bind)
    }

    fn inner_mut(&mut self) -> &mut WebhookInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets a name used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.inner_mut().name = Some(name.into());
        self
    }

    /// Adds one declared binding.
    pub fn bind(mut self, binding: Binding) -> Self {
        let inner = self.inner_mut();
        match binding {
            Binding::Command(name, h) => inner.registry.register_command(&name, h),
            Binding::Action(pattern, h) => inner.registry.register_action(pattern, h),
            Binding::Text(pattern, h) => inner.registry.register_text(pattern, h),
            Binding::Contact(h) => inner.registry.register_contact(h),
            Binding::Location(h) => inner.registry.register_location(h),
            Binding::Unknown(h) => inner.unknown = Some(h),
        }
        self
    }

    pub fn command<F, T>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.bind(Binding::command(name, handler))
    }

    pub fn action<F, T>(self, pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.bind(Binding::action(pattern, handler))
    }

    pub fn text<F, T>(self, pattern: impl Into<Pattern>, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.bind(Binding::text(pattern, handler))
    }

    pub fn contact<F, T>(self, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.bind(Binding::contact(handler))
    }

    pub fn location<F, T>(self, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.bind(Binding::location(handler))
    }

    pub fn unknown<F, T>(self, handler: F) -> Self
    where
        F: Handler<T>,
        T: 'static,
    {
        self.bind(Binding::unknown(handler))
    }

    /// Returns the name of this webhook, if set.
    pub fn get_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.inner.registry
    }

    pub fn has_fallback(&self) -> bool {
        self.inner.unknown.is_some()
    }

    /// Resolves the update and runs one handler.
    ///
    /// Handler errors are returned unchanged.
    pub async fn dispatch(
        &self,
        bot: BotRef,
        mut update: CanonicalUpdate,
    ) -> anyhow::Result<Dispatched> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            webhook = self.get_name().unwrap_or("unnamed"),
            bot = bot.name(),
            kind = %update.kind(),
        );

        async move {
            let resolution = self.inner.registry.resolve(&mut update);
            let (handler, outcome) = match resolution {
                Some(resolution) => (resolution.handler, Dispatched::Handled(resolution.route)),
                None => match &self.inner.unknown {
                    Some(fallback) => {
                        debug!("no binding matched, running fallback");
                        (fallback.clone(), Dispatched::Fallback)
                    }
                    None => {
                        trace!("no binding matched, dropping update");
                        return Ok(Dispatched::Unmatched);
                    }
                },
            };

            handler(DispatchContext::new(bot, update))
                .await
                .map(|()| outcome)
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Webhook")
            .field("name", &self.inner.name)
            .field("registry", &self.inner.registry)
            .field("fallback", &self.has_fallback())
            .finish()
    }
}

// ============================================================================
// Tower Service Implementation for Webhook
// ============================================================================

impl Service<(BotRef, CanonicalUpdate)> for Webhook {
    type Response = Dispatched;
    type Error = anyhow::Error;
    type Future =
        Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, (bot, update): (BotRef, CanonicalUpdate)) -> Self::Future {
        let webhook = self.clone();
        Box::pin(async move { webhook.dispatch(bot, update).await })
    }
}
