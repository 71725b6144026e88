//! Handler system.
//!
//! Handlers are plain async functions or closures. Their parameters are
//! extracted from the [`DispatchContext`] (the read-only bot and the update)
//! through [`FromDispatch`], so a handler only names what it needs:
//!
//! ```rust,ignore
//! async fn greet(bot: BotRef, update: UpdateRef) -> anyhow::Result<()> {
//!     bot.send_message(update.chat_id(), "hello", &MessageOptions::default()).await?;
//!     Ok(())
//! }
//!
//! async fn buy(matches: Matches, bot: BotRef) -> anyhow::Result<()> {
//!     let id = matches.name("id").unwrap_or_default();
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! Handlers may return `()` or any `Result<(), E>` whose error converts into
//! [`anyhow::Error`]. Errors are propagated to the caller of the dispatch,
//! never logged away.

use std::ops::Deref;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;

use switchboard_core::{
    BotRef, Callback, CanonicalUpdate, ChatId, Command, Contact, Location, MatchGroups,
};

/// A shared, immutable update.
pub type UpdateRef = Arc<CanonicalUpdate>;

/// Everything a handler can be called with.
#[derive(Clone)]
pub struct DispatchContext {
    bot: BotRef,
    update: UpdateRef,
}

impl DispatchContext {
    pub fn new(bot: BotRef, update: impl Into<UpdateRef>) -> Self {
        Self {
            bot,
            update: update.into(),
        }
    }

    pub fn bot(&self) -> &BotRef {
        &self.bot
    }

    pub fn update(&self) -> &UpdateRef {
        &self.update
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Types a handler parameter can be extracted as.
pub trait FromDispatch: Sized {
    fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self>;
}

impl FromDispatch for BotRef {
    fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self> {
        Ok(Arc::clone(&ctx.bot))
    }
}

impl FromDispatch for UpdateRef {
    fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self> {
        Ok(Arc::clone(&ctx.update))
    }
}

impl FromDispatch for ChatId {
    fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self> {
        Ok(ctx.update.chat_id().clone())
    }
}

macro_rules! impl_from_payload {
    ($($ty:ident => $accessor:ident),* $(,)?) => {
        $(
            impl FromDispatch for $ty {
                fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self> {
                    ctx.update.$accessor().cloned().ok_or_else(|| {
                        anyhow!(
                            "{} update carries no {}",
                            ctx.update.kind(),
                            stringify!($accessor)
                        )
                    })
                }
            }
        )*
    };
}

impl_from_payload!(
    Command => command,
    Callback => callback,
    Contact => contact,
    Location => location,
);

/// Capture groups of the pattern that resolved the update.
#[derive(Debug, Clone)]
pub struct Matches(pub MatchGroups);

impl Deref for Matches {
    type Target = MatchGroups;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromDispatch for Matches {
    fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self> {
        ctx.update
            .matches()
            .cloned()
            .map(Matches)
            .ok_or_else(|| anyhow!("update was not resolved by a pattern"))
    }
}

impl<T: FromDispatch> FromDispatch for Option<T> {
    fn from_dispatch(ctx: &DispatchContext) -> anyhow::Result<Self> {
        Ok(T::from_dispatch(ctx).ok())
    }
}

// ============================================================================
// Return values
// ============================================================================

/// Handler return values.
pub trait IntoHandlerResult: Send {
    fn into_handler_result(self) -> anyhow::Result<()>;
}

impl IntoHandlerResult for () {
    fn into_handler_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<anyhow::Error> + Send,
{
    fn into_handler_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// Implemented for async functions taking up to four [`FromDispatch`]
/// parameters.
pub trait Handler<T>: Clone + Send + Sync + 'static {
    fn call(self, ctx: DispatchContext) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// A type-erased handler stored in registries.
pub type BoxedHandler =
    Arc<dyn Fn(DispatchContext) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Converts a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T>,
    T: 'static,
{
    Arc::new(move |ctx| f.clone().call(ctx))
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoHandlerResult,
            $( $ty: FromDispatch + Send + 'static, )*
        {
            fn call(self, ctx: DispatchContext) -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(async move {
                    $( let $ty = $ty::from_dispatch(&ctx)?; )*
                    (self)($($ty,)*).await.into_handler_result()
                })
            }
        }
    };
}

impl_handler!();
impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
