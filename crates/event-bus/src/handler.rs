//! Subscriber side of the bus.

use std::future::Future;

use async_trait::async_trait;

use crate::event::Event;

/// Type-erased failure reported by a handler. The bus records it and moves on.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of a single handler invocation.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Reacts to events of the kinds it is registered for.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// Handles one event. Runs on its own task; the bus never awaits it.
    async fn handle(&self, event: E) -> HandlerResult;
}

/// Adapts an async closure into an [`EventHandler`].
///
/// Built with [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wraps `f` so it can be passed to [`EventBus::register`](crate::EventBus::register).
///
/// ```ignore
/// bus.register(Kind::Created, handler_fn(|event: MyEvent| async move {
///     tracing::info!(?event, "seen");
///     Ok(())
/// }));
/// ```
pub fn handler_fn<E, F, Fut>(f: F) -> FnHandler<F>
where
    E: Event,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<E, F, Fut> EventHandler<E> for FnHandler<F>
where
    E: Event,
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, event: E) -> HandlerResult {
        (self.f)(event).await
    }
}
