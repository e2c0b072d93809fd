//! Wires the service's handler methods onto its bus.

use std::future::Future;
use std::sync::{Arc, Weak};

use event_bus::{EventHandler, HandlerError, handler_fn};

use crate::error::Result;
use crate::events::{ArticleEvent, ArticleEventKind};
use crate::service::ArticleService;
use crate::stores::{CacheStore, PrimaryStore, ProjectionStore};

/// Registers the article reactions on `service.bus()`:
///
/// | Event                   | Reaction            |
/// |-------------------------|---------------------|
/// | `PrimaryWriteFailed`    | `remove_projection` |
/// | `PrimaryWriteSucceeded` | `warm_cache`        |
/// | `ProjectionWriteFailed` | `rehydrate`         |
/// | `ProjectionMiss`        | `rehydrate`         |
///
/// Handlers keep only a weak reference, so the bus does not keep the service
/// alive. Events arriving after the service is dropped are ignored.
pub fn register_subscribers<P, X, C>(service: &Arc<ArticleService<P, X, C>>)
where
    P: PrimaryStore + 'static,
    X: ProjectionStore + 'static,
    C: CacheStore + 'static,
{
    let bus = service.bus();

    bus.register(
        ArticleEventKind::PrimaryWriteFailed,
        subscriber(service, |service, event| async move {
            service.remove_projection(event).await
        }),
    );
    bus.register(
        ArticleEventKind::PrimaryWriteSucceeded,
        subscriber(service, |service, event| async move {
            service.warm_cache(event).await
        }),
    );
    for kind in [
        ArticleEventKind::ProjectionWriteFailed,
        ArticleEventKind::ProjectionMiss,
    ] {
        bus.register(
            kind,
            subscriber(service, |service, event| async move {
                service.rehydrate(event).await
            }),
        );
    }

    tracing::info!("article subscribers registered");
}

fn subscriber<S, F, Fut>(
    service: &Arc<S>,
    reaction: F,
) -> impl EventHandler<ArticleEvent> + 'static
where
    S: Send + Sync + 'static,
    F: Fn(Arc<S>, ArticleEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let service: Weak<S> = Arc::downgrade(service);

    handler_fn(move |event: ArticleEvent| {
        let pending = service.upgrade().map(|service| reaction(service, event));
        async move {
            match pending {
                Some(pending) => pending.await.map_err(HandlerError::from),
                None => {
                    tracing::debug!("article service dropped, event ignored");
                    Ok(())
                }
            }
        }
    })
}
