//! Create and search workflows plus the event handlers that keep the stores
//! converging.
//!
//! ```text
//! create:  validate -> identity -> projection.write -> primary.write
//!                                                      |            |
//!                                        PrimaryWriteFailed   PrimaryWriteSucceeded
//!                                                      |            |
//!                                           remove_projection   warm_cache --fail--> ProjectionWriteFailed
//!                                                                   ^                        |
//!                                                                   +------- rehydrate <-----+
//!                                                                                ^
//! search:  projection.query -> cache.get per id --miss--> ProjectionMiss --------+
//! ```

use std::time::Instant;

use chrono::Utc;
use common::{Article, ArticleSearchQuery, NewArticle};
use event_bus::{Event, EventBus};

use crate::error::{ArticleError, Result};
use crate::events::ArticleEvent;
use crate::stores::{CacheStore, PrimaryStore, ProjectionStore};

/// Runs the article workflows against three independently failing stores.
///
/// Side effects beyond the synchronous steps are announced on the bus; the
/// handler methods below are their subscribers (see
/// [`register_subscribers`](crate::register_subscribers)).
pub struct ArticleService<P, X, C>
where
    P: PrimaryStore,
    X: ProjectionStore,
    C: CacheStore,
{
    primary: P,
    projection: X,
    cache: C,
    bus: EventBus<ArticleEvent>,
}

impl<P, X, C> ArticleService<P, X, C>
where
    P: PrimaryStore,
    X: ProjectionStore,
    C: CacheStore,
{
    pub fn new(primary: P, projection: X, cache: C, bus: EventBus<ArticleEvent>) -> Self {
        Self {
            primary,
            projection,
            cache,
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus<ArticleEvent> {
        &self.bus
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn projection(&self) -> &X {
        &self.projection
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Creates an article.
    ///
    /// The projection is written before the primary store. A failed primary
    /// write is compensated asynchronously by removing the projection entry;
    /// a successful one warms the cache asynchronously. Neither reaction is
    /// awaited here.
    #[tracing::instrument(skip(self, new_article), fields(author = %new_article.author))]
    pub async fn create_article(&self, new_article: NewArticle) -> Result<Article> {
        let started = Instant::now();
        validate(&new_article)?;

        let id = self.primary.generate_identity().await?;
        let article = new_article.into_article(id, Utc::now());

        self.projection.write(&article).await?;

        if let Err(err) = self.primary.write(&article).await {
            metrics::counter!("article_primary_write_failures_total").increment(1);
            tracing::warn!(article_id = %id, error = %err, "Primary write failed, compensating");
            self.announce(ArticleEvent::PrimaryWriteFailed(article)).await;
            return Err(err);
        }

        self.announce(ArticleEvent::PrimaryWriteSucceeded(article.clone()))
            .await;

        metrics::counter!("articles_created_total").increment(1);
        metrics::histogram!("article_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(article_id = %id, "Article created");

        Ok(article)
    }

    /// Searches articles, serving bodies from the cache only.
    ///
    /// Ids missing from the cache are left out of the result and announced as
    /// [`ArticleEvent::ProjectionMiss`] so they are cached for later searches.
    /// Ids whose cache lookup errors are left out silently.
    #[tracing::instrument(skip(self))]
    pub async fn search_articles(&self, query: &ArticleSearchQuery) -> Result<Vec<Article>> {
        let ids = self.projection.query(query).await?;

        let mut articles = Vec::with_capacity(ids.len());
        for id in ids {
            match self.cache.get(id).await {
                Ok(Some(article)) => articles.push(article),
                Ok(None) => {
                    metrics::counter!("article_search_misses_total").increment(1);
                    tracing::debug!(article_id = %id, "Cache miss");
                    self.announce(ArticleEvent::ProjectionMiss(id)).await;
                }
                Err(err) => {
                    tracing::warn!(article_id = %id, error = %err, "Cache lookup failed, skipping");
                }
            }
        }

        Ok(articles)
    }

    /// Removes an article from the projection after its primary write failed.
    #[tracing::instrument(
        skip(self, event),
        fields(kind = %event.kind(), article_id = %event.article_id())
    )]
    pub async fn remove_projection(&self, event: ArticleEvent) -> Result<()> {
        let article = match event {
            ArticleEvent::PrimaryWriteFailed(article) => article,
            other => return Err(ArticleError::UnexpectedEvent(other.kind())),
        };

        self.projection.remove(article.id).await?;
        tracing::debug!(article_id = %article.id, "Projection entry removed");
        Ok(())
    }

    /// Caches a durable article. On failure, asks for a rehydration.
    #[tracing::instrument(
        skip(self, event),
        fields(kind = %event.kind(), article_id = %event.article_id())
    )]
    pub async fn warm_cache(&self, event: ArticleEvent) -> Result<()> {
        let article = match event {
            ArticleEvent::PrimaryWriteSucceeded(article) => article,
            other => return Err(ArticleError::UnexpectedEvent(other.kind())),
        };

        if let Err(err) = self.cache.put(&article).await {
            metrics::counter!("article_cache_warm_failures_total").increment(1);
            tracing::warn!(article_id = %article.id, error = %err, "Cache write failed");
            let id = article.id;
            if let Err(bus_err) = self
                .bus
                .publish(ArticleEvent::ProjectionWriteFailed(article))
                .await
            {
                tracing::warn!(article_id = %id, error = %bus_err, "Rehydration not requested");
            }
            return Err(err);
        }

        tracing::debug!(article_id = %article.id, "Cache warmed");
        Ok(())
    }

    /// Reloads an article from the primary store and re-announces it as
    /// durable, which sends it through [`warm_cache`](Self::warm_cache) again.
    #[tracing::instrument(
        skip(self, event),
        fields(kind = %event.kind(), article_id = %event.article_id())
    )]
    pub async fn rehydrate(&self, event: ArticleEvent) -> Result<()> {
        let id = match &event {
            ArticleEvent::ProjectionMiss(id) => *id,
            ArticleEvent::ProjectionWriteFailed(article) => article.id,
            other => return Err(ArticleError::UnexpectedEvent(other.kind())),
        };

        let article = self.primary.read(id).await?;
        metrics::counter!("article_rehydrations_total").increment(1);
        self.bus
            .publish(ArticleEvent::PrimaryWriteSucceeded(article))
            .await?;
        Ok(())
    }

    /// Publishes from inside a workflow. The workflow's outcome does not
    /// depend on the bus, so a refused publish is only logged.
    async fn announce(&self, event: ArticleEvent) {
        let kind = event.kind();
        if let Err(err) = self.bus.publish(event).await {
            tracing::warn!(%kind, error = %err, "Event not published");
        }
    }
}

fn validate(article: &NewArticle) -> Result<()> {
    if article.author.is_empty() {
        return Err(ArticleError::Validation("article author is blank".to_string()));
    }
    if article.title.is_empty() {
        return Err(ArticleError::Validation("article title is blank".to_string()));
    }
    if article.body.is_empty() {
        return Err(ArticleError::Validation("article body is blank".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use common::ArticleId;
    use event_bus::{BusConfig, HandlerResult, handler_fn};

    use super::*;
    use crate::events::ArticleEventKind;
    use crate::stores::{InMemoryCacheStore, InMemoryPrimaryStore, InMemoryProjectionStore};

    type TestService =
        ArticleService<InMemoryPrimaryStore, InMemoryProjectionStore, InMemoryCacheStore>;

    /// Service on a running bus that records every event and has no real
    /// subscribers, so only the workflow's own effects are observed.
    fn setup() -> (TestService, Arc<Mutex<Vec<ArticleEvent>>>) {
        let bus: EventBus<ArticleEvent> = EventBus::started(BusConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        for kind in ArticleEventKind::ALL {
            let seen = Arc::clone(&seen);
            bus.register(
                kind,
                handler_fn(move |event: ArticleEvent| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().unwrap().push(event);
                        HandlerResult::Ok(())
                    }
                }),
            );
        }

        let service = ArticleService::new(
            InMemoryPrimaryStore::new(),
            InMemoryProjectionStore::new(),
            InMemoryCacheStore::new(),
            bus,
        );
        (service, seen)
    }

    fn count(seen: &Mutex<Vec<ArticleEvent>>, kind: ArticleEventKind) -> usize {
        seen.lock().unwrap().iter().filter(|e| e.kind() == kind).count()
    }

    fn valid() -> NewArticle {
        NewArticle::new("John Doe", "A Valid Title", "A very interesting content")
    }

    async fn seed_cache(service: &TestService, id: u64) -> Article {
        let article = valid().into_article(ArticleId::new(id), Utc::now());
        service.cache().put(&article).await.unwrap();
        article
    }

    #[tokio::test]
    async fn test_create_success() {
        let (service, seen) = setup();

        let article = service.create_article(valid()).await.unwrap();
        service.bus().drain().await;

        assert_eq!(article.id, ArticleId::new(1));
        assert_eq!(article.created_at, article.updated_at);
        assert!(service.primary().contains(article.id).await);
        assert!(service.projection().contains(article.id).await);
        assert_eq!(count(&seen, ArticleEventKind::PrimaryWriteSucceeded), 1);
        assert_eq!(count(&seen, ArticleEventKind::PrimaryWriteFailed), 0);
    }

    #[tokio::test]
    async fn test_create_validation_order() {
        let (service, seen) = setup();
        let cases = [
            (NewArticle::new("", "", ""), "article author is blank"),
            (NewArticle::new("a", "", ""), "article title is blank"),
            (NewArticle::new("a", "t", ""), "article body is blank"),
        ];

        for (input, message) in cases {
            let err = service.create_article(input).await.unwrap_err();
            assert!(matches!(&err, ArticleError::Validation(_)));
            assert_eq!(err.to_string(), message);
        }

        service.bus().drain().await;
        assert_eq!(service.primary().last_identity(), None);
        assert_eq!(service.projection().document_count().await, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_identity_failure_writes_nothing() {
        let (service, seen) = setup();
        service.primary().set_fail_on_generate(true);

        let result = service.create_article(valid()).await;
        service.bus().drain().await;

        assert!(matches!(result, Err(ArticleError::PrimaryStore(_))));
        assert_eq!(service.projection().document_count().await, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_projection_failure_aborts() {
        let (service, seen) = setup();
        service.projection().set_fail_on_write(true);

        let result = service.create_article(valid()).await;
        service.bus().drain().await;

        assert!(matches!(result, Err(ArticleError::Projection(_))));
        assert_eq!(service.primary().article_count().await, 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_primary_failure_announces_compensation() {
        let (service, seen) = setup();
        service.primary().set_fail_on_write(true);

        let result = service.create_article(valid()).await;
        service.bus().drain().await;

        assert!(matches!(result, Err(ArticleError::PrimaryStore(_))));
        // Nothing subscribed to remove it, so the projection still holds it.
        assert!(service.projection().contains(ArticleId::new(1)).await);

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ArticleEvent::PrimaryWriteFailed(article) => {
                assert_eq!(article.id, ArticleId::new(1));
                assert_eq!(article.author, "John Doe");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_on_stopped_bus_still_succeeds() {
        let (service, seen) = setup();
        service.bus().stop().await;

        let article = service.create_article(valid()).await.unwrap();

        assert!(service.primary().contains(article.id).await);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_partial_hits_and_misses() {
        let (service, seen) = setup();
        for id in 1..=3 {
            let article = valid().into_article(ArticleId::new(id), Utc::now());
            service.projection().write(&article).await.unwrap();
        }
        seed_cache(&service, 1).await;
        seed_cache(&service, 3).await;

        let query = ArticleSearchQuery::all();
        let ids: Vec<ArticleId> = service.projection().query(&query).await.unwrap();
        let found = service.search_articles(&query).await.unwrap();
        service.bus().drain().await;

        let expected: Vec<ArticleId> = ids
            .into_iter()
            .filter(|id| *id != ArticleId::new(2))
            .collect();
        let found_ids: Vec<ArticleId> = found.iter().map(|a| a.id).collect();
        assert_eq!(found_ids, expected);

        let events = seen.lock().unwrap();
        assert_eq!(*events, vec![ArticleEvent::ProjectionMiss(ArticleId::new(2))]);
    }

    #[tokio::test]
    async fn test_search_cache_error_skips_without_event() {
        let (service, seen) = setup();
        let article = valid().into_article(ArticleId::new(1), Utc::now());
        service.projection().write(&article).await.unwrap();
        service.cache().set_fail_on_get(true);

        let found = service.search_articles(&ArticleSearchQuery::all()).await.unwrap();
        service.bus().drain().await;

        assert!(found.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_projection_failure_is_error() {
        let (service, _) = setup();
        service.projection().set_fail_on_query(true);

        let result = service.search_articles(&ArticleSearchQuery::all()).await;
        assert!(matches!(result, Err(ArticleError::Projection(_))));
    }

    #[tokio::test]
    async fn test_remove_projection_handler() {
        let (service, _) = setup();
        let article = valid().into_article(ArticleId::new(4), Utc::now());
        service.projection().write(&article).await.unwrap();

        service
            .remove_projection(ArticleEvent::PrimaryWriteFailed(article))
            .await
            .unwrap();

        assert!(!service.projection().contains(ArticleId::new(4)).await);
    }

    #[tokio::test]
    async fn test_warm_cache_failure_requests_rehydration() {
        let (service, seen) = setup();
        service.cache().fail_next_puts(1);
        let article = valid().into_article(ArticleId::new(5), Utc::now());

        let result = service
            .warm_cache(ArticleEvent::PrimaryWriteSucceeded(article.clone()))
            .await;
        service.bus().drain().await;

        assert!(matches!(result, Err(ArticleError::Cache(_))));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![ArticleEvent::ProjectionWriteFailed(article)]
        );
    }

    #[tokio::test]
    async fn test_warm_cache_on_stopped_bus_keeps_cache_error() {
        let (service, seen) = setup();
        let article = valid().into_article(ArticleId::new(5), Utc::now());
        service.cache().fail_next_puts(1);
        service.bus().stop().await;

        let result = service
            .warm_cache(ArticleEvent::PrimaryWriteSucceeded(article))
            .await;

        assert!(matches!(result, Err(ArticleError::Cache(_))), "{result:?}");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rehydrate_reannounces_durable_article() {
        let (service, seen) = setup();
        let article = valid().into_article(ArticleId::new(6), Utc::now());
        service.primary().write(&article).await.unwrap();

        service
            .rehydrate(ArticleEvent::ProjectionMiss(ArticleId::new(6)))
            .await
            .unwrap();
        service.bus().drain().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ArticleEvent::PrimaryWriteSucceeded(article)]
        );
    }

    #[tokio::test]
    async fn test_rehydrate_missing_article_is_not_found() {
        let (service, seen) = setup();

        let result = service
            .rehydrate(ArticleEvent::ProjectionMiss(ArticleId::new(9)))
            .await;
        service.bus().drain().await;

        assert!(matches!(result, Err(ArticleError::NotFound(_))));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handlers_reject_unexpected_events() {
        let (service, _) = setup();
        let miss = ArticleEvent::ProjectionMiss(ArticleId::new(1));
        let article = valid().into_article(ArticleId::new(1), Utc::now());

        assert!(matches!(
            service.remove_projection(miss.clone()).await,
            Err(ArticleError::UnexpectedEvent(ArticleEventKind::ProjectionMiss))
        ));
        assert!(matches!(
            service.warm_cache(miss).await,
            Err(ArticleError::UnexpectedEvent(ArticleEventKind::ProjectionMiss))
        ));
        assert!(matches!(
            service
                .rehydrate(ArticleEvent::PrimaryWriteFailed(article))
                .await,
            Err(ArticleError::UnexpectedEvent(ArticleEventKind::PrimaryWriteFailed))
        ));
    }
}
