//! Cache trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use common::{Article, ArticleId};
use tokio::sync::RwLock;

use crate::error::{ArticleError, Result};

/// Read-through cache of full articles, keyed by identity.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Stores or replaces the cached copy of an article.
    async fn put(&self, article: &Article) -> Result<()>;

    /// Returns the cached article, or `None` on a miss.
    async fn get(&self, id: ArticleId) -> Result<Option<Article>>;
}

/// Key under which an article is cached.
fn cache_key(id: ArticleId) -> String {
    format!("articles/{id}")
}

/// In-memory cache holding JSON-encoded articles, as a key-value cache would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    put_failures: Arc<AtomicUsize>,
    fail_on_get: Arc<AtomicBool>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls to `put` fail.
    pub fn fail_next_puts(&self, count: usize) {
        self.put_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_fail_on_get(&self, fail: bool) {
        self.fail_on_get.store(fail, Ordering::SeqCst);
    }

    /// Returns true if the article is cached.
    pub async fn contains(&self, id: ArticleId) -> bool {
        self.entries.read().await.contains_key(&cache_key(id))
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drops the cached copy of an article, as an expiry would.
    pub async fn evict(&self, id: ArticleId) {
        self.entries.write().await.remove(&cache_key(id));
    }

    /// Consumes one injected put failure, if any are left.
    fn take_put_failure(&self) -> bool {
        self.put_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn put(&self, article: &Article) -> Result<()> {
        if !article.id.is_valid() {
            return Err(ArticleError::Cache("article id is invalid".to_string()));
        }
        if self.take_put_failure() {
            return Err(ArticleError::Cache("connection reset".to_string()));
        }

        let encoded = serde_json::to_string(article)?;
        self.entries
            .write()
            .await
            .insert(cache_key(article.id), encoded);
        Ok(())
    }

    async fn get(&self, id: ArticleId) -> Result<Option<Article>> {
        if !id.is_valid() {
            return Err(ArticleError::Cache("id parameter is invalid".to_string()));
        }
        if self.fail_on_get.load(Ordering::SeqCst) {
            return Err(ArticleError::Cache("connection reset".to_string()));
        }

        let entries = self.entries.read().await;
        let Some(encoded) = entries.get(&cache_key(id)) else {
            return Ok(None);
        };

        let article: Article = serde_json::from_str(encoded)?;
        Ok(article.id.is_valid().then_some(article))
    }
}
