//! Primary store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use common::{Article, ArticleId};
use tokio::sync::RwLock;

use crate::error::{ArticleError, Result};

/// The durable record of articles and the source of their identities.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Atomically increments the shared sequence and returns the new value.
    async fn generate_identity(&self) -> Result<ArticleId>;

    /// Persists a new article.
    async fn write(&self, article: &Article) -> Result<()>;

    /// Loads an article, failing with [`ArticleError::NotFound`] if absent.
    async fn read(&self, id: ArticleId) -> Result<Article>;
}

#[derive(Debug, Default)]
struct Faults {
    generate: AtomicBool,
    write: AtomicBool,
    read: AtomicBool,
}

/// In-memory primary store for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPrimaryStore {
    articles: Arc<RwLock<HashMap<ArticleId, Article>>>,
    sequence: Arc<AtomicU64>,
    faults: Arc<Faults>,
}

impl InMemoryPrimaryStore {
    /// Creates an empty store whose first identity is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures identity generation to fail.
    pub fn set_fail_on_generate(&self, fail: bool) {
        self.faults.generate.store(fail, Ordering::SeqCst);
    }

    /// Configures writes to fail.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.faults.write.store(fail, Ordering::SeqCst);
    }

    /// Configures reads to fail with a transient error.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.faults.read.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored articles.
    pub async fn article_count(&self) -> usize {
        self.articles.read().await.len()
    }

    /// Returns true if an article with this identity is stored.
    pub async fn contains(&self, id: ArticleId) -> bool {
        self.articles.read().await.contains_key(&id)
    }

    /// Returns the last identity handed out, if any.
    pub fn last_identity(&self) -> Option<ArticleId> {
        match self.sequence.load(Ordering::SeqCst) {
            0 => None,
            n => Some(ArticleId::new(n)),
        }
    }
}

#[async_trait]
impl PrimaryStore for InMemoryPrimaryStore {
    async fn generate_identity(&self) -> Result<ArticleId> {
        if self.faults.generate.load(Ordering::SeqCst) {
            return Err(ArticleError::PrimaryStore(
                "sequence unavailable".to_string(),
            ));
        }

        let next = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ArticleId::new(next))
    }

    async fn write(&self, article: &Article) -> Result<()> {
        if !article.id.is_valid() {
            return Err(ArticleError::PrimaryStore(
                "article id is invalid".to_string(),
            ));
        }
        if self.faults.write.load(Ordering::SeqCst) {
            return Err(ArticleError::PrimaryStore("write rejected".to_string()));
        }

        let mut articles = self.articles.write().await;
        if articles.contains_key(&article.id) {
            return Err(ArticleError::PrimaryStore(format!(
                "duplicate article id {}",
                article.id
            )));
        }
        articles.insert(article.id, article.clone());
        Ok(())
    }

    async fn read(&self, id: ArticleId) -> Result<Article> {
        if !id.is_valid() {
            return Err(ArticleError::PrimaryStore(
                "id parameter is invalid".to_string(),
            ));
        }
        if self.faults.read.load(Ordering::SeqCst) {
            return Err(ArticleError::PrimaryStore("read timed out".to_string()));
        }

        self.articles
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(ArticleError::NotFound(id))
    }
}
