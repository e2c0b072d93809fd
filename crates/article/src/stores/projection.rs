//! Search projection trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{Article, ArticleId, ArticleSearchQuery};
use tokio::sync::RwLock;

use crate::error::{ArticleError, Result};

/// Read-optimised search index over articles.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// Indexes an article, replacing any previous document with its id.
    async fn write(&self, article: &Article) -> Result<()>;

    /// Removes an article from the index.
    async fn remove(&self, id: ArticleId) -> Result<()>;

    /// Returns matching ids, newest first, windowed by the query's pagination.
    async fn query(&self, query: &ArticleSearchQuery) -> Result<Vec<ArticleId>>;
}

#[derive(Debug, Default)]
struct Faults {
    write: AtomicBool,
    remove: AtomicBool,
    query: AtomicBool,
}

/// In-memory search index for testing and local runs.
///
/// Matching mirrors a simple full-text setup: `author` is an exact filter,
/// `keyword` matches when any of its terms occurs, case-insensitively, in the
/// title or body.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectionStore {
    documents: Arc<RwLock<HashMap<ArticleId, Article>>>,
    faults: Arc<Faults>,
}

impl InMemoryProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_write(&self, fail: bool) {
        self.faults.write.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_remove(&self, fail: bool) {
        self.faults.remove.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_query(&self, fail: bool) {
        self.faults.query.store(fail, Ordering::SeqCst);
    }

    /// Returns true if the article is currently indexed.
    pub async fn contains(&self, id: ArticleId) -> bool {
        self.documents.read().await.contains_key(&id)
    }

    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

fn matches(article: &Article, author: Option<&str>, terms: &[String]) -> bool {
    if let Some(author) = author
        && article.author != author
    {
        return false;
    }
    if terms.is_empty() {
        return true;
    }

    let title = article.title.to_lowercase();
    let body = article.body.to_lowercase();
    terms
        .iter()
        .any(|term| title.contains(term.as_str()) || body.contains(term.as_str()))
}

#[async_trait]
impl ProjectionStore for InMemoryProjectionStore {
    async fn write(&self, article: &Article) -> Result<()> {
        if !article.id.is_valid() {
            return Err(ArticleError::Projection(
                "article id is invalid".to_string(),
            ));
        }
        if self.faults.write.load(Ordering::SeqCst) {
            return Err(ArticleError::Projection("index rejected".to_string()));
        }

        self.documents
            .write()
            .await
            .insert(article.id, article.clone());
        Ok(())
    }

    async fn remove(&self, id: ArticleId) -> Result<()> {
        if !id.is_valid() {
            return Err(ArticleError::Projection(
                "article id is invalid".to_string(),
            ));
        }
        if self.faults.remove.load(Ordering::SeqCst) {
            return Err(ArticleError::Projection("delete rejected".to_string()));
        }

        self.documents.write().await.remove(&id);
        Ok(())
    }

    async fn query(&self, query: &ArticleSearchQuery) -> Result<Vec<ArticleId>> {
        if self.faults.query.load(Ordering::SeqCst) {
            return Err(ArticleError::Projection("search unavailable".to_string()));
        }

        let author = query.author.as_deref().filter(|a| !a.is_empty());
        let terms: Vec<String> = query
            .keyword
            .as_deref()
            .map(|k| k.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let documents = self.documents.read().await;
        let mut hits: Vec<&Article> = documents
            .values()
            .filter(|article| matches(article, author, &terms))
            .collect();

        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(hits
            .into_iter()
            .skip(query.pagination.offset)
            .take(query.pagination.effective_limit())
            .map(|article| article.id)
            .collect())
    }
}
