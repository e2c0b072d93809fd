use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page size used when a query asks for none, or for more than [`MAX_PAGE_LIMIT`].
pub const DEFAULT_PAGE_LIMIT: usize = 20;

/// Largest page size a search may request.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Identity of a stored article.
///
/// Identities come from the primary store's sequence and are never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(u64);

impl ArticleId {
    /// Wraps a raw sequence value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true unless this is the zero identity.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ArticleId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ArticleId> for u64 {
    fn from(id: ArticleId) -> Self {
        id.0
    }
}

/// Caller input for a new article, before an identity is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewArticle {
    pub author: String,
    pub title: String,
    pub body: String,
}

impl NewArticle {
    pub fn new(
        author: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            body: body.into(),
        }
    }

    /// Binds the draft to an identity, stamping both timestamps with `now`.
    pub fn into_article(self, id: ArticleId, now: DateTime<Utc>) -> Article {
        Article {
            id,
            author: self.author,
            title: self.title,
            body: self.body,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored article. Only values of this type ever reach a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub author: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Offset/limit window over search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Pagination {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Returns the limit actually applied: zero or oversized limits fall back
    /// to [`DEFAULT_PAGE_LIMIT`].
    pub fn effective_limit(&self) -> usize {
        if self.limit == 0 || self.limit > MAX_PAGE_LIMIT {
            DEFAULT_PAGE_LIMIT
        } else {
            self.limit
        }
    }
}

/// Search criteria understood by the projection store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticleSearchQuery {
    /// Free text matched against title and body.
    pub keyword: Option<String>,
    /// Exact author filter.
    pub author: Option<String>,
    pub pagination: Pagination,
}

impl ArticleSearchQuery {
    /// A query matching every article, first page.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_pagination(mut self, offset: usize, limit: usize) -> Self {
        self.pagination = Pagination::new(offset, limit);
        self
    }
}
