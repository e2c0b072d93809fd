//! Shared types for the article choreography system.

pub mod types;

pub use types::{
    Article, ArticleId, ArticleSearchQuery, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, NewArticle,
    Pagination,
};
