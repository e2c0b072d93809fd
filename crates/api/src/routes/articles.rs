//! Article create and search endpoints.

use std::sync::Arc;

use article::{ArticleService, CacheStore, PrimaryStore, ProjectionStore};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use common::{Article, ArticleSearchQuery, NewArticle};
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::Message;

/// Shared application state accessible from all handlers.
pub struct AppState<P, X, C>
where
    P: PrimaryStore,
    X: ProjectionStore,
    C: CacheStore,
{
    pub service: Arc<ArticleService<P, X, C>>,
}

// -- Request types --

/// Body of `POST /articles`. Missing fields decode as empty and fail validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateArticleRequest {
    pub author: String,
    pub title: String,
    pub body: String,
}

impl From<CreateArticleRequest> for NewArticle {
    fn from(req: CreateArticleRequest) -> Self {
        NewArticle::new(req.author, req.title, req.body)
    }
}

/// Query string of `GET /articles`.
///
/// Kept as raw strings so malformed numbers fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub author: Option<String>,
    pub query: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
}

impl SearchParams {
    pub fn into_search_query(self) -> ArticleSearchQuery {
        let offset = parse_or_zero(self.offset.as_deref());
        let limit = parse_or_zero(self.limit.as_deref());

        let mut query = ArticleSearchQuery::all().with_pagination(offset, limit);
        if let Some(author) = self.author.filter(|a| !a.is_empty()) {
            query = query.with_author(author);
        }
        if let Some(keyword) = self.query.filter(|q| !q.is_empty()) {
            query = query.with_keyword(keyword);
        }
        query
    }
}

fn parse_or_zero(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

// -- Handlers --

/// POST /articles: validate and create an article.
#[tracing::instrument(skip(state, payload))]
pub async fn create<P, X, C>(
    State(state): State<Arc<AppState<P, X, C>>>,
    payload: Result<Json<CreateArticleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message<Article>>), ApiError>
where
    P: PrimaryStore + 'static,
    X: ProjectionStore + 'static,
    C: CacheStore + 'static,
{
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(%rejection, "rejected article body");
        ApiError::BadRequest
    })?;

    let article = state.service.create_article(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(Message::with_data("article created", article)),
    ))
}

/// GET /articles: search by author and keyword with offset/limit paging.
#[tracing::instrument(skip(state, params))]
pub async fn search<P, X, C>(
    State(state): State<Arc<AppState<P, X, C>>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Message<Vec<Article>>>, ApiError>
where
    P: PrimaryStore + 'static,
    X: ProjectionStore + 'static,
    C: CacheStore + 'static,
{
    let params = params.map(|Query(params)| params).unwrap_or_default();
    let articles = state
        .service
        .search_articles(&params.into_search_query())
        .await?;

    Ok(Json(Message::with_data("articles retrieved", articles)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(author: &str, query: &str, offset: &str, limit: &str) -> SearchParams {
        SearchParams {
            author: Some(author.to_string()),
            query: Some(query.to_string()),
            offset: Some(offset.to_string()),
            limit: Some(limit.to_string()),
        }
    }

    #[test]
    fn test_search_params_full() {
        let query = params("john", "rust", "10", "5").into_search_query();

        assert_eq!(query.author.as_deref(), Some("john"));
        assert_eq!(query.keyword.as_deref(), Some("rust"));
        assert_eq!(query.pagination.offset, 10);
        assert_eq!(query.pagination.limit, 5);
    }

    #[test]
    fn test_search_params_lenient() {
        let query = params("", "", "ten", "-1").into_search_query();

        assert_eq!(query.author, None);
        assert_eq!(query.keyword, None);
        assert_eq!(query.pagination.offset, 0);
        assert_eq!(query.pagination.effective_limit(), common::DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_search_params_absent() {
        assert_eq!(
            SearchParams::default().into_search_query(),
            ArticleSearchQuery::all().with_pagination(0, 0)
        );
    }

    #[test]
    fn test_create_request_missing_fields_default_empty() {
        let req: CreateArticleRequest = serde_json::from_str(r#"{"author":"a"}"#).unwrap();
        let article = NewArticle::from(req);
        assert_eq!(article.author, "a");
        assert!(article.title.is_empty());
        assert!(article.body.is_empty());
    }
}
