//! API error types with HTTP response mapping.

use article::ArticleError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routes::Message;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body could not be decoded.
    #[error("bad request")]
    BadRequest,
    /// Failure reported by the article workflows.
    #[error(transparent)]
    Article(#[from] ArticleError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::Article(ArticleError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Article(ArticleError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Article(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when a store outage caused the error and a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Article(err) if err.is_transient())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, transient = self.is_transient(), "internal server error");
        }

        (status, axum::Json(Message::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ArticleId;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(ArticleError::Validation("article body is blank".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ArticleError::NotFound(ArticleId::new(1))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ArticleError::Projection("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_outages_are_transient() {
        for err in [
            ArticleError::PrimaryStore("down".into()),
            ArticleError::Projection("down".into()),
            ArticleError::Cache("down".into()),
        ] {
            let err = ApiError::from(err);
            assert!(err.is_transient(), "{err}");
            assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }

        assert!(!ApiError::BadRequest.is_transient());
        assert!(!ApiError::from(ArticleError::NotFound(ArticleId::new(1))).is_transient());
        assert!(!ApiError::from(ArticleError::Validation("blank".into())).is_transient());
    }

    #[test]
    fn test_message_is_error_text() {
        let err = ApiError::from(ArticleError::Validation("article title is blank".into()));
        assert_eq!(err.to_string(), "article title is blank");
    }
}
