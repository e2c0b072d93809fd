//! Article error types.

use common::ArticleId;
use event_bus::BusError;
use thiserror::Error;

use crate::events::ArticleEventKind;

/// Errors that can occur during article workflows and their handlers.
#[derive(Debug, Error)]
pub enum ArticleError {
    /// Caller input is missing or malformed. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// No article with this identity.
    #[error("Article not found: {0}")]
    NotFound(ArticleId),

    /// Primary store call failed.
    #[error("Primary store error: {0}")]
    PrimaryStore(String),

    /// Search projection call failed.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Cache call failed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A handler received an event kind it does not consume.
    #[error("Subscribed to unprocessable event: {0}")]
    UnexpectedEvent(ArticleEventKind),

    /// Cache payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The event bus refused a publish.
    #[error("Event bus error: {0}")]
    Bus(#[from] BusError),
}

impl ArticleError {
    /// Returns true for collaborator failures that may succeed on a later call.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ArticleError::PrimaryStore(_) | ArticleError::Projection(_) | ArticleError::Cache(_)
        )
    }
}

/// Convenience type alias for article results.
pub type Result<T> = std::result::Result<T, ArticleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_bare() {
        let err = ArticleError::Validation("article author is blank".to_string());
        assert_eq!(err.to_string(), "article author is blank");
    }

    #[test]
    fn test_transient_classification() {
        assert!(ArticleError::PrimaryStore("down".into()).is_transient());
        assert!(ArticleError::Cache("down".into()).is_transient());
        assert!(!ArticleError::NotFound(ArticleId::new(1)).is_transient());
        assert!(!ArticleError::Bus(BusError::Stopped).is_transient());
    }
}
