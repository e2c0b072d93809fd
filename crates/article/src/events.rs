//! Events exchanged between the article workflows and their reactions.

use common::{Article, ArticleId};
use event_bus::Event;
use serde::{Deserialize, Serialize};

/// The closed catalog of article events.
///
/// Each variant carries exactly what its subscriber needs to act without a
/// further lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ArticleEvent {
    /// The article is durable in the primary store. Triggers the cache warm.
    PrimaryWriteSucceeded(Article),

    /// The primary store write failed after the article was indexed.
    /// Triggers removal from the projection.
    PrimaryWriteFailed(Article),

    /// A searched id was not in the cache. Triggers rehydration.
    ProjectionMiss(ArticleId),

    /// Warming the cache failed. Triggers rehydration.
    ProjectionWriteFailed(Article),
}

/// Registry key for [`ArticleEvent`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArticleEventKind {
    PrimaryWriteSucceeded,
    PrimaryWriteFailed,
    ProjectionMiss,
    ProjectionWriteFailed,
}

impl ArticleEventKind {
    /// Every kind in the catalog.
    pub const ALL: [ArticleEventKind; 4] = [
        ArticleEventKind::PrimaryWriteSucceeded,
        ArticleEventKind::PrimaryWriteFailed,
        ArticleEventKind::ProjectionMiss,
        ArticleEventKind::ProjectionWriteFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleEventKind::PrimaryWriteSucceeded => "PrimaryWriteSucceeded",
            ArticleEventKind::PrimaryWriteFailed => "PrimaryWriteFailed",
            ArticleEventKind::ProjectionMiss => "ProjectionMiss",
            ArticleEventKind::ProjectionWriteFailed => "ProjectionWriteFailed",
        }
    }
}

impl std::fmt::Display for ArticleEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Event for ArticleEvent {
    type Kind = ArticleEventKind;

    fn kind(&self) -> ArticleEventKind {
        match self {
            ArticleEvent::PrimaryWriteSucceeded(_) => ArticleEventKind::PrimaryWriteSucceeded,
            ArticleEvent::PrimaryWriteFailed(_) => ArticleEventKind::PrimaryWriteFailed,
            ArticleEvent::ProjectionMiss(_) => ArticleEventKind::ProjectionMiss,
            ArticleEvent::ProjectionWriteFailed(_) => ArticleEventKind::ProjectionWriteFailed,
        }
    }
}

impl ArticleEvent {
    /// Identity of the article the event is about.
    pub fn article_id(&self) -> ArticleId {
        match self {
            ArticleEvent::PrimaryWriteSucceeded(article)
            | ArticleEvent::PrimaryWriteFailed(article)
            | ArticleEvent::ProjectionWriteFailed(article) => article.id,
            ArticleEvent::ProjectionMiss(id) => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::NewArticle;

    fn article(id: u64) -> Article {
        NewArticle::new("John Doe", "A Valid Title", "A very interesting content")
            .into_article(ArticleId::new(id), Utc::now())
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            ArticleEvent::PrimaryWriteSucceeded(article(1)).kind(),
            ArticleEventKind::PrimaryWriteSucceeded
        );
        assert_eq!(
            ArticleEvent::PrimaryWriteFailed(article(1)).kind(),
            ArticleEventKind::PrimaryWriteFailed
        );
        assert_eq!(
            ArticleEvent::ProjectionMiss(ArticleId::new(2)).kind(),
            ArticleEventKind::ProjectionMiss
        );
        assert_eq!(
            ArticleEvent::ProjectionWriteFailed(article(1)).kind(),
            ArticleEventKind::ProjectionWriteFailed
        );
    }

    #[test]
    fn test_article_id_for_every_variant() {
        assert_eq!(
            ArticleEvent::ProjectionWriteFailed(article(9)).article_id(),
            ArticleId::new(9)
        );
        assert_eq!(
            ArticleEvent::ProjectionMiss(ArticleId::new(4)).article_id(),
            ArticleId::new(4)
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ArticleEvent::ProjectionMiss(ArticleId::new(2))).unwrap();
        assert_eq!(json["type"], "ProjectionMiss");
        assert_eq!(json["data"], 2);
    }

    #[test]
    fn test_kind_display() {
        let names: Vec<String> = ArticleEventKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            [
                "PrimaryWriteSucceeded",
                "PrimaryWriteFailed",
                "ProjectionMiss",
                "ProjectionWriteFailed"
            ]
        );
    }
}
