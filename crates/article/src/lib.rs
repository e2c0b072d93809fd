//! Article choreography.
//!
//! Keeps three independently failing stores eventually consistent:
//! - the primary store, the only durable record
//! - the search projection, written before the primary store
//! - the read-through cache, filled asynchronously after writes and misses
//!
//! [`ArticleService`] runs the synchronous create and search workflows and
//! publishes [`ArticleEvent`]s; the handlers wired by [`register_subscribers`]
//! perform the compensations and cache maintenance those events call for.

pub mod error;
pub mod events;
pub mod service;
pub mod stores;
pub mod subscribers;

pub use error::{ArticleError, Result};
pub use events::{ArticleEvent, ArticleEventKind};
pub use service::ArticleService;
pub use stores::{
    CacheStore, InMemoryCacheStore, InMemoryPrimaryStore, InMemoryProjectionStore, PrimaryStore,
    ProjectionStore,
};
pub use subscribers::register_subscribers;
