//! Store capability traits and in-memory implementations.
//!
//! The choreography only ever talks to these traits. Network-backed adapters
//! (a relational primary store, a search engine, a key-value cache) implement
//! the same contracts; the in-memory ones here add failure injection so the
//! compensation paths can be exercised.

pub mod cache;
pub mod primary;
pub mod projection;

pub use cache::{CacheStore, InMemoryCacheStore};
pub use primary::{InMemoryPrimaryStore, PrimaryStore};
pub use projection::{InMemoryProjectionStore, ProjectionStore};
