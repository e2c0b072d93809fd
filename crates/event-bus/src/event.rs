//! The routing contract between published values and the registry.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A value that can travel on an [`EventBus`](crate::EventBus).
///
/// Each handler receives its own clone of the published value, so events
/// should be cheap to clone or wrap their payload in an `Arc`.
pub trait Event: Clone + Send + Sync + 'static {
    /// Registry key. Typically a fieldless enum mirroring the event variants.
    type Kind: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Returns the kind used to look up handlers for this event.
    fn kind(&self) -> Self::Kind;
}
