//! Event bus error types.

use thiserror::Error;

/// Errors returned by [`EventBus::publish`](crate::EventBus::publish).
///
/// Only bus availability is reported here; handler outcomes never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// The bus has no running dispatch workers.
    #[error("Event bus is stopped")]
    Stopped,
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
