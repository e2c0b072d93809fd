//! In-process publish/subscribe event bus.
//!
//! This crate provides:
//! - [`Event`] trait tying an event value to its routing kind
//! - [`EventHandler`] trait and [`handler_fn`] adapter for subscribers
//! - [`EventBus`] with a single-slot hand-off to dispatch workers and
//!   fire-and-forget fan-out of one task per registered handler
//!
//! Handler failures never reach the publisher. A handler that wants its
//! failure observed publishes another event describing it.

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod state;

mod tracker;

pub use bus::EventBus;
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use event::Event;
pub use handler::{EventHandler, FnHandler, HandlerError, HandlerResult, handler_fn};
pub use state::BusState;
