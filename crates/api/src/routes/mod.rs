//! HTTP route handlers.

pub mod articles;
pub mod health;
pub mod metrics;

use serde::Serialize;

/// Response envelope shared by every article endpoint.
///
/// `data` is omitted when there is nothing to return, as in error responses.
#[derive(Debug, Serialize)]
pub struct Message<T = ()> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }
}

impl<T> Message<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data: Some(data),
        }
    }
}
