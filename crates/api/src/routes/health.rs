//! Health check endpoint.

use article::ArticleEvent;
use axum::Json;
use axum::extract::State;
use event_bus::EventBus;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub event_bus: &'static str,
}

/// GET /health: process liveness and whether the event bus accepts events.
pub async fn check(State(bus): State<EventBus<ArticleEvent>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        event_bus: bus.state().as_str(),
    })
}
