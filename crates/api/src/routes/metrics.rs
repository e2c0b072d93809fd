//! Prometheus metrics endpoint.

use article::ArticleEvent;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use event_bus::EventBus;
use metrics_exporter_prometheus::PrometheusHandle;

/// State of the metrics router.
#[derive(Clone)]
pub struct MetricsState {
    pub handle: PrometheusHandle,
    pub bus: EventBus<ArticleEvent>,
}

/// GET /metrics: Prometheus text exposition.
///
/// Bus gauges are sampled at scrape time.
pub async fn get(State(state): State<MetricsState>) -> impl IntoResponse {
    metrics::gauge!("event_bus_in_flight").set(state.bus.in_flight() as f64);
    metrics::gauge!("event_bus_running").set(if state.bus.state().accepts_events() {
        1.0
    } else {
        0.0
    });

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.handle.render(),
    )
}
