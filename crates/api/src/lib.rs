//! HTTP API server with observability for the article choreography.
//!
//! Provides REST endpoints for creating and searching articles, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use article::{
    ArticleService, CacheStore, InMemoryCacheStore, InMemoryPrimaryStore,
    InMemoryProjectionStore, PrimaryStore, ProjectionStore, register_subscribers,
};
use axum::Router;
use axum::routing::get;
use event_bus::{BusConfig, EventBus};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::articles::AppState;
use routes::metrics::MetricsState;

/// Application state backed by the in-memory store adapters.
pub type InMemoryAppState =
    AppState<InMemoryPrimaryStore, InMemoryProjectionStore, InMemoryCacheStore>;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<P, X, C>(
    state: Arc<AppState<P, X, C>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    P: PrimaryStore + 'static,
    X: ProjectionStore + 'static,
    C: CacheStore + 'static,
{
    let bus = state.service.bus().clone();

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(MetricsState {
            handle: metrics_handle,
            bus: bus.clone(),
        });

    let health_router = Router::new()
        .route("/health", get(routes::health::check))
        .with_state(bus);

    Router::new()
        .route(
            "/articles",
            get(routes::articles::search::<P, X, C>).post(routes::articles::create::<P, X, C>),
        )
        .with_state(state)
        .merge(health_router)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: in-memory stores, a started event
/// bus and every article subscriber registered.
///
/// Must be called inside a Tokio runtime.
pub fn create_default_state(bus_config: BusConfig) -> Arc<InMemoryAppState> {
    let service = Arc::new(ArticleService::new(
        InMemoryPrimaryStore::new(),
        InMemoryProjectionStore::new(),
        InMemoryCacheStore::new(),
        EventBus::started(bus_config),
    ));
    register_subscribers(&service);

    Arc::new(AppState { service })
}

/// Registers descriptions for the metrics this service records.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "event_bus_published_total",
        "Events accepted by an event bus dispatch worker"
    );
    metrics::describe_counter!(
        "event_bus_handler_failures_total",
        "Handler invocations that returned an error"
    );
    metrics::describe_counter!("articles_created_total", "Articles durably created");
    metrics::describe_counter!(
        "article_search_misses_total",
        "Searched articles absent from the cache"
    );
    metrics::describe_histogram!(
        "article_create_duration_seconds",
        metrics::Unit::Seconds,
        "Latency of successful article creation"
    );
    metrics::describe_gauge!(
        "event_bus_in_flight",
        "Pending hand-offs plus running handler tasks"
    );
}
