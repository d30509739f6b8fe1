//! HTTP API for the marketplace order core.
//!
//! Maps the engine's operations 1:1 onto REST endpoints, with structured
//! logging (tracing) and Prometheus metrics. Validation failures travel
//! as an HTTP 200 envelope carrying the error code and message.

pub mod config;
pub mod envelope;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use engine::OrderEngine;
use market_store::MarketStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list_mine::<S>))
        .route("/orders/{id}", delete(routes::orders::cancel::<S>))
        .route("/orders/{id}/confirm", post(routes::admin::confirm::<S>))
        .route("/orders/{id}/status", put(routes::admin::update_status::<S>))
        .route("/shop/orders", get(routes::shop::list::<S>))
        .route(
            "/shop/orders/{id}/status",
            put(routes::shop::update_status::<S>),
        )
        .route("/admin/orders", get(routes::admin::list::<S>))
        .route("/products/popular", get(routes::products::popular::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state around a store.
pub fn create_state<S: MarketStore>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        engine: OrderEngine::new(store),
    })
}
