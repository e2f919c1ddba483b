use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{data, handlers, middleware::metrics_middleware, registry, trigger};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and status
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        .route("/metrics", get(handlers::get_metrics))
        // Batches and their latest tables
        .route("/trigger", post(trigger::trigger))
        .route("/data/{key}", get(data::get_data))
        // Racing number registry
        .route("/registry", get(registry::get_registry))
        .route("/registry/refresh", post(registry::refresh_registry))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
