use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use stagefeed_core::{DataKind, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Subscriptions per data kind and what has been fetched so far
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub subscriptions: BTreeMap<String, usize>,
    pub registry_entries: usize,
    /// Resource keys with a stored table, sorted.
    pub available_data: Vec<String>,
    /// Fetch time of the newest stored table.
    pub last_update: Option<DateTime<Utc>>,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let counts = state.bus().subscription_counts();
    let subscriptions = DataKind::ALL
        .iter()
        .map(|kind| {
            (
                kind.name().to_string(),
                counts.get(kind).copied().unwrap_or(0),
            )
        })
        .collect();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        subscriptions,
        registry_entries: state.registry().all().len(),
        available_data: state.latest().keys().await,
        last_update: state.latest().last_update().await,
    })
}

/// Prometheus text exposition
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
