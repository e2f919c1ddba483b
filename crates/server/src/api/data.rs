//! Latest fetched table per resource key.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Stored table for one resource key
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub key: String,
    pub kind: String,
    pub class_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    pub fetched_at: DateTime<Utc>,
    /// Header first, then data rows.
    pub rows: Vec<Vec<String>>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct DataErrorResponse {
    pub error: String,
}

/// Latest table stored under `key`, e.g. `stage_results_1_4`.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<DataResponse>, impl IntoResponse> {
    match state.latest().get(&key).await {
        Some(table) => Ok(Json(DataResponse {
            key,
            kind: table.kind().name().to_string(),
            class_id: table.class().id().to_string(),
            stage_id: table.stage_id().map(str::to_string),
            fetched_at: table.fetched_at(),
            rows: table.rows().to_vec(),
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(DataErrorResponse {
                error: format!("no data fetched for '{}'", key),
            }),
        )),
    }
}
