//! Batch trigger handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stagefeed_core::{BatchReport, FetchRequest};
use tracing::info;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for triggering a batch
#[derive(Debug, Deserialize)]
pub struct TriggerBody {
    pub requests: Vec<FetchRequest>,
}

/// Error response for a rejected batch
#[derive(Debug, Serialize)]
pub struct TriggerErrorResponse {
    pub error: String,
    /// One entry per violation, prefixed with the request index.
    pub details: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Validate and run a batch, returning the report once every task finished.
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TriggerBody>,
) -> Result<Json<BatchReport>, impl IntoResponse> {
    info!(requests = body.requests.len(), "Batch triggered");

    match state.orchestrator().run_batch(&body.requests).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(TriggerErrorResponse {
                error: "invalid batch".to_string(),
                details: e.errors,
            }),
        )),
    }
}
