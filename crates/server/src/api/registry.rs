//! Racing number registry handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use stagefeed_core::{orchestrator::follow_up_requests, BatchReport, RegistryEntry};
use tracing::{error, info};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Registry snapshot keyed by class id
#[derive(Debug, Serialize)]
pub struct RegistryResponse {
    pub entries: BTreeMap<String, RegistryEntry>,
}

/// Result of a refresh and its follow-up batch
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub refreshed: bool,
    pub entries: BTreeMap<String, RegistryEntry>,
    /// Absent when no class has an active stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<BatchReport>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct RegistryErrorResponse {
    pub error: String,
}

fn snapshot(state: &AppState) -> BTreeMap<String, RegistryEntry> {
    state
        .registry()
        .all()
        .into_iter()
        .map(|(class, entry)| (class.id().to_string(), entry))
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

/// Current registry contents
pub async fn get_registry(State(state): State<Arc<AppState>>) -> Json<RegistryResponse> {
    Json(RegistryResponse {
        entries: snapshot(&state),
    })
}

/// Re-read the control range and fetch follow-up data for every active stage.
pub async fn refresh_registry(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>, impl IntoResponse> {
    let config = state.config().registry.clone();

    let range = match config.cell_range() {
        Ok(range) => range,
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegistryErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    };

    let registry = Arc::clone(state.registry());
    let workbook = Arc::clone(state.workbook());
    let sheet = config.sheet.clone();
    let refreshed = tokio::task::spawn_blocking(move || {
        registry.refresh(workbook.as_ref(), &sheet, &range)
    })
    .await;

    let refreshed = match refreshed {
        Ok(refreshed) => refreshed,
        Err(e) => {
            error!(error = %e, "Registry refresh task failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegistryErrorResponse {
                    error: format!("registry refresh task failed: {}", e),
                }),
            ));
        }
    };

    if !refreshed {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RegistryErrorResponse {
                error: format!(
                    "no registry entries could be read from {}!{}",
                    config.sheet, config.range
                ),
            }),
        ));
    }

    let requests = follow_up_requests(
        &state.registry().active_stages(),
        &config.follow_up_kinds,
    );

    let report = if requests.is_empty() {
        None
    } else {
        info!(requests = requests.len(), "Running follow-up batch");
        match state.orchestrator().run_batch(&requests).await {
            Ok(report) => Some(report),
            Err(e) => {
                // The control range named stages the batch cannot use.
                return Err((
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(RegistryErrorResponse {
                        error: e.to_string(),
                    }),
                ));
            }
        }
    };

    Ok(Json(RefreshResponse {
        refreshed,
        entries: snapshot(&state),
        report,
    }))
}
