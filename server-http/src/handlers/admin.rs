use super::status_for;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use marketcache::{AdminOperations, DedupStats};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub deleted: bool,
}

/// GET /admin/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<DedupStats> {
    Json(state.control.stats())
}

/// POST /admin/stats/reset
pub async fn reset_stats(State(state): State<AppState>) -> StatusCode {
    state.control.reset_stats();
    StatusCode::NO_CONTENT
}

/// DELETE /admin/cache/:key
pub async fn invalidate_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>, StatusCode> {
    info!("DELETE: key={}", key);

    state
        .control
        .invalidate(&key)
        .await
        .map(|deleted| Json(InvalidateResponse { deleted }))
        .map_err(|e| status_for("invalidate", &e))
}
