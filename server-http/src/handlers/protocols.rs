use super::status_for;
use crate::state::AppState;
use crate::upstream::ProtocolSummary;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use marketcache::domain::UnifiedProtocolData;

/// GET /api/protocols
pub async fn get_protocols(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProtocolSummary>>, StatusCode> {
    state
        .service
        .protocols()
        .await
        .map(Json)
        .map_err(|e| status_for("list protocols", &e))
}

/// GET /api/protocols/:slug
pub async fn get_protocol(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<UnifiedProtocolData>, StatusCode> {
    state
        .service
        .protocol(&slug)
        .await
        .map(Json)
        .map_err(|e| status_for("get protocol", &e))
}
