use super::status_for;
use crate::state::AppState;
use crate::upstream::{TokenMarket, TrendingToken};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use marketcache::domain::{PricePoint, UnifiedTokenData};
use serde::Deserialize;

const DEFAULT_HISTORY_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

/// GET /api/tokens?page=N
pub async fn get_tokens(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<TokenMarket>>, StatusCode> {
    state
        .service
        .tokens(query.page.unwrap_or(1))
        .await
        .map(Json)
        .map_err(|e| status_for("list tokens", &e))
}

/// GET /api/tokens/trending
pub async fn get_trending_tokens(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrendingToken>>, StatusCode> {
    state
        .service
        .trending_tokens()
        .await
        .map(Json)
        .map_err(|e| status_for("trending tokens", &e))
}

/// GET /api/tokens/:id
pub async fn get_token(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UnifiedTokenData>, StatusCode> {
    state
        .service
        .token(&id)
        .await
        .map(Json)
        .map_err(|e| status_for("get token", &e))
}

/// GET /api/tokens/:id/price-history?days=N
pub async fn get_price_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PricePoint>>, StatusCode> {
    state
        .service
        .price_history(&id, query.days.unwrap_or(DEFAULT_HISTORY_DAYS))
        .await
        .map(Json)
        .map_err(|e| status_for("price history", &e))
}
