use super::status_for;
use crate::state::AppState;
use crate::upstream::{ExchangeRates, Stablecoin};
use axum::{extract::State, http::StatusCode, Json};

/// GET /api/stablecoins
pub async fn get_stablecoins(
    State(state): State<AppState>,
) -> Result<Json<Vec<Stablecoin>>, StatusCode> {
    state
        .service
        .stablecoins()
        .await
        .map(Json)
        .map_err(|e| status_for("list stablecoins", &e))
}

/// GET /api/exchange-rates
pub async fn get_exchange_rates(
    State(state): State<AppState>,
) -> Result<Json<ExchangeRates>, StatusCode> {
    state
        .service
        .exchange_rates()
        .await
        .map(Json)
        .map_err(|e| status_for("exchange rates", &e))
}
