use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use shared::config::Config;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Protocols
        .route("/api/protocols", get(handlers::get_protocols))
        .route("/api/protocols/{slug}", get(handlers::get_protocol))
        // Global market data
        .route("/api/stablecoins", get(handlers::get_stablecoins))
        .route("/api/exchange-rates", get(handlers::get_exchange_rates))
        // Tokens
        .route("/api/tokens", get(handlers::get_tokens))
        .route("/api/tokens/trending", get(handlers::get_trending_tokens))
        .route("/api/tokens/{id}", get(handlers::get_token))
        .route(
            "/api/tokens/{id}/price-history",
            get(handlers::get_price_history),
        )
        // Admin routes
        .route("/admin/stats", get(handlers::cache_stats))
        .route("/admin/stats/reset", post(handlers::reset_stats))
        .route("/admin/cache/{key}", delete(handlers::invalidate_key))
        // Middleware
        .layer(cors_layer(&config.allowed_origins))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::DELETE]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
