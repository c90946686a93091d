pub mod admin;
pub mod global;
pub mod health;
pub mod protocols;
pub mod tokens;

pub use admin::{cache_stats, invalidate_key, reset_stats};
pub use global::{get_exchange_rates, get_stablecoins};
pub use health::health_check;
pub use protocols::{get_protocol, get_protocols};
pub use tokens::{get_price_history, get_token, get_tokens, get_trending_tokens};

use axum::http::StatusCode;
use shared::Error;
use tracing::{error, warn};

/// Maps a failed request onto its response status.
pub(crate) fn status_for(operation: &str, err: &Error) -> StatusCode {
    match err {
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::InvalidKey(_) | Error::InvalidInput(_) | Error::InvalidTtl(_) => {
            warn!("{}: rejected input: {}", operation, err);
            StatusCode::BAD_REQUEST
        }
        Error::Upstream(_) | Error::Timeout(_) | Error::Store(_) => {
            warn!("{}: degraded: {}", operation, err);
            StatusCode::SERVICE_UNAVAILABLE
        }
        Error::Serialization(_) | Error::Configuration(_) | Error::Internal(_) => {
            error!("{}: {}", operation, err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
