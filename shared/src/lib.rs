// shared/src/lib.rs

use std::time::Duration;

/// Error type shared by every crate in the workspace.
///
/// It is `Clone` because a single producer failure is handed to every caller
/// that joined the same in-flight request.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid ttl: {0}s (must be > 0)")]
    InvalidTtl(u64),
    #[error("store: {0}")]
    Store(String),
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("producer timed out after {0:?}")]
    Timeout(Duration),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Time-to-live of a cache entry in whole seconds. Always non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TtlSecs(u64);

impl TtlSecs {
    pub fn new(secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(Error::InvalidTtl(secs));
        }
        Ok(Self(secs))
    }

    pub fn secs(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

/// Per-resource TTLs used at the call sites.
pub mod ttl {
    use super::TtlSecs;

    pub const EXCHANGE_RATES: TtlSecs = TtlSecs(60 * 60);
    pub const PROTOCOL: TtlSecs = TtlSecs(15 * 60);
    pub const PROTOCOL_LIST: TtlSecs = TtlSecs(15 * 60);
    pub const STABLECOIN: TtlSecs = TtlSecs(15 * 60);
    pub const TOKEN: TtlSecs = TtlSecs(10 * 60);
    pub const TOKEN_MARKETS: TtlSecs = TtlSecs(5 * 60);
    pub const TRENDING: TtlSecs = TtlSecs(5 * 60);
    pub const PRICE_HISTORY: TtlSecs = TtlSecs(5 * 60);
}

pub mod config;
