#![deny(clippy::all)]

use async_trait::async_trait;
use serde_json::Value;
use shared::{Result, TtlSecs};

// Ports are the pluggable extension points for the underlying key-value store

/// One entry of a multi-key write.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreEntry {
    pub key: String,
    pub value: Value,
    pub ttl: TtlSecs,
}

impl StoreEntry {
    pub fn new(key: impl Into<String>, value: Value, ttl: TtlSecs) -> Self {
        Self {
            key: key.into(),
            value,
            ttl,
        }
    }
}

/// Port for the durable key-value store backing the cache (Redis, moka, ...).
///
/// Every operation is atomic for a single key. Multi-key operations carry no
/// transactional guarantee: `mset` may apply some entries and not others.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Returns `None` when the key is absent or its TTL has elapsed.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value, ttl: TtlSecs) -> Result<()>;

    /// Positional multi-get: the result has exactly one slot per input key.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>>;

    /// Pipelined multi-set. Reports whether the pipeline call itself succeeded.
    async fn mset(&self, entries: Vec<StoreEntry>) -> Result<bool>;

    /// Returns whether a live entry was removed.
    async fn del(&self, key: &str) -> Result<bool>;
}
