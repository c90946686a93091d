use super::dedupe::{DedupStats, RequestDeduplicator};
use crate::keys::CacheKey;
use crate::ports::KvStore;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{Error, Result, TtlSecs};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Read-through cache in front of the key-value store.
///
/// Every expensive upstream read goes through [`ReadThroughCache::with_cache`]:
/// a hit is served from the store, concurrent misses for a key collapse into
/// one producer call, and producer failures degrade to a caller-supplied
/// fallback.
#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn KvStore>,
    dedup: Arc<RequestDeduplicator<Value>>,
    producer_timeout: Duration,
}

impl ReadThroughCache {
    pub fn new(
        store: Arc<dyn KvStore>,
        dedup: Arc<RequestDeduplicator<Value>>,
        producer_timeout: Duration,
    ) -> Self {
        Self {
            store,
            dedup,
            producer_timeout,
        }
    }

    pub fn store(&self) -> Arc<dyn KvStore> {
        Arc::clone(&self.store)
    }

    pub fn stats(&self) -> DedupStats {
        self.dedup.stats()
    }

    pub fn reset_stats(&self) {
        self.dedup.reset_stats()
    }

    /// Returns the cached value for `key`, or produces, stores and returns it.
    ///
    /// A hit never invokes `producer`. On a miss the producer runs at most once
    /// per key across concurrent callers and is bounded by the producer
    /// timeout. A failed store write is logged and does not fail the read. If
    /// production fails, `fallback` is returned when supplied, otherwise the
    /// error propagates.
    pub async fn with_cache<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: TtlSecs,
        producer: F,
        fallback: Option<T>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(cached) = self.lookup(key).await {
            return Ok(cached);
        }

        let store = Arc::clone(&self.store);
        let limit = self.producer_timeout;
        let write_key = key.clone();

        let produced = self
            .dedup
            .dedupe(key.as_str(), move || async move {
                let value = bounded(limit, producer()).await?;
                let json = serde_json::to_value(&value)?;
                match store.set(write_key.as_str(), json.clone(), ttl).await {
                    Ok(()) => debug!("Cached '{}' for {}s", write_key, ttl.secs()),
                    Err(e) => warn!("Failed to cache '{}': {}", write_key, e),
                }
                Ok(json)
            })
            .await
            .and_then(decode);

        match produced {
            Ok(value) => Ok(value),
            Err(err) => recover(key, err, fallback),
        }
    }

    /// Deduplicated, time-bounded producer call without store lookup or write.
    ///
    /// For call sites whose result is persisted elsewhere (entity merges).
    pub async fn coalesce<T, F, Fut>(&self, key: &CacheKey, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let limit = self.producer_timeout;
        self.dedup
            .dedupe(key.as_str(), move || async move {
                let value = bounded(limit, producer()).await?;
                Ok(serde_json::to_value(&value)?)
            })
            .await
            .and_then(decode)
    }

    pub async fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let removed = self.store.del(key.as_str()).await?;
        debug!("Invalidated '{}' (existed: {})", key, removed);
        Ok(removed)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.store.get(key.as_str()).await {
            Ok(Some(json)) => match serde_json::from_value(json) {
                Ok(value) => {
                    debug!("Cache hit for '{}'", key);
                    Some(value)
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry '{}': {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("Cache miss for '{}'", key);
                None
            }
            Err(e) => {
                warn!("Store read for '{}' failed, treating as miss: {}", key, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for ReadThroughCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("dedup", &self.dedup)
            .field("producer_timeout", &self.producer_timeout)
            .finish()
    }
}

/// Spawns a store write the caller does not wait for; failures are logged.
pub fn write_behind<F>(label: impl Into<String>, write: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let label = label.into();
    tokio::spawn(async move {
        match write.await {
            Ok(()) => debug!("Write-behind '{}' completed", label),
            Err(e) => warn!("Write-behind '{}' failed: {}", label, e),
        }
    })
}

async fn bounded<T>(limit: Duration, work: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(limit)),
    }
}

fn decode<T: DeserializeOwned>(json: Value) -> Result<T> {
    serde_json::from_value(json).map_err(Error::from)
}

fn recover<T>(key: &CacheKey, err: Error, fallback: Option<T>) -> Result<T> {
    match fallback {
        Some(value) => {
            warn!("Producer for '{}' failed, serving fallback: {}", key, err);
            Ok(value)
        }
        None => {
            warn!("Producer for '{}' failed: {}", key, err);
            Err(err)
        }
    }
}
