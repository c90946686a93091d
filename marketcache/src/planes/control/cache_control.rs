use crate::keys::CacheKey;
use crate::planes::control::operation::AdminOperations;
use crate::planes::data::{DedupStats, ReadThroughCache};
use async_trait::async_trait;
use shared::{Error, Result};
use tracing::info;

/// Admin operations backed by the shared read-through cache.
#[derive(Clone, Debug)]
pub struct CacheControl {
    cache: ReadThroughCache,
}

impl CacheControl {
    pub fn new(cache: ReadThroughCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl AdminOperations for CacheControl {
    fn stats(&self) -> DedupStats {
        self.cache.stats()
    }

    fn reset_stats(&self) {
        info!("Resetting deduplication counters");
        self.cache.reset_stats()
    }

    async fn invalidate(&self, key: &str) -> Result<bool> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidKey(key.to_string()));
        }
        let removed = self.cache.invalidate(&CacheKey::raw(key)).await?;
        info!("Invalidated cache key '{}' (existed: {})", key, removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planes::data::RequestDeduplicator;
    use crate::testing::FakeStore;
    use serde_json::json;
    use shared::TtlSecs;
    use std::sync::Arc;
    use std::time::Duration;

    fn control(store: Arc<FakeStore>) -> CacheControl {
        CacheControl::new(ReadThroughCache::new(
            store,
            Arc::new(RequestDeduplicator::new()),
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn test_invalidate_existing_and_missing() {
        let store = Arc::new(FakeStore::default());
        store.seed("global:stablecoin", json!([]), TtlSecs::new(60).unwrap());
        let control = control(Arc::clone(&store));

        assert_eq!(control.invalidate("global:stablecoin").await, Ok(true));
        assert_eq!(control.invalidate("global:stablecoin").await, Ok(false));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_blank_key_is_rejected() {
        let control = control(Arc::new(FakeStore::default()));
        assert_eq!(
            control.invalidate("  ").await,
            Err(Error::InvalidKey(String::new()))
        );
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let store = Arc::new(FakeStore::default());
        let cache = ReadThroughCache::new(
            store,
            Arc::new(RequestDeduplicator::new()),
            Duration::from_secs(1),
        );
        let control = CacheControl::new(cache.clone());

        let ttl = TtlSecs::new(60).unwrap();
        cache
            .with_cache(&CacheKey::exchange_rates(), ttl, || async { Ok(1u32) }, None)
            .await
            .unwrap();
        assert_eq!(control.stats().total, 1);

        control.reset_stats();
        assert_eq!(control.stats().total, 0);
    }
}
