use crate::service::MarketDataService;
use crate::upstream::MarketDataProvider;
use marketcache::{CacheControl, KvStore, ReadThroughCache, RequestDeduplicator};
use std::sync::Arc;
use std::time::Duration;

/// Server state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub service: Arc<MarketDataService>,
    pub control: Arc<CacheControl>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KvStore>,
        provider: Arc<dyn MarketDataProvider>,
        producer_timeout: Duration,
    ) -> Self {
        // One deduplicator per process, shared by every cached endpoint
        let dedup = Arc::new(RequestDeduplicator::new());
        let cache = ReadThroughCache::new(store, dedup, producer_timeout);

        Self {
            service: Arc::new(MarketDataService::new(provider, cache.clone())),
            control: Arc::new(CacheControl::new(cache)),
        }
    }
}
