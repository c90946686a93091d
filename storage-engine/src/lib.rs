pub mod moka_store;
pub mod redis_store;

pub use moka_store::MokaKvStore;
pub use redis_store::RedisKvStore;

use marketcache::ports::KvStore;
use shared::Result;
use shared::config::{StoreBackend, StoreConfig};
use std::sync::Arc;
use tracing::info;

/// Build the store selected by configuration.
pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn KvStore>> {
    match &config.backend {
        StoreBackend::Memory => {
            info!(
                "Using in-memory store (max {} entries)",
                config.max_entries
            );
            Ok(Arc::new(MokaKvStore::new("marketcache", config.max_entries)))
        }
        StoreBackend::Redis(url) => {
            info!("Using redis store");
            Ok(Arc::new(RedisKvStore::connect(url).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::TtlSecs;

    #[tokio::test]
    async fn test_build_memory_store() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            max_entries: 10,
        };
        let store = build_store(&config).await.unwrap();

        store
            .set("global:stablecoin", json!([]), TtlSecs::new(60).unwrap())
            .await
            .unwrap();
        assert_eq!(store.get("global:stablecoin").await.unwrap(), Some(json!([])));
    }
}
