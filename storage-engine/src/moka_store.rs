use async_trait::async_trait;
use marketcache::ports::{KvStore, StoreEntry};
use moka::Expiry;
use moka::future::Cache;
use serde_json::Value;
use shared::{Result, TtlSecs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct StoredValue {
    value: Value,
    ttl: Duration,
}

/// Expires every entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    // An overwrite restarts the clock with the new entry's TTL
    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based in-process store with per-entry TTL.
/// Bounded by entry count; the least useful entries are evicted first.
pub struct MokaKvStore {
    cache: Cache<String, StoredValue>,
}

impl MokaKvStore {
    pub fn new(name: &str, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .name(name)
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }

    async fn insert(&self, key: String, value: Value, ttl: TtlSecs) {
        let stored = StoredValue {
            value,
            ttl: ttl.as_duration(),
        };
        self.cache.insert(key, stored).await;
    }
}

#[async_trait]
impl KvStore for MokaKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        // Expired entries read as absent even before they are evicted
        Ok(self.cache.get(key).await.map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: TtlSecs) -> Result<()> {
        self.insert(key.to_string(), value, ttl).await;
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.cache.get(key).await.map(|stored| stored.value));
        }
        Ok(values)
    }

    async fn mset(&self, entries: Vec<StoreEntry>) -> Result<bool> {
        for entry in entries {
            self.insert(entry.key, entry.value, entry.ttl).await;
        }
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self.cache.remove(key).await.is_some())
    }
}

impl Debug for MokaKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaKvStore")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::sleep;

    fn ttl(secs: u64) -> TtlSecs {
        TtlSecs::new(secs).unwrap()
    }

    #[tokio::test]
    async fn test_moka_store_set_and_get() {
        let store = MokaKvStore::new("test", 100);

        store
            .set("defi:protocol:aave", json!({ "tvl": 1.5 }), ttl(60))
            .await
            .unwrap();

        let value = store.get("defi:protocol:aave").await.unwrap();
        assert_eq!(value, Some(json!({ "tvl": 1.5 })));
        assert_eq!(store.get("defi:protocol:lido").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_moka_store_delete() {
        let store = MokaKvStore::new("test", 100);
        store.set("key", json!(1), ttl(60)).await.unwrap();

        assert!(store.del("key").await.unwrap());
        assert!(!store.del("key").await.unwrap());
        assert_eq!(store.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_moka_store_overwrite() {
        let store = MokaKvStore::new("test", 100);

        store.set("key", json!("value1"), ttl(60)).await.unwrap();
        store.set("key", json!("value2"), ttl(60)).await.unwrap();

        assert_eq!(store.get("key").await.unwrap(), Some(json!("value2")));
    }

    #[tokio::test]
    async fn test_moka_store_entries_expire_with_their_own_ttl() {
        let store = MokaKvStore::new("test", 100);

        store.set("short", json!(1), ttl(1)).await.unwrap();
        store.set("long", json!(2), ttl(60)).await.unwrap();

        sleep(Duration::from_millis(1200)).await;

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_moka_store_mget_is_positional() {
        let store = MokaKvStore::new("test", 100);
        store
            .mset(vec![
                StoreEntry::new("a", json!("A"), ttl(60)),
                StoreEntry::new("c", json!("C"), ttl(60)),
            ])
            .await
            .unwrap();

        let keys = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        let values = store.mget(&keys).await.unwrap();

        assert_eq!(values, vec![Some(json!("C")), None, Some(json!("A"))]);
    }

    #[tokio::test]
    async fn test_moka_store_bounded() {
        let store = MokaKvStore::new("test", 2);

        for key in ["key1", "key2", "key3"] {
            store.set(key, json!(key), ttl(60)).await.unwrap();
        }

        // Let pending maintenance apply the eviction
        store.cache.run_pending_tasks().await;

        let entry_count = store.cache.entry_count();
        assert!(entry_count <= 2, "Store should hold at most 2 entries");
    }
}
