use async_trait::async_trait;
use marketcache::ports::{KvStore, StoreEntry};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use shared::{Error, Result, TtlSecs};
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Redis-backed store shared by every instance of the service.
///
/// Values are stored as JSON strings with `SET .. EX`, so expiry is enforced
/// by Redis itself.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Configuration(format!("invalid redis url: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Store(format!("failed to connect to redis: {}", e)))?;

        info!("Connected to redis store");
        Ok(Self { conn })
    }
}

fn store_error(op: &str, e: redis::RedisError) -> Error {
    Error::Store(format!("redis {} failed: {}", op, e))
}

/// Payloads that are not valid JSON read as absent.
fn decode(key: &str, raw: Option<String>) -> Option<Value> {
    let raw = raw?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring non-JSON value under '{}': {}", key, e);
            None
        }
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(|e| store_error("GET", e))?;
        Ok(decode(key, raw))
    }

    async fn set(&self, key: &str, value: Value, ttl: TtlSecs) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&value)?;
        let _: () = conn
            .set_ex(key, json, ttl.secs())
            .await
            .map_err(|e| store_error("SET", e))?;
        debug!("redis SET {} (ttl={}s)", key, ttl.secs());
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let raw: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("MGET", e))?;

        Ok(keys
            .iter()
            .zip(raw)
            .map(|(key, raw)| decode(key, raw))
            .collect())
    }

    async fn mset(&self, entries: Vec<StoreEntry>) -> Result<bool> {
        if entries.is_empty() {
            return Ok(true);
        }

        let mut pipe = redis::pipe();
        for entry in &entries {
            let json = serde_json::to_string(&entry.value)?;
            pipe.set_ex(&entry.key, json, entry.ttl.secs()).ignore();
        }

        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| store_error("pipelined SET", e))?;
        debug!("redis pipelined SET of {} keys", entries.len());
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(|e| store_error("DEL", e))?;
        Ok(removed > 0)
    }
}

impl Debug for RedisKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKvStore")
            .field("conn", &"<ConnectionManager>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_valid_json() {
        assert_eq!(
            decode("k", Some(r#"{"tvl":1.5}"#.to_string())),
            Some(json!({ "tvl": 1.5 }))
        );
        assert_eq!(decode("k", None), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode("k", Some("not json".to_string())), None);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = RedisKvStore::connect("not-a-url").await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
