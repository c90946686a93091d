//! In-memory `KvStore` double with failure switches and call counters.

use crate::ports::{KvStore, StoreEntry};
use async_trait::async_trait;
use serde_json::Value;
use shared::{Error, Result, TtlSecs};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct FakeStore {
    entries: Mutex<HashMap<String, (Value, TtlSecs)>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub mgets: AtomicUsize,
    pub msets: AtomicUsize,
}

impl FakeStore {
    pub fn seed(&self, key: &str, value: Value, ttl: TtlSecs) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl));
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone())
    }

    pub fn ttl(&self, key: &str) -> Option<TtlSecs> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::Store(format!("{} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FakeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads, "get")?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value, ttl: TtlSecs) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_writes, "set")?;
        self.seed(key, value, ttl);
        Ok(())
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Value>>> {
        self.mgets.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_reads, "mget")?;
        Ok(keys.iter().map(|key| self.value(key)).collect())
    }

    async fn mset(&self, entries: Vec<StoreEntry>) -> Result<bool> {
        self.msets.fetch_add(1, Ordering::SeqCst);
        self.check(&self.fail_writes, "mset")?;
        for entry in entries {
            self.seed(&entry.key, entry.value, entry.ttl);
        }
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        self.check(&self.fail_writes, "del")?;
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }
}
