use crate::domain::{merge_entity, FeedSource, UnifiedEntity};
use crate::ports::{KvStore, StoreEntry};
use indexmap::IndexMap;
use shared::{Result, TtlSecs};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed view over the store for one kind of unified record.
///
/// Reads fail open: a store error or an undecodable payload reads as absent,
/// which callers treat the same as "never fetched".
pub struct EntityCache<E> {
    store: Arc<dyn KvStore>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityCache<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: UnifiedEntity> EntityCache<E> {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn get(&self, id: &str) -> Option<E> {
        let key = E::cache_key(id);
        match self.store.get(key.as_str()).await {
            Ok(Some(json)) => decode::<E>(key.as_str(), json),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {} '{}': {}", E::KIND, key, e);
                None
            }
        }
    }

    /// Read-modify-write of one record.
    ///
    /// Not atomic: two concurrent merges of the same id may both read the same
    /// base record, and the later write wins.
    pub async fn merge(&self, update: E::Update, source: FeedSource, ttl: TtlSecs) -> Result<E> {
        let existing = self.get(E::update_id(&update)).await;
        let merged: E = merge_entity(existing, update, source);
        let key = merged.key();
        let json = serde_json::to_value(&merged)?;

        match self.store.set(key.as_str(), json, ttl).await {
            Ok(()) => debug!(
                "Merged {} '{}' ({:?})",
                E::KIND,
                key,
                merged.data_source()
            ),
            Err(e) => warn!("Failed to write merged {} '{}': {}", E::KIND, key, e),
        }
        Ok(merged)
    }

    /// Writes all records in one pipelined call.
    ///
    /// Reports whether the pipeline call succeeded, not per-key results.
    pub async fn set_many(&self, records: Vec<E>, ttl: TtlSecs) -> bool {
        if records.is_empty() {
            return true;
        }

        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            let key = record.key();
            match serde_json::to_value(record) {
                Ok(json) => entries.push(StoreEntry::new(key, json, ttl)),
                Err(e) => warn!("Skipping unserializable {} '{}': {}", E::KIND, key, e),
            }
        }

        let count = entries.len();
        match self.store.mset(entries).await {
            Ok(written) => {
                debug!("Wrote {} {} records (ok: {})", count, E::KIND, written);
                written
            }
            Err(e) => {
                warn!("Batch write of {} {} records failed: {}", count, E::KIND, e);
                false
            }
        }
    }

    /// Reads many records in one call. Every input id gets an entry, in input
    /// order; missing records map to `None`.
    pub async fn get_many(&self, ids: &[String]) -> IndexMap<String, Option<E>> {
        let keys: Vec<String> = ids.iter().map(|id| E::cache_key(id).into()).collect();
        let records = self.load(&keys).await;

        let mut found = IndexMap::with_capacity(ids.len());
        for (id, record) in ids.iter().zip(records) {
            found.entry(id.clone()).or_insert(record);
        }
        found
    }

    /// Positional read by store key; one slot per key.
    pub(crate) async fn load(&self, keys: &[String]) -> Vec<Option<E>> {
        if keys.is_empty() {
            return Vec::new();
        }

        match self.store.mget(keys).await {
            Ok(values) if values.len() == keys.len() => keys
                .iter()
                .zip(values)
                .map(|(key, value)| value.and_then(|json| decode::<E>(key, json)))
                .collect(),
            Ok(values) => {
                warn!(
                    "Store returned {} values for {} {} keys",
                    values.len(),
                    keys.len(),
                    E::KIND
                );
                vec![None; keys.len()]
            }
            Err(e) => {
                warn!("Batch read of {} {} records failed: {}", keys.len(), E::KIND, e);
                vec![None; keys.len()]
            }
        }
    }
}

impl<E> std::fmt::Debug for EntityCache<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache").finish_non_exhaustive()
    }
}

fn decode<E: UnifiedEntity>(key: &str, json: serde_json::Value) -> Option<E> {
    match serde_json::from_value(json) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Discarding undecodable {} '{}': {}", E::KIND, key, e);
            None
        }
    }
}
