use super::entity_cache::EntityCache;
use super::read_through::write_behind;
use crate::domain::{FeedSource, UnifiedEntity};
use chrono::Utc;
use indexmap::IndexMap;
use shared::{Error, TtlSecs};
use tokio::task::JoinHandle;
use tracing::debug;

/// Merges a batch of feed updates into their unified records.
///
/// Existing records are read with one multi-get and written back with one
/// pipelined multi-set. Updates that normalize to the same record are folded
/// into it in input order. Returns the result of the write.
pub async fn populate_entities<E: UnifiedEntity>(
    cache: &EntityCache<E>,
    updates: Vec<E::Update>,
    source: FeedSource,
    ttl: TtlSecs,
) -> bool {
    if updates.is_empty() {
        return true;
    }

    let keyed: Vec<(String, E::Update)> = updates
        .into_iter()
        .map(|update| (E::cache_key(E::update_id(&update)).into(), update))
        .collect();

    let mut records: IndexMap<String, Option<E>> = IndexMap::with_capacity(keyed.len());
    for (key, _) in &keyed {
        records.entry(key.clone()).or_insert(None);
    }

    let keys: Vec<String> = records.keys().cloned().collect();
    for (slot, existing) in records.values_mut().zip(cache.load(&keys).await) {
        *slot = existing;
    }

    let now = Utc::now();
    for (key, update) in keyed {
        if let Some(slot) = records.get_mut(&key) {
            *slot = Some(E::merge(slot.take(), update, source, now));
        }
    }

    let merged: Vec<E> = records.into_values().flatten().collect();
    debug!("Populating {} {} records from {:?}", merged.len(), E::KIND, source);
    cache.set_many(merged, ttl).await
}

/// Runs [`populate_entities`] on a background task so the caller can return
/// its list response without waiting for the write.
pub fn populate_behind<E: UnifiedEntity>(
    cache: EntityCache<E>,
    updates: Vec<E::Update>,
    source: FeedSource,
    ttl: TtlSecs,
) -> JoinHandle<()> {
    let label = format!("populate {} x{}", E::KIND, updates.len());
    write_behind(label, async move {
        if populate_entities(&cache, updates, source, ttl).await {
            Ok(())
        } else {
            Err(Error::Store(format!("{} batch write rejected", E::KIND)))
        }
    })
}
