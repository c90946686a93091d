use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use shared::{Error, Result};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;

struct InFlight<T> {
    id: u64,
    future: SharedResult<T>,
}

/// Snapshot of the deduplication counters.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupStats {
    pub total: u64,
    pub deduped: u64,
    pub in_flight: usize,
    pub savings_percent: f64,
}

/// Collapses concurrent requests for the same key into one producer call.
///
/// One instance per process, shared behind an `Arc`. Entries live only while
/// their producer is running.
pub struct RequestDeduplicator<T> {
    in_flight: Arc<DashMap<String, InFlight<T>>>,
    next_id: AtomicU64,
    total: AtomicU64,
    deduped: AtomicU64,
}

impl<T> RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
            total: AtomicU64::new(0),
            deduped: AtomicU64::new(0),
        }
    }

    /// Runs `producer` unless a call for `key` is already in flight, in which
    /// case the caller waits for that call and receives its result.
    ///
    /// The producer runs on its own task: dropping a caller does not cancel it,
    /// and the key is released when it settles, including on panic.
    /// `producer` is called while the key's map shard is locked, so it must
    /// only build the future and not call back into this deduplicator.
    pub async fn dedupe<F, Fut>(&self, key: &str, producer: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if key.is_empty() {
            return Err(Error::InvalidKey(key.to_string()));
        }

        self.total.fetch_add(1, Ordering::Relaxed);

        let future = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                self.deduped.fetch_add(1, Ordering::Relaxed);
                debug!("Joining in-flight request for key '{}'", key);
                entry.get().future.clone()
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = InFlightGuard {
                    in_flight: Arc::clone(&self.in_flight),
                    key: key.to_string(),
                    id,
                };
                let work = producer();
                // The shard lock held by `entry` keeps the guard from removing
                // the key before it has been inserted
                let task = tokio::spawn(async move {
                    let _guard = guard;
                    work.await
                });
                let future = async move {
                    match task.await {
                        Ok(result) => result,
                        Err(e) => Err(Error::Internal(format!("producer task failed: {}", e))),
                    }
                }
                .boxed()
                .shared();

                entry.insert(InFlight {
                    id,
                    future: future.clone(),
                });
                future
            }
        };

        future.await
    }

    pub fn stats(&self) -> DedupStats {
        let total = self.total.load(Ordering::Relaxed);
        let deduped = self.deduped.load(Ordering::Relaxed);
        let savings_percent = if total == 0 {
            0.0
        } else {
            (deduped as f64 / total as f64 * 10_000.0).round() / 100.0
        };

        DedupStats {
            total,
            deduped,
            in_flight: self.in_flight.len(),
            savings_percent,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn reset_stats(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.deduped.store(0, Ordering::Relaxed);
    }
}

impl<T> Default for RequestDeduplicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for RequestDeduplicator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDeduplicator")
            .field("in_flight", &self.in_flight.len())
            .field("total", &self.total.load(Ordering::Relaxed))
            .field("deduped", &self.deduped.load(Ordering::Relaxed))
            .finish()
    }
}

/// Releases a key when its producer task ends, however it ends.
struct InFlightGuard<T> {
    in_flight: Arc<DashMap<String, InFlight<T>>>,
    key: String,
    id: u64,
}

impl<T> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        self.in_flight.remove_if(&self.key, |_, entry| entry.id == self.id);
    }
}
