//! Market data caching core: a read-through cache with request
//! deduplication, and unified protocol/token records merged from partial
//! feed updates.

pub mod domain;
pub mod keys;
pub mod planes;
pub mod ports;

#[cfg(test)]
mod testing;

pub use keys::CacheKey;
pub use planes::control::{AdminOperations, CacheControl};
pub use planes::data::{
    populate_behind, populate_entities, write_behind, DedupStats, EntityCache, ReadThroughCache,
    RequestDeduplicator,
};
pub use ports::{KvStore, StoreEntry};
