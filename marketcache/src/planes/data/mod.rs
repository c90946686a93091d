pub mod batch;
pub mod dedupe;
pub mod entity_cache;
pub mod read_through;

pub use batch::{populate_behind, populate_entities};
pub use dedupe::{DedupStats, RequestDeduplicator};
pub use entity_cache::EntityCache;
pub use read_through::{write_behind, ReadThroughCache};
