use crate::planes::data::DedupStats;
use async_trait::async_trait;
use shared::Result;

/// Operator-facing cache management.
#[async_trait]
pub trait AdminOperations: Send + Sync + 'static {
    fn stats(&self) -> DedupStats;

    fn reset_stats(&self);

    /// Drops one raw store key. Returns whether a live entry was removed.
    async fn invalidate(&self, key: &str) -> Result<bool>;
}
