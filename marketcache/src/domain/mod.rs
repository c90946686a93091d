pub mod protocol;
pub mod token;

use crate::keys::CacheKey;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub use protocol::{ProtocolUpdate, TvlPoint, UnifiedProtocolData};
pub use token::{PricePoint, TokenUpdate, UnifiedTokenData};

/// The upstream feed a partial entity update came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedSource {
    /// Cheap bulk feed: many entities, coarse fields, freshest metrics.
    List,
    /// Expensive per-entity feed: rich descriptive and chart data.
    Overview,
}

/// Provenance of a unified record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    List,
    Overview,
    Merged,
}

impl DataSource {
    /// Provenance of an existing record after absorbing an update from
    /// `source`. Only list refreshes of a list record stay `List`.
    pub fn absorb(self, source: FeedSource) -> DataSource {
        match (self, source) {
            (DataSource::List, FeedSource::List) => DataSource::List,
            _ => DataSource::Merged,
        }
    }

    pub fn has_overview(self) -> bool {
        matches!(self, DataSource::Overview | DataSource::Merged)
    }
}

impl From<FeedSource> for DataSource {
    fn from(source: FeedSource) -> Self {
        match source {
            FeedSource::List => DataSource::List,
            FeedSource::Overview => DataSource::Overview,
        }
    }
}

/// A canonical per-entity record assembled from partial feed updates.
pub trait UnifiedEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Update: Clone + Send + Sync + 'static;

    /// Short label used in logs.
    const KIND: &'static str;

    fn cache_key(id: &str) -> CacheKey;

    /// Entity id carried by an update.
    fn update_id(update: &Self::Update) -> &str;

    /// Rebinds an update to `id`, so it merges into the record stored under
    /// that id whatever id the feed reported.
    fn pin_update(update: &mut Self::Update, id: &str);

    /// Folds `incoming` into `existing`. Pure and total.
    fn merge(
        existing: Option<Self>,
        incoming: Self::Update,
        source: FeedSource,
        now: DateTime<Utc>,
    ) -> Self;

    fn data_source(&self) -> DataSource;

    /// Store key of this record.
    fn key(&self) -> CacheKey;
}

/// Convenience wrapper over [`UnifiedEntity::merge`] stamped with the current time.
pub fn merge_entity<E: UnifiedEntity>(
    existing: Option<E>,
    incoming: E::Update,
    source: FeedSource,
) -> E {
    E::merge(existing, incoming, source, Utc::now())
}

/// Field-group ownership: the owning feed overwrites, the other only fills gaps.
pub(crate) fn resolve<T>(
    owner: FeedSource,
    source: FeedSource,
    incoming: Option<T>,
    existing: Option<T>,
) -> Option<T> {
    if source == owner {
        incoming.or(existing)
    } else {
        existing.or(incoming)
    }
}

/// Blank strings count as absent.
pub(crate) fn text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Empty collections count as absent.
pub(crate) fn list<T>(value: Option<Vec<T>>) -> Option<Vec<T>> {
    value.filter(|v| !v.is_empty())
}

/// Identity field that may still hold its placeholder: the record id for
/// names, empty for symbols. A placeholder is filled by the first real value;
/// a real value never changes.
pub(crate) fn identity(current: String, placeholder: &str, incoming: Option<String>) -> String {
    if current.is_empty() || current == placeholder {
        text(incoming).unwrap_or(current)
    } else {
        current
    }
}

/// Non-finite numbers (NaN from a bad payload) count as absent.
pub(crate) fn number(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
