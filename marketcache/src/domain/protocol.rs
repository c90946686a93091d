use super::{identity, list, number, resolve, text, DataSource, FeedSource, UnifiedEntity};
use crate::keys::{normalize_protocol_id, CacheKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One point of a protocol TVL chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TvlPoint {
    /// Unix seconds.
    pub date: i64,
    pub tvl: f64,
}

/// Canonical cached record for one DeFi protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedProtocolData {
    // identity
    pub id: String,
    pub slug: String,
    pub name: String,

    // volatile metrics, owned by the list feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_1h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_1d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_7d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_tvls: Option<BTreeMap<String, f64>>,

    // time series, owned by the overview feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvl_history: Option<Vec<TvlPoint>>,

    // descriptive, owned by the overview feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    pub data_source: DataSource,
    pub last_updated: DateTime<Utc>,
}

/// Partial protocol data as delivered by one feed. Only `slug` is required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolUpdate {
    pub slug: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub tvl: Option<f64>,
    pub change_1h: Option<f64>,
    pub change_1d: Option<f64>,
    pub change_7d: Option<f64>,
    pub mcap: Option<f64>,
    pub chain_tvls: Option<BTreeMap<String, f64>>,
    pub tvl_history: Option<Vec<TvlPoint>>,
    pub symbol: Option<String>,
    pub category: Option<String>,
    pub chains: Option<Vec<String>>,
    pub parent_protocol: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<Vec<String>>,
    pub logo: Option<String>,
}

impl ProtocolUpdate {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Self::default()
        }
    }
}

impl UnifiedProtocolData {
    fn blank(update: &ProtocolUpdate, source: FeedSource, now: DateTime<Utc>) -> Self {
        let slug = normalize_protocol_id(&update.slug);
        Self {
            id: text(update.id.clone()).unwrap_or_else(|| slug.clone()),
            name: text(update.name.clone()).unwrap_or_else(|| slug.clone()),
            slug,
            tvl: None,
            change_1h: None,
            change_1d: None,
            change_7d: None,
            mcap: None,
            chain_tvls: None,
            tvl_history: None,
            symbol: None,
            category: None,
            chains: None,
            parent_protocol: None,
            description: None,
            url: None,
            twitter: None,
            github: None,
            logo: None,
            data_source: source.into(),
            last_updated: now,
        }
    }
}

impl UnifiedEntity for UnifiedProtocolData {
    type Update = ProtocolUpdate;

    const KIND: &'static str = "protocol";

    fn cache_key(id: &str) -> CacheKey {
        CacheKey::protocol(id)
    }

    fn update_id(update: &ProtocolUpdate) -> &str {
        &update.slug
    }

    fn pin_update(update: &mut ProtocolUpdate, slug: &str) {
        update.slug = slug.to_string();
    }

    fn merge(
        existing: Option<Self>,
        incoming: ProtocolUpdate,
        source: FeedSource,
        now: DateTime<Utc>,
    ) -> Self {
        let base = match existing {
            Some(record) => {
                let data_source = record.data_source.absorb(source);
                Self {
                    data_source,
                    ..record
                }
            }
            None => Self::blank(&incoming, source, now),
        };

        const METRICS: FeedSource = FeedSource::List;
        const RICH: FeedSource = FeedSource::Overview;

        let name = identity(base.name, &base.slug, incoming.name);
        Self {
            id: base.id,
            slug: base.slug,
            name,
            tvl: resolve(METRICS, source, number(incoming.tvl), base.tvl),
            change_1h: resolve(METRICS, source, number(incoming.change_1h), base.change_1h),
            change_1d: resolve(METRICS, source, number(incoming.change_1d), base.change_1d),
            change_7d: resolve(METRICS, source, number(incoming.change_7d), base.change_7d),
            mcap: resolve(METRICS, source, number(incoming.mcap), base.mcap),
            chain_tvls: resolve(
                METRICS,
                source,
                incoming.chain_tvls.filter(|m| !m.is_empty()),
                base.chain_tvls,
            ),
            tvl_history: resolve(RICH, source, list(incoming.tvl_history), base.tvl_history),
            symbol: resolve(RICH, source, text(incoming.symbol), base.symbol),
            category: resolve(RICH, source, text(incoming.category), base.category),
            chains: resolve(RICH, source, list(incoming.chains), base.chains),
            parent_protocol: resolve(
                RICH,
                source,
                text(incoming.parent_protocol).map(|p| normalize_protocol_id(&p)),
                base.parent_protocol,
            ),
            description: resolve(RICH, source, text(incoming.description), base.description),
            url: resolve(RICH, source, text(incoming.url), base.url),
            twitter: resolve(RICH, source, text(incoming.twitter), base.twitter),
            github: resolve(RICH, source, list(incoming.github), base.github),
            logo: resolve(RICH, source, text(incoming.logo), base.logo),
            data_source: base.data_source,
            last_updated: now,
        }
    }

    fn data_source(&self) -> DataSource {
        self.data_source
    }

    fn key(&self) -> CacheKey {
        CacheKey::protocol(&self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn existing(source: FeedSource) -> UnifiedProtocolData {
        let mut seed = ProtocolUpdate::new("jupiter");
        seed.name = Some("Jupiter".to_string());
        seed.tvl = Some(90.0);
        seed.description = Some("x".to_string());
        UnifiedProtocolData::merge(None, seed, source, t0())
    }

    #[test]
    fn test_first_update_becomes_record() {
        let mut update = ProtocolUpdate::new("parent#Jupiter");
        update.tvl = Some(500_000_000.0);
        update.url = Some("https://jup.ag".to_string());

        let record = UnifiedProtocolData::merge(None, update, FeedSource::List, t0());

        assert_eq!(record.slug, "jupiter");
        assert_eq!(record.id, "jupiter");
        assert_eq!(record.name, "jupiter");
        assert_eq!(record.tvl, Some(500_000_000.0));
        assert_eq!(record.url.as_deref(), Some("https://jup.ag"));
        assert_eq!(record.data_source, DataSource::List);
        assert_eq!(record.last_updated, t0());
    }

    #[test]
    fn test_list_update_overwrites_metrics_keeps_description() {
        let mut update = ProtocolUpdate::new("jupiter");
        update.tvl = Some(100.0);

        let record = UnifiedProtocolData::merge(
            Some(existing(FeedSource::Overview)),
            update,
            FeedSource::List,
            t0() + Duration::minutes(5),
        );

        assert_eq!(record.tvl, Some(100.0));
        assert_eq!(record.description.as_deref(), Some("x"));
        assert_eq!(record.data_source, DataSource::Merged);
        assert_eq!(record.last_updated, t0() + Duration::minutes(5));
    }

    #[test]
    fn test_list_update_only_fills_missing_descriptive_fields() {
        let mut update = ProtocolUpdate::new("jupiter");
        update.description = Some("from list".to_string());
        update.logo = Some("https://icons/jup.png".to_string());
        update.change_1d = Some(-2.5);

        let record = UnifiedProtocolData::merge(
            Some(existing(FeedSource::List)),
            update,
            FeedSource::List,
            t0(),
        );

        assert_eq!(record.description.as_deref(), Some("x"));
        assert_eq!(record.logo.as_deref(), Some("https://icons/jup.png"));
        assert_eq!(record.change_1d, Some(-2.5));
        // metric absent from the update falls back to the existing value
        assert_eq!(record.tvl, Some(90.0));
        assert_eq!(record.data_source, DataSource::List);
    }

    #[test]
    fn test_overview_update_overwrites_description_keeps_tvl() {
        let mut seed = existing(FeedSource::List);
        seed.tvl = Some(100.0);

        let mut update = ProtocolUpdate::new("jupiter");
        update.description = Some("y".to_string());
        update.tvl = Some(80.0);

        let record = UnifiedProtocolData::merge(Some(seed), update, FeedSource::Overview, t0());

        assert_eq!(record.tvl, Some(100.0));
        assert_eq!(record.description.as_deref(), Some("y"));
        assert_eq!(record.data_source, DataSource::Merged);
    }

    #[test]
    fn test_overview_fills_missing_metrics() {
        let mut seed = existing(FeedSource::List);
        seed.tvl = None;

        let mut update = ProtocolUpdate::new("jupiter");
        update.tvl = Some(42.0);
        update.chain_tvls = Some(BTreeMap::from([("Solana".to_string(), 42.0)]));

        let record = UnifiedProtocolData::merge(Some(seed), update, FeedSource::Overview, t0());

        assert_eq!(record.tvl, Some(42.0));
        assert_eq!(record.chain_tvls.unwrap()["Solana"], 42.0);
    }

    #[test]
    fn test_empty_values_never_clobber() {
        let mut update = ProtocolUpdate::new("jupiter");
        update.description = Some("   ".to_string());
        update.github = Some(vec![]);
        update.tvl = Some(f64::NAN);

        let record = UnifiedProtocolData::merge(
            Some(existing(FeedSource::Overview)),
            update,
            FeedSource::Overview,
            t0(),
        );

        assert_eq!(record.description.as_deref(), Some("x"));
        assert_eq!(record.tvl, Some(90.0));
        assert_eq!(record.github, None);
        assert_eq!(record.data_source, DataSource::Merged);
    }

    #[test]
    fn test_identity_is_immutable() {
        let mut update = ProtocolUpdate::new("jupiter");
        update.id = Some("other-id".to_string());
        update.name = Some("Renamed".to_string());

        let record = UnifiedProtocolData::merge(
            Some(existing(FeedSource::List)),
            update,
            FeedSource::Overview,
            t0(),
        );

        assert_eq!(record.id, "jupiter");
        assert_eq!(record.name, "Jupiter");
    }

    #[test]
    fn test_overview_onto_overview_is_merged() {
        let mut update = ProtocolUpdate::new("jupiter");
        update.description = Some("y".to_string());

        let first = UnifiedProtocolData::merge(
            None,
            ProtocolUpdate::new("jupiter"),
            FeedSource::Overview,
            t0(),
        );
        assert_eq!(first.data_source, DataSource::Overview);

        let record = UnifiedProtocolData::merge(Some(first), update, FeedSource::Overview, t0());
        assert_eq!(record.data_source, DataSource::Merged);
        assert_eq!(record.description.as_deref(), Some("y"));
    }

    #[test]
    fn test_slug_placeholder_name_is_filled_later() {
        let listed =
            UnifiedProtocolData::merge(None, ProtocolUpdate::new("jupiter"), FeedSource::List, t0());
        assert_eq!(listed.name, "jupiter");

        let mut overview = ProtocolUpdate::new("jupiter");
        overview.name = Some("Jupiter".to_string());
        let record = UnifiedProtocolData::merge(Some(listed), overview, FeedSource::Overview, t0());
        assert_eq!(record.name, "Jupiter");

        let mut rename = ProtocolUpdate::new("jupiter");
        rename.name = Some("Jupiter Exchange".to_string());
        let record = UnifiedProtocolData::merge(Some(record), rename, FeedSource::List, t0());
        assert_eq!(record.name, "Jupiter");
    }

    #[test]
    fn test_remerge_is_idempotent() {
        let mut update = ProtocolUpdate::new("jupiter");
        update.tvl = Some(100.0);
        update.description = Some("y".to_string());
        update.tvl_history = Some(vec![TvlPoint { date: 1, tvl: 99.0 }]);

        for source in [FeedSource::List, FeedSource::Overview] {
            let once = UnifiedProtocolData::merge(
                Some(existing(FeedSource::List)),
                update.clone(),
                source,
                t0(),
            );
            let twice = UnifiedProtocolData::merge(
                Some(once.clone()),
                update.clone(),
                source,
                t0() + Duration::seconds(30),
            );

            assert_eq!(
                UnifiedProtocolData {
                    last_updated: once.last_updated,
                    ..twice.clone()
                },
                once
            );
            assert!(twice.last_updated > once.last_updated);
        }
    }

    #[test]
    fn test_record_json_shape() {
        let record = existing(FeedSource::List);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["dataSource"], "list");
        assert_eq!(json["tvl"], 90.0);
        assert!(json.get("logo").is_none());

        let back: UnifiedProtocolData = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
