use super::{identity, list, number, resolve, text, DataSource, FeedSource, UnifiedEntity};
use crate::keys::{normalize_token_id, CacheKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point of a price chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix milliseconds.
    pub timestamp: i64,
    pub price: f64,
}

/// Canonical cached record for one token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedTokenData {
    pub id: String,
    pub symbol: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_7d: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparkline_7d: Option<Vec<PricePoint>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,

    pub data_source: DataSource,
    pub last_updated: DateTime<Utc>,
}

/// Partial token data as delivered by one feed. Only `id` is required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUpdate {
    pub id: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub volume_24h: Option<f64>,
    pub change_24h: Option<f64>,
    pub change_7d: Option<f64>,
    pub sparkline_7d: Option<Vec<PricePoint>>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub logo: Option<String>,
}

impl TokenUpdate {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

impl UnifiedEntity for UnifiedTokenData {
    type Update = TokenUpdate;

    const KIND: &'static str = "token";

    fn cache_key(id: &str) -> CacheKey {
        CacheKey::token(id)
    }

    fn update_id(update: &TokenUpdate) -> &str {
        &update.id
    }

    fn pin_update(update: &mut TokenUpdate, id: &str) {
        update.id = id.to_string();
    }

    fn merge(
        existing: Option<Self>,
        incoming: TokenUpdate,
        source: FeedSource,
        now: DateTime<Utc>,
    ) -> Self {
        const METRICS: FeedSource = FeedSource::List;
        const RICH: FeedSource = FeedSource::Overview;

        let (id, symbol, name, data_source, base) = match existing {
            Some(record) => (
                record.id.clone(),
                identity(
                    record.symbol.clone(),
                    "",
                    incoming.symbol.clone().map(|s| s.to_uppercase()),
                ),
                identity(record.name.clone(), &record.id, incoming.name.clone()),
                record.data_source.absorb(source),
                Some(record),
            ),
            None => {
                let id = normalize_token_id(&incoming.id);
                let symbol = text(incoming.symbol.clone())
                    .map(|s| s.to_uppercase())
                    .unwrap_or_default();
                let name = text(incoming.name.clone()).unwrap_or_else(|| id.clone());
                (id, symbol, name, source.into(), None)
            }
        };

        // Split the previous record into owned parts so each field can move
        let prev = base.map(TokenFields::from).unwrap_or_default();

        Self {
            id,
            symbol,
            name,
            price: resolve(METRICS, source, number(incoming.price), prev.price),
            market_cap: resolve(METRICS, source, number(incoming.market_cap), prev.market_cap),
            market_cap_rank: resolve(
                METRICS,
                source,
                incoming.market_cap_rank,
                prev.market_cap_rank,
            ),
            volume_24h: resolve(METRICS, source, number(incoming.volume_24h), prev.volume_24h),
            change_24h: resolve(METRICS, source, number(incoming.change_24h), prev.change_24h),
            change_7d: resolve(METRICS, source, number(incoming.change_7d), prev.change_7d),
            sparkline_7d: resolve(RICH, source, list(incoming.sparkline_7d), prev.sparkline_7d),
            address: resolve(
                RICH,
                source,
                text(incoming.address).map(|a| normalize_token_id(&a)),
                prev.address,
            ),
            description: resolve(RICH, source, text(incoming.description), prev.description),
            website: resolve(RICH, source, text(incoming.website), prev.website),
            twitter: resolve(RICH, source, text(incoming.twitter), prev.twitter),
            logo: resolve(RICH, source, text(incoming.logo), prev.logo),
            data_source,
            last_updated: now,
        }
    }

    fn data_source(&self) -> DataSource {
        self.data_source
    }

    fn key(&self) -> CacheKey {
        CacheKey::token(&self.id)
    }
}

#[derive(Default)]
struct TokenFields {
    price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    volume_24h: Option<f64>,
    change_24h: Option<f64>,
    change_7d: Option<f64>,
    sparkline_7d: Option<Vec<PricePoint>>,
    address: Option<String>,
    description: Option<String>,
    website: Option<String>,
    twitter: Option<String>,
    logo: Option<String>,
}

impl From<UnifiedTokenData> for TokenFields {
    fn from(record: UnifiedTokenData) -> Self {
        Self {
            price: record.price,
            market_cap: record.market_cap,
            market_cap_rank: record.market_cap_rank,
            volume_24h: record.volume_24h,
            change_24h: record.change_24h,
            change_7d: record.change_7d,
            sparkline_7d: record.sparkline_7d,
            address: record.address,
            description: record.description,
            website: record.website,
            twitter: record.twitter,
            logo: record.logo,
        }
    }
}
