//! Wire shapes of the upstream market-data APIs and their conversion into
//! partial entity updates.

use chrono::Utc;
use marketcache::domain::{PricePoint, ProtocolUpdate, TokenUpdate, TvlPoint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of the protocol list feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSummary {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub tvl: Option<f64>,
    #[serde(default)]
    pub change_1h: Option<f64>,
    #[serde(default)]
    pub change_1d: Option<f64>,
    #[serde(default)]
    pub change_7d: Option<f64>,
    #[serde(default)]
    pub mcap: Option<f64>,
    #[serde(default, rename = "chainTvls")]
    pub chain_tvls: BTreeMap<String, f64>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "parentProtocol")]
    pub parent_protocol: Option<String>,
}

impl From<&ProtocolSummary> for ProtocolUpdate {
    fn from(item: &ProtocolSummary) -> Self {
        ProtocolUpdate {
            slug: item.slug.clone(),
            id: item.id.clone(),
            name: Some(item.name.clone()),
            tvl: item.tvl,
            change_1h: item.change_1h,
            change_1d: item.change_1d,
            change_7d: item.change_7d,
            mcap: item.mcap,
            chain_tvls: Some(item.chain_tvls.clone()),
            tvl_history: None,
            symbol: item.symbol.clone(),
            category: item.category.clone(),
            chains: Some(item.chains.clone()),
            parent_protocol: item.parent_protocol.clone(),
            description: item.description.clone(),
            url: item.url.clone(),
            twitter: item.twitter.clone(),
            github: None,
            logo: item.logo.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TvlSample {
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD")]
    pub total_liquidity_usd: f64,
}

/// Per-protocol detail feed.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolOverview {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub github: Vec<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub parent_protocol: Option<String>,
    #[serde(default)]
    pub mcap: Option<f64>,
    #[serde(default)]
    pub tvl: Vec<TvlSample>,
    #[serde(default)]
    pub current_chain_tvls: BTreeMap<String, f64>,
}

impl ProtocolOverview {
    pub fn into_update(self, slug: &str) -> ProtocolUpdate {
        let history: Vec<TvlPoint> = self
            .tvl
            .iter()
            .map(|sample| TvlPoint {
                date: sample.date,
                tvl: sample.total_liquidity_usd,
            })
            .collect();

        ProtocolUpdate {
            slug: slug.to_string(),
            id: self.id,
            name: Some(self.name),
            tvl: history.last().map(|point| point.tvl),
            change_1h: None,
            change_1d: None,
            change_7d: None,
            mcap: self.mcap,
            chain_tvls: Some(self.current_chain_tvls),
            tvl_history: Some(history),
            symbol: self.symbol,
            category: self.category,
            chains: Some(self.chains),
            parent_protocol: self.parent_protocol,
            description: self.description,
            url: self.url,
            twitter: self.twitter,
            github: Some(self.github),
            logo: self.logo,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stablecoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub peg_type: Option<String>,
    #[serde(default)]
    pub circulating: BTreeMap<String, f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StablecoinsResponse {
    pub pegged_assets: Vec<Stablecoin>,
}

/// One row of the paginated token markets feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TokenMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,
}

impl From<&TokenMarket> for TokenUpdate {
    fn from(row: &TokenMarket) -> Self {
        TokenUpdate {
            id: row.id.clone(),
            symbol: Some(row.symbol.clone()),
            name: Some(row.name.clone()),
            price: row.current_price,
            market_cap: row.market_cap,
            market_cap_rank: row.market_cap_rank,
            volume_24h: row.total_volume,
            change_24h: row.price_change_percentage_24h,
            change_7d: row.price_change_percentage_7d_in_currency,
            logo: row.image.clone(),
            ..TokenUpdate::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UsdAmount {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub current_price: UsdAmount,
    #[serde(default)]
    pub market_cap: UsdAmount,
    #[serde(default)]
    pub total_volume: UsdAmount,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d: Option<f64>,
    #[serde(default)]
    pub sparkline_7d: Sparkline,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenLinks {
    #[serde(default)]
    pub homepage: Vec<String>,
    #[serde(default)]
    pub twitter_screen_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenImage {
    #[serde(default)]
    pub large: Option<String>,
}

/// Per-token detail feed.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenOverview {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub description: BTreeMap<String, String>,
    #[serde(default)]
    pub links: TokenLinks,
    #[serde(default)]
    pub image: TokenImage,
    #[serde(default)]
    pub platforms: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub market_data: MarketData,
}

const HOUR_MS: i64 = 60 * 60 * 1000;

impl From<TokenOverview> for TokenUpdate {
    fn from(overview: TokenOverview) -> Self {
        // Hourly samples ending now
        let samples = overview.market_data.sparkline_7d.price;
        let end = Utc::now().timestamp_millis();
        let count = samples.len() as i64;
        let sparkline = samples
            .into_iter()
            .enumerate()
            .map(|(i, price)| PricePoint {
                timestamp: end - (count - 1 - i as i64) * HOUR_MS,
                price,
            })
            .collect();

        let address = overview
            .platforms
            .into_values()
            .flatten()
            .find(|address| !address.trim().is_empty());

        TokenUpdate {
            id: overview.id,
            symbol: Some(overview.symbol),
            name: Some(overview.name),
            price: overview.market_data.current_price.usd,
            market_cap: overview.market_data.market_cap.usd,
            market_cap_rank: overview.market_cap_rank,
            volume_24h: overview.market_data.total_volume.usd,
            change_24h: overview.market_data.price_change_percentage_24h,
            change_7d: overview.market_data.price_change_percentage_7d,
            sparkline_7d: Some(sparkline),
            address,
            description: overview.description.get("en").cloned(),
            website: overview.links.homepage.into_iter().find(|url| !url.is_empty()),
            twitter: overview.links.twitter_screen_name,
            logo: overview.image.large,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendingToken {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub score: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingEntry {
    pub item: TrendingToken,
}

#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    pub coins: Vec<TrendingEntry>,
}

#[derive(Debug, Deserialize)]
pub struct MarketChartResponse {
    /// `[unix_ms, price]` pairs.
    pub prices: Vec<(f64, f64)>,
}

impl From<MarketChartResponse> for Vec<PricePoint> {
    fn from(chart: MarketChartResponse) -> Self {
        chart
            .prices
            .into_iter()
            .map(|(timestamp, price)| PricePoint {
                timestamp: timestamp as i64,
                price,
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub name: String,
    pub unit: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub rates: BTreeMap<String, ExchangeRate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_protocol_list_item_to_update() {
        let item: ProtocolSummary = serde_json::from_value(json!({
            "id": "2141",
            "name": "Jupiter",
            "slug": "jupiter",
            "chains": ["Solana"],
            "tvl": 500000000.0,
            "change_1d": 1.5,
            "chainTvls": { "Solana": 500000000.0 },
            "parentProtocol": "parent#jupiter"
        }))
        .unwrap();

        let update = ProtocolUpdate::from(&item);
        assert_eq!(update.slug, "jupiter");
        assert_eq!(update.tvl, Some(500000000.0));
        assert_eq!(update.change_1d, Some(1.5));
        assert_eq!(update.parent_protocol.as_deref(), Some("parent#jupiter"));
        assert_eq!(update.chains, Some(vec!["Solana".to_string()]));
    }

    #[test]
    fn test_protocol_overview_history() {
        let overview: ProtocolOverview = serde_json::from_value(json!({
            "name": "Jupiter",
            "description": "Swap aggregator",
            "github": ["jup-ag"],
            "tvl": [
                { "date": 1700000000, "totalLiquidityUSD": 10.0 },
                { "date": 1700086400, "totalLiquidityUSD": 12.0 }
            ],
            "currentChainTvls": { "Solana": 12.0 }
        }))
        .unwrap();

        let update = overview.into_update("jupiter");
        assert_eq!(update.tvl, Some(12.0));
        assert_eq!(update.tvl_history.as_ref().map(Vec::len), Some(2));
        assert_eq!(update.github, Some(vec!["jup-ag".to_string()]));
    }

    #[test]
    fn test_token_overview_to_update() {
        let overview: TokenOverview = serde_json::from_value(json!({
            "id": "usd-coin",
            "symbol": "usdc",
            "name": "USDC",
            "market_cap_rank": 7,
            "description": { "en": "A stablecoin" },
            "links": { "homepage": ["", "https://www.circle.com"], "twitter_screen_name": "circle" },
            "image": { "large": "https://img/usdc.png" },
            "platforms": { "ethereum": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48" },
            "market_data": {
                "current_price": { "usd": 1.0 },
                "sparkline_7d": { "price": [1.0, 0.999, 1.001] }
            }
        }))
        .unwrap();

        let update = TokenUpdate::from(overview);
        assert_eq!(update.price, Some(1.0));
        assert_eq!(update.website.as_deref(), Some("https://www.circle.com"));
        assert_eq!(update.description.as_deref(), Some("A stablecoin"));
        assert!(update.address.is_some());

        let sparkline = update.sparkline_7d.unwrap();
        assert_eq!(sparkline.len(), 3);
        assert_eq!(sparkline[2].timestamp - sparkline[0].timestamp, 2 * HOUR_MS);
    }

    #[test]
    fn test_market_chart_points() {
        let chart: MarketChartResponse =
            serde_json::from_value(json!({ "prices": [[1700000000000.0, 1.25]] })).unwrap();
        let points: Vec<PricePoint> = chart.into();

        assert_eq!(
            points,
            vec![PricePoint {
                timestamp: 1_700_000_000_000,
                price: 1.25
            }]
        );
    }
}
