pub mod http;
pub mod models;

pub use http::HttpProvider;
pub use models::{
    ExchangeRates, ProtocolSummary, Stablecoin, TokenMarket, TrendingToken,
};

use async_trait::async_trait;
use marketcache::domain::{PricePoint, ProtocolUpdate, TokenUpdate};
use shared::Result;

/// Port for the rate-limited market-data APIs behind the cache.
///
/// Implementations return `Error::NotFound` for unknown entities and
/// `Error::Upstream` for every other failure.
#[async_trait]
pub trait MarketDataProvider: Send + Sync + 'static {
    async fn protocol_list(&self) -> Result<Vec<ProtocolSummary>>;

    async fn protocol_overview(&self, slug: &str) -> Result<ProtocolUpdate>;

    async fn stablecoins(&self) -> Result<Vec<Stablecoin>>;

    async fn token_markets(&self, page: u32) -> Result<Vec<TokenMarket>>;

    async fn token_overview(&self, id: &str) -> Result<TokenUpdate>;

    async fn trending_tokens(&self) -> Result<Vec<TrendingToken>>;

    async fn price_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>>;

    async fn exchange_rates(&self) -> Result<ExchangeRates>;
}
