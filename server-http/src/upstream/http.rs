use super::MarketDataProvider;
use super::models::{
    ExchangeRates, MarketChartResponse, ProtocolOverview, ProtocolSummary, Stablecoin,
    StablecoinsResponse, TokenMarket, TokenOverview, TrendingResponse, TrendingToken,
};
use async_trait::async_trait;
use marketcache::domain::{PricePoint, ProtocolUpdate, TokenUpdate};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::config::UpstreamConfig;
use shared::{Error, Result};
use tracing::debug;

const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const MARKETS_PAGE_SIZE: &str = "100";

/// `MarketDataProvider` over the public DefiLlama and CoinGecko HTTP APIs.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    http: Client,
    config: UpstreamConfig,
}

impl HttpProvider {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build http client: {}", e)))?;

        Ok(Self { http, config })
    }

    async fn fetch<T: DeserializeOwned>(&self, url: String, query: &[(&str, &str)]) -> Result<T> {
        let mut request = self.http.get(&url).query(query);
        if url.starts_with(&self.config.market_api_url) {
            if let Some(key) = &self.config.market_api_key {
                request = request.header(API_KEY_HEADER, key);
            }
        }

        debug!("Fetching {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request to {} failed: {}", url, e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| Error::Upstream(format!("invalid payload from {}: {}", url, e))),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(Error::Upstream(format!("rate limited by {}", url)))
            }
            status => Err(Error::Upstream(format!("{} returned {}", url, status))),
        }
    }

    fn llama(&self, path: &str) -> String {
        format!("{}{}", self.config.llama_api_url, path)
    }

    fn market(&self, path: &str) -> String {
        format!("{}{}", self.config.market_api_url, path)
    }
}

#[async_trait]
impl MarketDataProvider for HttpProvider {
    async fn protocol_list(&self) -> Result<Vec<ProtocolSummary>> {
        self.fetch(self.llama("/protocols"), &[]).await
    }

    async fn protocol_overview(&self, slug: &str) -> Result<ProtocolUpdate> {
        let overview: ProtocolOverview = self
            .fetch(self.llama(&format!("/protocol/{}", slug)), &[])
            .await?;
        Ok(overview.into_update(slug))
    }

    async fn stablecoins(&self) -> Result<Vec<Stablecoin>> {
        let url = format!("{}/stablecoins", self.config.stablecoin_api_url);
        let response: StablecoinsResponse = self.fetch(url, &[("includePrices", "true")]).await?;
        Ok(response.pegged_assets)
    }

    async fn token_markets(&self, page: u32) -> Result<Vec<TokenMarket>> {
        let page = page.to_string();
        self.fetch(
            self.market("/coins/markets"),
            &[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", MARKETS_PAGE_SIZE),
                ("page", page.as_str()),
                ("price_change_percentage", "24h,7d"),
            ],
        )
        .await
    }

    async fn token_overview(&self, id: &str) -> Result<TokenUpdate> {
        let overview: TokenOverview = self
            .fetch(
                self.market(&format!("/coins/{}", id)),
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("community_data", "false"),
                    ("developer_data", "false"),
                    ("sparkline", "true"),
                ],
            )
            .await?;
        Ok(overview.into())
    }

    async fn trending_tokens(&self) -> Result<Vec<TrendingToken>> {
        let response: TrendingResponse = self.fetch(self.market("/search/trending"), &[]).await?;
        Ok(response.coins.into_iter().map(|entry| entry.item).collect())
    }

    async fn price_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>> {
        let days = days.to_string();
        let chart: MarketChartResponse = self
            .fetch(
                self.market(&format!("/coins/{}/market_chart", id)),
                &[("vs_currency", "usd"), ("days", days.as_str())],
            )
            .await?;
        Ok(chart.into())
    }

    async fn exchange_rates(&self) -> Result<ExchangeRates> {
        self.fetch(self.market("/exchange_rates"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> UpstreamConfig {
        UpstreamConfig {
            llama_api_url: "https://api.llama.fi".to_string(),
            stablecoin_api_url: "https://stablecoins.llama.fi".to_string(),
            market_api_url: "https://api.coingecko.com/api/v3".to_string(),
            market_api_key: None,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_urls() {
        let provider = HttpProvider::new(config()).unwrap();
        assert_eq!(provider.llama("/protocols"), "https://api.llama.fi/protocols");
        assert_eq!(
            provider.market("/coins/markets"),
            "https://api.coingecko.com/api/v3/coins/markets"
        );
    }
}
