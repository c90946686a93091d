use crate::upstream::{
    ExchangeRates, MarketDataProvider, ProtocolSummary, Stablecoin, TokenMarket, TrendingToken,
};
use marketcache::domain::{
    FeedSource, PricePoint, ProtocolUpdate, TokenUpdate, UnifiedEntity, UnifiedProtocolData,
    UnifiedTokenData,
};
use marketcache::keys::{normalize_protocol_id, normalize_token_id};
use marketcache::{populate_behind, CacheKey, EntityCache, ReadThroughCache};
use shared::{ttl, Error, Result, TtlSecs};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

pub const MAX_HISTORY_DAYS: u32 = 365;

/// Market data endpoints, each routed through the cache layer.
#[derive(Clone)]
pub struct MarketDataService {
    provider: Arc<dyn MarketDataProvider>,
    cache: ReadThroughCache,
    protocols: EntityCache<UnifiedProtocolData>,
    tokens: EntityCache<UnifiedTokenData>,
}

impl MarketDataService {
    pub fn new(provider: Arc<dyn MarketDataProvider>, cache: ReadThroughCache) -> Self {
        let protocols = EntityCache::new(cache.store());
        let tokens = EntityCache::new(cache.store());
        Self {
            provider,
            cache,
            protocols,
            tokens,
        }
    }

    /// Protocol list. A fresh fetch also refreshes every protocol record in
    /// the background.
    pub async fn protocols(&self) -> Result<Vec<ProtocolSummary>> {
        let provider = Arc::clone(&self.provider);
        let records = self.protocols.clone();

        self.cache
            .with_cache(
                &CacheKey::protocol_list(),
                ttl::PROTOCOL_LIST,
                move || async move {
                    let list = provider.protocol_list().await?;
                    let updates: Vec<ProtocolUpdate> = list.iter().map(ProtocolUpdate::from).collect();
                    populate_behind(records, updates, FeedSource::List, ttl::PROTOCOL);
                    Ok(list)
                },
                None,
            )
            .await
    }

    pub async fn protocol(&self, slug: &str) -> Result<UnifiedProtocolData> {
        let slug = normalize_protocol_id(slug);
        if slug.is_empty() {
            return Err(Error::InvalidKey(slug));
        }

        let provider = Arc::clone(&self.provider);
        let fetch_slug = slug.clone();
        unified(&self.cache, &self.protocols, &slug, ttl::PROTOCOL, move || async move {
            provider.protocol_overview(&fetch_slug).await
        })
        .await
    }

    pub async fn stablecoins(&self) -> Result<Vec<Stablecoin>> {
        let provider = Arc::clone(&self.provider);
        self.cache
            .with_cache(
                &CacheKey::stablecoins(),
                ttl::STABLECOIN,
                move || async move { provider.stablecoins().await },
                Some(Vec::new()),
            )
            .await
    }

    pub async fn exchange_rates(&self) -> Result<ExchangeRates> {
        let provider = Arc::clone(&self.provider);
        self.cache
            .with_cache(
                &CacheKey::exchange_rates(),
                ttl::EXCHANGE_RATES,
                move || async move { provider.exchange_rates().await },
                None,
            )
            .await
    }

    /// One page of the token markets list. A fresh fetch also refreshes the
    /// listed token records in the background.
    pub async fn tokens(&self, page: u32) -> Result<Vec<TokenMarket>> {
        if page == 0 {
            return Err(Error::InvalidInput(format!("page must be at least 1, got {}", page)));
        }

        let provider = Arc::clone(&self.provider);
        let records = self.tokens.clone();

        self.cache
            .with_cache(
                &CacheKey::token_markets(page),
                ttl::TOKEN_MARKETS,
                move || async move {
                    let rows = provider.token_markets(page).await?;
                    let updates: Vec<TokenUpdate> = rows.iter().map(TokenUpdate::from).collect();
                    populate_behind(records, updates, FeedSource::List, ttl::TOKEN);
                    Ok(rows)
                },
                None,
            )
            .await
    }

    pub async fn trending_tokens(&self) -> Result<Vec<TrendingToken>> {
        let provider = Arc::clone(&self.provider);
        self.cache
            .with_cache(
                &CacheKey::trending_tokens(),
                ttl::TRENDING,
                move || async move { provider.trending_tokens().await },
                Some(Vec::new()),
            )
            .await
    }

    pub async fn token(&self, id: &str) -> Result<UnifiedTokenData> {
        let id = normalize_token_id(id);
        if id.is_empty() {
            return Err(Error::InvalidKey(id));
        }

        let provider = Arc::clone(&self.provider);
        let fetch_id = id.clone();
        unified(&self.cache, &self.tokens, &id, ttl::TOKEN, move || async move {
            provider.token_overview(&fetch_id).await
        })
        .await
    }

    pub async fn price_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>> {
        let id = normalize_token_id(id);
        if id.is_empty() {
            return Err(Error::InvalidKey(id));
        }
        if days == 0 || days > MAX_HISTORY_DAYS {
            return Err(Error::InvalidInput(format!(
                "days must be within 1..={}, got {}",
                MAX_HISTORY_DAYS, days
            )));
        }

        let provider = Arc::clone(&self.provider);
        let fetch_id = id.clone();
        self.cache
            .with_cache(
                &CacheKey::price_history(&id, days),
                ttl::PRICE_HISTORY,
                move || async move { provider.price_history(&fetch_id, days).await },
                Some(Vec::new()),
            )
            .await
    }
}

impl std::fmt::Debug for MarketDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Serves a unified record that already carries overview data; otherwise
/// fetches the overview once for all concurrent callers, merges it and
/// returns the merged record. The overview is merged under the requested id,
/// not the id the provider reports. A list-only record is served when the
/// overview fetch fails.
async fn unified<E, F, Fut>(
    cache: &ReadThroughCache,
    records: &EntityCache<E>,
    id: &str,
    ttl: TtlSecs,
    fetch: F,
) -> Result<E>
where
    E: UnifiedEntity,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<E::Update>> + Send + 'static,
{
    let existing = records.get(id).await;
    if let Some(record) = &existing {
        if record.data_source().has_overview() {
            return Ok(record.clone());
        }
    }

    let merger = records.clone();
    let pinned = id.to_string();
    let fetched = cache
        .coalesce(&E::cache_key(id), move || async move {
            let mut update = fetch().await?;
            E::pin_update(&mut update, &pinned);
            merger.merge(update, FeedSource::Overview, ttl).await
        })
        .await;

    match (fetched, existing) {
        (Ok(record), _) => {
            info!("Fetched {} overview for '{}'", E::KIND, id);
            Ok(record)
        }
        (Err(e), Some(record)) => {
            warn!("{} overview for '{}' failed, serving list data: {}", E::KIND, id, e);
            Ok(record)
        }
        (Err(e), None) => Err(e),
    }
}
