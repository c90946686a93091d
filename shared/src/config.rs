use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Which `KvStore` implementation backs the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis(String), // connection url
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub max_entries: u64,
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub llama_api_url: String,
    pub stablecoin_api_url: String,
    pub market_api_url: String,
    pub market_api_key: Option<String>,
    pub request_timeout: Duration,
}

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub allowed_origins: Vec<String>,
    pub store: StoreConfig,
    pub producer_timeout: Duration,
    pub upstream: UpstreamConfig,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_MAX_ENTRIES: u64 = 100_000;
    const DEFAULT_PRODUCER_TIMEOUT_MS: u64 = 15_000;
    const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 10_000;
    const DEFAULT_LLAMA_API_URL: &str = "https://api.llama.fi";
    const DEFAULT_STABLECOIN_API_URL: &str = "https://stablecoins.llama.fi";
    const DEFAULT_MARKET_API_URL: &str = "https://api.coingecko.com/api/v3";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let store_backend = match lookup("MARKETCACHE_STORE").as_deref() {
            Some("redis") => match lookup("MARKETCACHE_REDIS_URL") {
                Some(url) => StoreBackend::Redis(url),
                None => {
                    warn!("MARKETCACHE_STORE=redis but MARKETCACHE_REDIS_URL is not set, using in-memory store");
                    StoreBackend::Memory
                }
            },
            Some("memory") | None => StoreBackend::Memory,
            Some(other) => {
                warn!("Unknown MARKETCACHE_STORE '{}', using in-memory store", other);
                StoreBackend::Memory
            }
        };

        let market_api_key = lookup("MARKETCACHE_MARKET_API_KEY").filter(|key| !key.trim().is_empty());
        if market_api_key.is_none() {
            warn!("MARKETCACHE_MARKET_API_KEY not set, market data requests are unauthenticated and heavily rate-limited");
        }

        Self {
            host: lookup("MARKETCACHE_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&lookup, "MARKETCACHE_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            allowed_origins: lookup("MARKETCACHE_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            store: StoreConfig {
                backend: store_backend,
                max_entries: parse_or(&lookup, "MARKETCACHE_MAX_ENTRIES", Self::DEFAULT_MAX_ENTRIES),
            },
            producer_timeout: Duration::from_millis(parse_or(
                &lookup,
                "MARKETCACHE_PRODUCER_TIMEOUT_MS",
                Self::DEFAULT_PRODUCER_TIMEOUT_MS,
            )),
            upstream: UpstreamConfig {
                llama_api_url: lookup("MARKETCACHE_LLAMA_API_URL")
                    .unwrap_or_else(|| Self::DEFAULT_LLAMA_API_URL.to_string()),
                stablecoin_api_url: lookup("MARKETCACHE_STABLECOIN_API_URL")
                    .unwrap_or_else(|| Self::DEFAULT_STABLECOIN_API_URL.to_string()),
                market_api_url: lookup("MARKETCACHE_MARKET_API_URL")
                    .unwrap_or_else(|| Self::DEFAULT_MARKET_API_URL.to_string()),
                market_api_key,
                request_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "MARKETCACHE_UPSTREAM_TIMEOUT_MS",
                    Self::DEFAULT_UPSTREAM_TIMEOUT_MS,
                )),
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using default {}", raw, name, default);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.max_entries, 100_000);
        assert_eq!(config.allowed_origins, vec!["*".to_string()]);
        assert_eq!(config.producer_timeout, Duration::from_secs(15));
        assert!(config.upstream.market_api_key.is_none());
    }

    #[test]
    fn test_redis_backend_requires_url() {
        let config = config_from(&[("MARKETCACHE_STORE", "redis")]);
        assert_eq!(config.store.backend, StoreBackend::Memory);

        let config = config_from(&[
            ("MARKETCACHE_STORE", "redis"),
            ("MARKETCACHE_REDIS_URL", "redis://127.0.0.1:6379"),
        ]);
        assert_eq!(
            config.store.backend,
            StoreBackend::Redis("redis://127.0.0.1:6379".to_string())
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("MARKETCACHE_HTTP_PORT", "not-a-port"),
            ("MARKETCACHE_PRODUCER_TIMEOUT_MS", "2500"),
            ("MARKETCACHE_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ]);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.producer_timeout, Duration::from_millis(2500));
        assert_eq!(config.allowed_origins.len(), 2);
        assert_eq!(config.allowed_origins[1], "https://b.example");
    }
}
