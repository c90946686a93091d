//! Cache key construction.
//!
//! Every key is `namespace:param[:param...]` and is a pure function of its
//! inputs. Call sites must go through these constructors so that independent
//! readers of the same logical resource hit the same store entry.

use std::fmt;

/// A canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Unified protocol record, keyed by the normalized slug.
    pub fn protocol(slug: &str) -> Self {
        Self(format!("defi:protocol:{}", normalize_protocol_id(slug)))
    }

    pub fn protocol_list() -> Self {
        Self("defi:protocols".to_string())
    }

    /// Unified token record, keyed by the normalized id or contract address.
    pub fn token(id: &str) -> Self {
        Self(format!("token:detail:{}", normalize_token_id(id)))
    }

    pub fn token_markets(page: u32) -> Self {
        Self(format!("token:markets:{page}"))
    }

    pub fn trending_tokens() -> Self {
        Self("trending:tokens".to_string())
    }

    pub fn price_history(id: &str, days: u32) -> Self {
        Self(format!("price-history:{}:{days}", normalize_token_id(id)))
    }

    pub fn stablecoins() -> Self {
        Self("global:stablecoin".to_string())
    }

    pub fn exchange_rates() -> Self {
        Self("global:exchange-rates".to_string())
    }

    /// Wraps a raw key received from an operator (admin invalidation).
    pub fn raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Resolves a protocol id or slug to the base entity it belongs to.
///
/// Parent protocols are published as `parent#<slug>`; they share a record
/// with `<slug>`. Casing and surrounding whitespace are not significant.
///
/// ```
/// use marketcache::keys::normalize_protocol_id;
///
/// assert_eq!(normalize_protocol_id("parent#Jupiter"), "jupiter");
/// assert_eq!(normalize_protocol_id("  Aave V3 "), "aave-v3");
/// assert_eq!(normalize_protocol_id("uniswap-v3"), "uniswap-v3");
/// ```
pub fn normalize_protocol_id(id: &str) -> String {
    let lowered = id.trim().to_ascii_lowercase();
    let base = lowered.strip_prefix("parent#").unwrap_or(&lowered);
    base.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Normalizes a token id or contract address.
///
/// EVM addresses (`0x...`) are case-insensitive and are lowercased. Anything
/// else keeps its case: base58 mint addresses are case-sensitive.
///
/// ```
/// use marketcache::keys::normalize_token_id;
///
/// assert_eq!(
///     normalize_token_id(" 0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48 "),
///     "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
/// );
/// assert_eq!(
///     normalize_token_id("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"),
///     "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"
/// );
/// ```
pub fn normalize_token_id(id: &str) -> String {
    let trimmed = id.trim();
    let is_evm = trimmed.len() > 2
        && trimmed
            .get(..2)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("0x"));
    if is_evm {
        trimmed.to_ascii_lowercase()
    } else {
        trimmed.to_string()
    }
}
