//! Rate table caching with TTL support.

use std::sync::Arc;

use chrono::Duration;
use converter_common::{ExchangeRateTable, Timestamp};
use dashmap::DashMap;
use tracing::debug;

/// Local store of the latest rate table per base currency.
///
/// Implementations replace entries whole: a reader sees either the previous
/// table or the new one, never a mix.
pub trait LocalRateStore: Send + Sync {
    /// Whether a table for `base_code` is present and still fresh.
    fn has_actual_data(&self, base_code: &str) -> bool;

    /// Store a table under its base currency, replacing any previous one.
    fn save(&self, table: Arc<ExchangeRateTable>);

    /// Get the stored table for `base_code`, fresh or not.
    fn get(&self, base_code: &str) -> Option<Arc<ExchangeRateTable>>;
}

/// Cached table entry.
#[derive(Debug, Clone)]
struct CacheEntry {
    table: Arc<ExchangeRateTable>,
    cached_at: Timestamp,
}

impl CacheEntry {
    fn new(table: Arc<ExchangeRateTable>) -> Self {
        Self {
            table,
            cached_at: converter_common::now(),
        }
    }

    fn is_actual(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => converter_common::is_within(self.cached_at, ttl),
            None => true,
        }
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// How long a stored table counts as actual; `None` keeps it actual
    /// until a forced reload replaces it.
    pub ttl: Option<Duration>,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::seconds(60)),
        }
    }
}

/// Thread-safe in-memory rate cache keyed by base currency code.
pub struct RateCache {
    cache: DashMap<String, CacheEntry>,
    config: RateCacheConfig,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
        }
    }

    /// Clear all cached tables.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries in cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict entries that are no longer actual.
    pub fn evict_expired(&self) {
        let ttl = self.config.ttl;
        self.cache.retain(|_, entry| entry.is_actual(ttl));
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.cache.len();
        let actual = self
            .cache
            .iter()
            .filter(|e| e.is_actual(self.config.ttl))
            .count();

        CacheStats {
            total_entries: total,
            actual_entries: actual,
            stale_entries: total - actual,
        }
    }
}

impl LocalRateStore for RateCache {
    fn has_actual_data(&self, base_code: &str) -> bool {
        match self.cache.get(base_code) {
            Some(entry) if entry.is_actual(self.config.ttl) => {
                debug!(base = base_code, "Cache hit");
                true
            }
            Some(_) => {
                debug!(base = base_code, "Cache entry stale");
                false
            }
            None => {
                debug!(base = base_code, "Cache miss");
                false
            }
        }
    }

    fn save(&self, table: Arc<ExchangeRateTable>) {
        let key = table.base().code().to_string();
        debug!(base = %key, targets = table.len(), "Caching rate table");
        self.cache.insert(key, CacheEntry::new(table));
    }

    fn get(&self, base_code: &str) -> Option<Arc<ExchangeRateTable>> {
        self.cache.get(base_code).map(|entry| entry.table.clone())
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub actual_entries: usize,
    pub stale_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use converter_common::{Currency, CurrencyRate};
    use rust_decimal_macros::dec;
    use std::thread::sleep;
    use std::time::Duration as StdDuration;

    fn make_table(base: &str, quote: &str) -> Arc<ExchangeRateTable> {
        Arc::new(
            ExchangeRateTable::new(
                Currency::new(base),
                vec![CurrencyRate::new(Currency::new(quote), dec!(0.91))],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_cache_save_and_get() {
        let cache = RateCache::new();
        let table = make_table("USD", "EUR");

        cache.save(table.clone());

        assert!(cache.has_actual_data("USD"));
        let cached = cache.get("USD").unwrap();
        assert!(Arc::ptr_eq(&cached, &table));
    }

    #[test]
    fn test_cache_miss() {
        let cache = RateCache::new();

        assert!(!cache.has_actual_data("USD"));
        assert!(cache.get("USD").is_none());
    }

    #[test]
    fn test_freshness_is_per_base() {
        let cache = RateCache::new();
        cache.save(make_table("USD", "EUR"));

        assert!(cache.has_actual_data("USD"));
        assert!(!cache.has_actual_data("EUR"));
    }

    #[test]
    fn test_cache_expiry() {
        let config = RateCacheConfig {
            ttl: Some(Duration::milliseconds(50)),
        };
        let cache = RateCache::with_config(config);
        cache.save(make_table("USD", "EUR"));

        // Should be actual immediately
        assert!(cache.has_actual_data("USD"));

        sleep(StdDuration::from_millis(60));

        // Stale, but still readable
        assert!(!cache.has_actual_data("USD"));
        assert!(cache.get("USD").is_some());
        assert_eq!(cache.stats().stale_entries, 1);

        cache.evict_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_no_ttl_stays_actual() {
        let cache = RateCache::with_config(RateCacheConfig { ttl: None });
        cache.save(make_table("USD", "EUR"));

        sleep(StdDuration::from_millis(10));

        assert!(cache.has_actual_data("USD"));
    }

    #[test]
    fn test_last_write_wins() {
        let cache = RateCache::new();
        let first = make_table("USD", "EUR");
        let second = make_table("USD", "GBP");

        cache.save(first);
        cache.save(second.clone());

        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.get("USD").unwrap(), &second));
    }

    #[test]
    fn test_concurrent_writers_never_tear() {
        let cache = Arc::new(RateCache::new());
        let handles: Vec<_> = ["EUR", "GBP", "JPY", "CHF"]
            .into_iter()
            .map(|quote| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.save(make_table("USD", quote));
                        let table = cache.get("USD").unwrap();
                        assert_eq!(table.len(), 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("USD").unwrap().base().code(), "USD");
    }

    #[test]
    fn test_cache_clear() {
        let cache = RateCache::new();
        cache.save(make_table("USD", "EUR"));
        cache.save(make_table("GBP", "USD"));

        assert_eq!(cache.len(), 2);

        cache.clear();

        assert_eq!(cache.len(), 0);
    }
}
