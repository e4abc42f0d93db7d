//! Live auction price cache
//!
//! The external refresher pushes KAMIS quote batches here; the simulator
//! reads the median synchronously. An empty cache is the documented
//! "use scenario default" signal, never an error.

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

#[derive(Default)]
struct PriceState {
    apple_price: Option<f64>,
    /// Unix milliseconds of the last accepted update
    updated_at: Option<i64>,
    raw_count: usize,
}

/// Cache status for the observability surface
#[derive(Debug, Clone, Serialize)]
pub struct PriceCacheStatus {
    pub apple_price: Option<f64>,
    pub updated_at: Option<i64>,
    pub raw_count: usize,
}

/// In-memory apple price cache
#[derive(Default)]
pub struct PriceCache {
    state: RwLock<PriceState>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from a batch of per-kg quotes. The median is kept so a single
    /// outlier auction lot cannot skew the simulated price. Returns the
    /// number of quotes accepted.
    pub fn update(&self, quotes: &[f64]) -> usize {
        let mut prices: Vec<f64> = quotes
            .iter()
            .copied()
            .filter(|p| p.is_finite() && *p > 0.0)
            .collect();
        if prices.is_empty() {
            return 0;
        }
        prices.sort_by(|a, b| a.partial_cmp(b).expect("finite prices"));
        let mid = prices.len() / 2;
        let median = if prices.len() % 2 == 1 {
            prices[mid]
        } else {
            (prices[mid - 1] + prices[mid]) / 2.0
        };

        let mut state = self.state.write();
        state.apple_price = Some(median);
        state.updated_at = Some(Utc::now().timestamp_millis());
        state.raw_count = prices.len();
        info!(price = median, quotes = prices.len(), "price cache updated");
        prices.len()
    }

    /// Current cached price per kg, if any quote has arrived.
    pub fn apple_price(&self) -> Option<f64> {
        self.state.read().apple_price
    }

    pub fn status(&self) -> PriceCacheStatus {
        let state = self.state.read();
        PriceCacheStatus {
            apple_price: state.apple_price,
            updated_at: state.updated_at,
            raw_count: state.raw_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_is_absent() {
        let cache = PriceCache::new();
        assert!(cache.apple_price().is_none());
        assert_eq!(cache.update(&[]), 0);
        assert!(cache.apple_price().is_none());
    }

    #[test]
    fn test_median_resists_outliers() {
        let cache = PriceCache::new();
        cache.update(&[5000.0, 5200.0, 4900.0, 50_000.0, 5100.0]);
        assert_eq!(cache.apple_price(), Some(5100.0));
    }

    #[test]
    fn test_even_count_takes_midpoint() {
        let cache = PriceCache::new();
        cache.update(&[4000.0, 6000.0]);
        assert_eq!(cache.apple_price(), Some(5000.0));
    }

    #[test]
    fn test_invalid_quotes_filtered() {
        let cache = PriceCache::new();
        let accepted = cache.update(&[-100.0, 0.0, f64::NAN, 5500.0]);
        assert_eq!(accepted, 1);
        assert_eq!(cache.apple_price(), Some(5500.0));
    }
}
