//! Market read-models: indicator quotes and prediction-market contracts,
//! each cached under its own key in the shared cache.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::ingest::providers::{PolymarketProvider, YahooFinanceProvider};
use crate::ingest::types::{MarketIndicator, PolymarketContract};

pub const INDICATORS_KEY: &str = "indicators";
pub const CONTRACTS_KEY: &str = "polymarket";
pub const DEFAULT_MARKETS_TTL: Duration = Duration::from_secs(300);

pub struct MarketService {
    yahoo: Arc<YahooFinanceProvider>,
    polymarket: Arc<PolymarketProvider>,
    cache: Arc<TtlCache>,
    ttl: Duration,
}

impl MarketService {
    pub fn new(
        yahoo: Arc<YahooFinanceProvider>,
        polymarket: Arc<PolymarketProvider>,
        cache: Arc<TtlCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            yahoo,
            polymarket,
            cache,
            ttl,
        }
    }

    /// Latest indicator quotes. Symbols that fail are simply absent.
    pub async fn indicators(&self) -> Arc<Vec<MarketIndicator>> {
        if let Some(hit) = self.cache.get::<Vec<MarketIndicator>>(INDICATORS_KEY) {
            return hit;
        }
        let fresh = Arc::new(self.yahoo.fetch_indicators().await);
        // an all-failed round is not cached so the next request retries
        if !fresh.is_empty() {
            self.cache.set(INDICATORS_KEY, fresh.clone(), self.ttl);
        }
        fresh
    }

    /// Open crisis contracts; an upstream failure yields an empty list.
    pub async fn contracts(&self) -> Arc<Vec<PolymarketContract>> {
        if let Some(hit) = self.cache.get::<Vec<PolymarketContract>>(CONTRACTS_KEY) {
            return hit;
        }
        match self.polymarket.fetch_contracts().await {
            Ok(list) => {
                let list = Arc::new(list);
                self.cache.set(CONTRACTS_KEY, list.clone(), self.ttl);
                list
            }
            Err(e) => {
                tracing::warn!(target: "markets", error = ?e, "polymarket contracts unavailable");
                Arc::new(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service(cache: Arc<TtlCache>) -> MarketService {
        // unroutable endpoints: any request fails fast
        let client = reqwest::Client::new();
        MarketService::new(
            Arc::new(
                YahooFinanceProvider::new(client.clone(), Duration::from_millis(50))
                    .with_endpoint("http://127.0.0.1:9/chart"),
            ),
            Arc::new(
                PolymarketProvider::new(client, Duration::from_millis(50))
                    .with_endpoint("http://127.0.0.1:9/markets"),
            ),
            cache,
            DEFAULT_MARKETS_TTL,
        )
    }

    #[tokio::test]
    async fn cached_values_are_served_without_upstream() {
        let cache = Arc::new(TtlCache::new());
        let stored = Arc::new(vec![MarketIndicator {
            symbol: "GC=F".into(),
            name: "Gold".into(),
            price: 2300.0,
            change: 12.0,
            change_percent: 0.52,
            timestamp: Utc::now(),
        }]);
        cache.set(INDICATORS_KEY, stored.clone(), DEFAULT_MARKETS_TTL);

        let svc = service(cache);
        assert!(Arc::ptr_eq(&svc.indicators().await, &stored));
    }

    #[tokio::test]
    async fn upstream_failure_is_an_empty_list() {
        let cache = Arc::new(TtlCache::new());
        let svc = service(cache.clone());
        assert!(svc.contracts().await.is_empty());
        assert!(svc.indicators().await.is_empty());
        assert!(cache.is_empty());
    }
}
