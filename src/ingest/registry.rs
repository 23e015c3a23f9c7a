// src/ingest/registry.rs
//! Build-time list of adapters.
//!
//! Public adapters are always registered. Private (credentialed) adapters are
//! appended after them when `enable_private` is set; they self-disable when
//! their credentials are missing. Registration order is also the dedup
//! priority in the aggregator.

use std::sync::Arc;

use crate::ingest::config::{Credentials, PipelineConfig};
use crate::ingest::http_client;
use crate::ingest::providers::{
    AcledProvider, DigestProvider, FirmsProvider, GdeltProvider, PolymarketProvider, RssProvider,
    SafeAirspaceProvider, UsgsProvider, XSocialProvider, YahooFinanceProvider,
};
use crate::ingest::types::{SourceProvider, SourceTier};

pub struct SourceRegistry {
    sources: Vec<Arc<dyn SourceProvider>>,
    polymarket: Arc<PolymarketProvider>,
    yahoo: Arc<YahooFinanceProvider>,
}

impl SourceRegistry {
    pub fn from_config(cfg: &PipelineConfig, creds: &Credentials) -> Self {
        let client = http_client(&cfg.user_agent, cfg.http_timeout());
        let health = cfg.health_timeout();

        let polymarket = Arc::new(PolymarketProvider::new(client.clone(), health));
        let yahoo = Arc::new(YahooFinanceProvider::new(client.clone(), health));

        let mut sources: Vec<Arc<dyn SourceProvider>> = vec![
            Arc::new(UsgsProvider::new(client.clone(), health)),
            Arc::new(GdeltProvider::new(client.clone(), health)),
            Arc::new(RssProvider::new(cfg.rss_feeds.clone(), client.clone(), health)),
            Arc::new(AcledProvider::new(
                creds.acled_api_key.clone(),
                creds.acled_email.clone(),
                client.clone(),
            )),
            polymarket.clone(),
            yahoo.clone(),
            Arc::new(FirmsProvider::new(creds.firms_map_key.clone(), client.clone())),
            Arc::new(SafeAirspaceProvider::new(client.clone(), health)),
        ];

        if cfg.enable_private {
            // LLM fallback needs its own client: the shared one caps at http_timeout
            let llm_client = http_client(&cfg.user_agent, cfg.llm_timeout());
            sources.push(Arc::new(XSocialProvider::new(
                creds.x_bearer_token.clone(),
                creds.xai_api_key.clone(),
                llm_client,
                cfg.llm_timeout(),
            )));
            sources.push(Arc::new(DigestProvider::new(cfg.digest_dir.clone())));
        }

        tracing::info!(
            target: "ingest",
            sources = sources.len(),
            private = cfg.enable_private,
            "source registry built"
        );

        Self {
            sources,
            polymarket,
            yahoo,
        }
    }

    pub fn all(&self) -> &[Arc<dyn SourceProvider>] {
        &self.sources
    }

    pub fn public(&self) -> Vec<Arc<dyn SourceProvider>> {
        self.sources
            .iter()
            .filter(|s| s.tier() == SourceTier::Public)
            .cloned()
            .collect()
    }

    pub fn polymarket(&self) -> Arc<PolymarketProvider> {
        self.polymarket.clone()
    }

    pub fn yahoo(&self) -> Arc<YahooFinanceProvider> {
        self.yahoo.clone()
    }
}
