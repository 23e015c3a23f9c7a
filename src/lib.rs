// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod actors;
pub mod aggregator;
pub mod api;
pub mod cache;
pub mod classify;
pub mod geocoder;
pub mod ingest;
pub mod markets;
pub mod metrics;
pub mod regions;
pub mod scorer;
pub mod translate;

use std::sync::Arc;
use std::time::Duration;

use crate::aggregator::Aggregator;
use crate::api::AppState;
use crate::cache::TtlCache;
use crate::ingest::config::{Credentials, PipelineConfig};
use crate::ingest::registry::SourceRegistry;
use crate::markets::MarketService;
use crate::translate::{build_translator, TranslationService};

pub use crate::api::create_router;
pub use crate::ingest::types::{CrisisEvent, FetchOptions, SourceProvider};

/// Wire registry, shared cache, aggregator, market read-models and the
/// translation helper into router state.
pub fn build_state(cfg: &PipelineConfig, creds: &Credentials) -> AppState {
    let registry = SourceRegistry::from_config(cfg, creds);
    let cache = Arc::new(TtlCache::new());

    let aggregator = Aggregator::from_config(registry.all().to_vec(), cache.clone(), cfg);
    let markets = MarketService::new(
        registry.yahoo(),
        registry.polymarket(),
        cache,
        Duration::from_millis(cfg.markets_ttl_ms),
    );
    let llm_client = ingest::http_client(&cfg.user_agent, cfg.llm_timeout());
    let translator = TranslationService::new(
        build_translator(creds.google_api_key.clone(), llm_client),
        Duration::from_millis(cfg.translate_ttl_ms),
    );

    tracing::info!(
        translator = translator.provider_name(),
        sources = aggregator.sources().len(),
        "pipeline state ready"
    );

    AppState {
        aggregator: Arc::new(aggregator),
        markets: Arc::new(markets),
        translator: Arc::new(translator),
    }
}
