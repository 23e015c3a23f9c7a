//! # Aggregator
//! Fan-out over every registered source, merged into one newest-first list.
//!
//! Each source runs on its own task under an outer timeout. An `Err`, a
//! timeout or a panic is logged, counted in `ingest_provider_errors_total`
//! and contributes nothing; the aggregator itself never fails. Results are
//! deduplicated by id (first source in registration order wins), stably
//! sorted by timestamp, truncated, and cached per option set.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::cache::TtlCache;
use crate::ingest::config::PipelineConfig;
use crate::ingest::types::{CrisisEvent, FetchOptions, SourceProvider, SourceTier};
use crate::ingest::{ensure_metrics_described, sort_newest_first};

pub const EVENTS_CACHE_KEY: &str = "aggregator:events";
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_LIMIT: usize = 200;
const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(35);

/// Row of `GET /api/sources`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub tier: SourceTier,
    pub healthy: bool,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn SourceProvider>>,
    cache: Arc<TtlCache>,
    ttl: Duration,
    default_limit: usize,
    source_timeout: Duration,
    health_timeout: Duration,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn SourceProvider>>, cache: Arc<TtlCache>) -> Self {
        Self {
            sources,
            cache,
            ttl: DEFAULT_TTL,
            default_limit: DEFAULT_LIMIT,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            health_timeout: Duration::from_secs(3),
        }
    }

    pub fn from_config(
        sources: Vec<Arc<dyn SourceProvider>>,
        cache: Arc<TtlCache>,
        cfg: &PipelineConfig,
    ) -> Self {
        Self {
            ttl: Duration::from_millis(cfg.events_ttl_ms),
            default_limit: cfg.default_limit,
            source_timeout: cfg.source_timeout(),
            health_timeout: cfg.health_timeout(),
            ..Self::new(sources, cache)
        }
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn sources(&self) -> &[Arc<dyn SourceProvider>] {
        &self.sources
    }

    /// `aggregator:events` for default options, otherwise the options as
    /// JSON appended to it, so free-text queries cannot collide.
    pub fn cache_key(options: &FetchOptions) -> String {
        if options.is_default() {
            return EVENTS_CACHE_KEY.to_string();
        }
        let encoded = serde_json::to_string(options).unwrap_or_else(|_| format!("{options:?}"));
        format!("{EVENTS_CACHE_KEY}:{encoded}")
    }

    pub async fn fetch_all_events(&self, options: &FetchOptions) -> Arc<Vec<CrisisEvent>> {
        ensure_metrics_described();
        let key = Self::cache_key(options);

        if let Some(hit) = self.cache.get::<Vec<CrisisEvent>>(&key) {
            counter!("aggregator_cache_hits_total").increment(1);
            tracing::debug!(target: "aggregator", %key, events = hit.len(), "cache hit");
            return hit;
        }
        counter!("aggregator_cache_misses_total").increment(1);

        let contributions = self.fan_out(options).await;
        let merged = merge(contributions, options.limit.unwrap_or(self.default_limit));

        histogram!("aggregator_events_returned").record(merged.len() as f64);
        gauge!("aggregator_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(target: "aggregator", %key, events = merged.len(), "aggregation complete");

        let merged = Arc::new(merged);
        self.cache.set(key, merged.clone(), self.ttl);
        merged
    }

    /// Drop every cached event list.
    pub fn invalidate(&self) -> usize {
        self.cache.invalidate(EVENTS_CACHE_KEY)
    }

    /// One contribution per source, in registration order.
    async fn fan_out(&self, options: &FetchOptions) -> Vec<Vec<CrisisEvent>> {
        let handles = self.sources.iter().map(|src| {
            let src = Arc::clone(src);
            let opts = options.clone();
            let limit = self.source_timeout;
            tokio::spawn(async move { tokio::time::timeout(limit, src.fetch(&opts)).await })
        });
        let joined = join_all(handles).await;

        self.sources
            .iter()
            .zip(joined)
            .map(|(src, res)| {
                let id = src.id();
                let failure = match res {
                    Ok(Ok(Ok(events))) => {
                        tracing::debug!(target: "aggregator", provider = id, events = events.len(), "source ok");
                        return events;
                    }
                    Ok(Ok(Err(e))) => format!("{e:#}"),
                    Ok(Err(_elapsed)) => format!("timed out after {:?}", self.source_timeout),
                    Err(join) => format!("task failed: {join}"),
                };
                tracing::warn!(target: "aggregator", provider = id, error = %failure, "source failed, contributing nothing");
                counter!("ingest_provider_errors_total", "source" => id.to_string()).increment(1);
                Vec::new()
            })
            .collect()
    }

    /// Concurrent liveness probes; a probe that hangs past the health timeout
    /// reads as unhealthy.
    pub async fn health_report(&self) -> Vec<SourceStatus> {
        let probes = self.sources.iter().map(|src| async move {
            let healthy = tokio::time::timeout(self.health_timeout, src.health_check())
                .await
                .unwrap_or(false);
            SourceStatus {
                id: src.id().to_string(),
                name: src.name().to_string(),
                tier: src.tier(),
                healthy,
            }
        });
        join_all(probes).await
    }
}

/// First occurrence of an id wins; then newest first (stable) and truncate.
pub fn merge(contributions: Vec<Vec<CrisisEvent>>, limit: usize) -> Vec<CrisisEvent> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<CrisisEvent> = contributions
        .into_iter()
        .flatten()
        .filter(|ev| seen.insert(ev.id.clone()))
        .collect();
    sort_newest_first(&mut out);
    out.truncate(limit);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{EventCategory, ThreatLevel};
    use chrono::{TimeZone, Utc};

    fn ev(id: &str, title: &str, secs: i64) -> CrisisEvent {
        CrisisEvent {
            id: id.into(),
            title: title.into(),
            summary: title.into(),
            category: EventCategory::Conflict,
            level: ThreatLevel::Low,
            location: None,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            source: "test".into(),
            source_tier: SourceTier::Public,
            url: None,
            actor: None,
            entities: None,
        }
    }

    #[test]
    fn merge_dedups_first_wins_then_sorts() {
        let a = vec![ev("x:1", "from a", 10), ev("x:2", "two", 30)];
        let b = vec![ev("x:1", "from b", 50), ev("x:3", "three", 20)];
        let out = merge(vec![a, b], 200);
        let ids: Vec<_> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["x:2", "x:3", "x:1"]);
        assert_eq!(out[2].title, "from a");
    }

    #[test]
    fn merge_truncates() {
        let a = (0..10).map(|i| ev(&format!("x:{i}"), "t", i)).collect();
        assert_eq!(merge(vec![a], 3).len(), 3);
    }

    #[test]
    fn cache_keys_distinguish_options() {
        assert_eq!(Aggregator::cache_key(&FetchOptions::default()), EVENTS_CACHE_KEY);
        let q = FetchOptions {
            query: Some("iran".into()),
            ..Default::default()
        };
        let l = FetchOptions {
            limit: Some(5),
            ..Default::default()
        };
        let kq = Aggregator::cache_key(&q);
        let kl = Aggregator::cache_key(&l);
        assert_ne!(kq, kl);
        assert!(kq.starts_with("aggregator:events:"));
        assert_eq!(kq, Aggregator::cache_key(&q.clone()));
    }

    #[test]
    fn query_text_cannot_forge_another_key() {
        let since = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let real = FetchOptions {
            query: Some("iran".into()),
            since: Some(since),
            limit: Some(5),
        };
        let forged = FetchOptions {
            query: Some(format!("iran|since={}|limit=5", since.to_rfc3339())),
            ..Default::default()
        };
        assert_ne!(Aggregator::cache_key(&real), Aggregator::cache_key(&forged));
    }
}
