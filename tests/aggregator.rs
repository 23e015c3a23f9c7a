// tests/aggregator.rs
//
// Fan-out behaviour with in-process stub sources: dedup priority, partial
// failure, caching and expiry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use crisis_pipeline::aggregator::{Aggregator, EVENTS_CACHE_KEY};
use crisis_pipeline::cache::{ManualClock, TtlCache};
use crisis_pipeline::ingest::config::PipelineConfig;
use crisis_pipeline::ingest::types::{
    CrisisEvent, EventCategory, FetchOptions, SourceProvider, SourceTier, ThreatLevel,
};

enum Behaviour {
    Events(Vec<CrisisEvent>),
    Fail,
    Panic,
    Hang,
}

struct Stub {
    id: &'static str,
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl Stub {
    fn new(id: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            id,
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for Stub {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.id
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> anyhow::Result<Vec<CrisisEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Events(v) => Ok(options.apply(v.clone(), 100)),
            Behaviour::Fail => Err(anyhow::anyhow!("{} upstream returned 503", self.id)),
            Behaviour::Panic => panic!("{} blew up", self.id),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn health_check(&self) -> bool {
        match self.behaviour {
            Behaviour::Events(_) => true,
            Behaviour::Fail | Behaviour::Panic => false,
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                true
            }
        }
    }
}

fn ev(id: &str, source: &str, secs: i64) -> CrisisEvent {
    CrisisEvent {
        id: id.into(),
        title: format!("{id} from {source}"),
        summary: "troops reported near the border".into(),
        category: EventCategory::Military,
        level: ThreatLevel::Medium,
        location: None,
        timestamp: Utc.timestamp_opt(1_749_500_000 + secs, 0).unwrap(),
        source: source.into(),
        source_tier: SourceTier::Public,
        url: None,
        actor: None,
        entities: None,
    }
}

fn as_sources(stubs: &[Arc<Stub>]) -> Vec<Arc<dyn SourceProvider>> {
    stubs
        .iter()
        .map(|s| s.clone() as Arc<dyn SourceProvider>)
        .collect()
}

#[tokio::test]
async fn duplicate_ids_keep_the_earlier_source() {
    let a = Stub::new("a", Behaviour::Events(vec![ev("x:1", "a", 10), ev("x:2", "a", 20)]));
    let b = Stub::new("b", Behaviour::Events(vec![ev("x:1", "b", 99), ev("x:3", "b", 5)]));
    let agg = Aggregator::new(as_sources(&[a, b]), Arc::new(TtlCache::new()));

    let out = agg.fetch_all_events(&FetchOptions::default()).await;
    let ids: Vec<&str> = out.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["x:2", "x:1", "x:3"]);
    assert_eq!(out[1].source, "a");
}

#[tokio::test]
async fn failing_sources_contribute_nothing() {
    let stubs = vec![
        Stub::new("ok1", Behaviour::Events(vec![ev("ok1:1", "ok1", 1)])),
        Stub::new("err", Behaviour::Fail),
        Stub::new("ok2", Behaviour::Events(vec![ev("ok2:1", "ok2", 2)])),
        Stub::new("boom", Behaviour::Panic),
        Stub::new("slow", Behaviour::Hang),
        Stub::new("ok3", Behaviour::Events(vec![ev("ok3:1", "ok3", 3), ev("ok3:2", "ok3", 4)])),
    ];
    let agg = Aggregator::new(as_sources(&stubs), Arc::new(TtlCache::new()))
        .with_source_timeout(Duration::from_millis(200));

    let out = agg.fetch_all_events(&FetchOptions::default()).await;
    let ids: Vec<&str> = out.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["ok3:2", "ok3:1", "ok2:1", "ok1:1"]);
    assert!(stubs.iter().all(|s| s.calls() == 1));
}

#[tokio::test]
async fn all_sources_failing_is_an_empty_list() {
    let stubs = vec![Stub::new("err", Behaviour::Fail), Stub::new("boom", Behaviour::Panic)];
    let agg = Aggregator::new(as_sources(&stubs), Arc::new(TtlCache::new()));
    assert!(agg.fetch_all_events(&FetchOptions::default()).await.is_empty());
}

#[tokio::test]
async fn second_call_within_ttl_is_served_from_cache() {
    let src = Stub::new("a", Behaviour::Events(vec![ev("a:1", "a", 1)]));
    let cache = Arc::new(TtlCache::new());
    let agg = Aggregator::new(as_sources(&[src.clone()]), cache.clone());

    let first = agg.fetch_all_events(&FetchOptions::default()).await;
    let second = agg.fetch_all_events(&FetchOptions::default()).await;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(src.calls(), 1);
    assert!(cache.get::<Vec<CrisisEvent>>(EVENTS_CACHE_KEY).is_some());

    // different options are a different cache entry
    let q = FetchOptions {
        query: Some("a:1".into()),
        ..Default::default()
    };
    let filtered = agg.fetch_all_events(&q).await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(src.calls(), 2);

    assert_eq!(agg.invalidate(), 2);
    agg.fetch_all_events(&FetchOptions::default()).await;
    assert_eq!(src.calls(), 3);
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(TtlCache::with_clock(clock.clone()));
    let src = Stub::new("a", Behaviour::Events(vec![ev("a:1", "a", 1)]));
    let agg = Aggregator::new(as_sources(&[src.clone()]), cache).with_ttl(Duration::from_secs(30));

    agg.fetch_all_events(&FetchOptions::default()).await;
    clock.advance(Duration::from_millis(29_999));
    agg.fetch_all_events(&FetchOptions::default()).await;
    assert_eq!(src.calls(), 1);

    clock.advance(Duration::from_millis(2));
    agg.fetch_all_events(&FetchOptions::default()).await;
    assert_eq!(src.calls(), 2);
}

#[tokio::test]
async fn limit_truncates_merged_list() {
    let many: Vec<CrisisEvent> = (0..40).map(|i| ev(&format!("m:{i}"), "m", i)).collect();
    let src = Stub::new("m", Behaviour::Events(many));
    let agg = Aggregator::new(as_sources(&[src]), Arc::new(TtlCache::new()));

    let out = agg
        .fetch_all_events(&FetchOptions {
            limit: Some(5),
            ..Default::default()
        })
        .await;
    assert_eq!(out.len(), 5);
    assert_eq!(out[0].id, "m:39");
}

#[tokio::test]
async fn health_report_follows_registration_order() {
    let stubs = vec![
        Stub::new("up", Behaviour::Events(Vec::new())),
        Stub::new("down", Behaviour::Fail),
        Stub::new("hung", Behaviour::Hang),
    ];
    let cfg = PipelineConfig {
        health_timeout_secs: 1,
        ..PipelineConfig::default()
    };
    let agg = Aggregator::from_config(as_sources(&stubs), Arc::new(TtlCache::new()), &cfg);

    let report = agg.health_report().await;
    let got: Vec<(&str, bool)> = report.iter().map(|s| (s.id.as_str(), s.healthy)).collect();
    assert_eq!(got, vec![("up", true), ("down", false), ("hung", false)]);
}
