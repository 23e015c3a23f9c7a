// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod registry;
pub mod types;

use crate::ingest::types::CrisisEvent;
use anyhow::{anyhow, Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_events_total",
            "Events normalized by providers, labelled by source."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors, labelled by source."
        );
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_counter!("aggregator_cache_hits_total", "Aggregator cache hits.");
        describe_counter!("aggregator_cache_misses_total", "Aggregator cache misses.");
        describe_histogram!(
            "aggregator_events_returned",
            "Events returned per aggregation run."
        );
        describe_gauge!(
            "aggregator_last_run_ts",
            "Unix ts when the aggregator last fanned out."
        );
        describe_counter!("translate_cache_hits_total", "Translation cache hits.");
        describe_counter!("translate_failures_total", "Failed translation batches.");
    });
}

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize feed text: decode entities, strip tags, fold quotes and whitespace,
/// cap at `max_chars` characters.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // Entities first so escaped markup (`&lt;p&gt;`) is stripped too
    let decoded = html_escape::decode_html_entities(s).to_string();
    let mut out = RE_TAGS.replace_all(&decoded, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out = RE_WS.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
    }
    out
}

/// Stable 64-bit content hash (hex) of a natural key; used for event ids.
pub fn content_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Newest first; stable, so equal timestamps keep input order.
pub fn sort_newest_first(events: &mut [CrisisEvent]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

pub fn http_client(user_agent: &str, timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "reqwest builder failed, using defaults");
            reqwest::Client::new()
        })
}

/// GET `url` and return the body; non-2xx is an error.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str, provider: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("{provider} http get()"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("{provider} upstream returned {status}"));
    }
    resp.text()
        .await
        .with_context(|| format!("{provider} http .text()"))
}

/// HEAD probe used by health checks. Any transport error reads as unhealthy.
pub(crate) async fn head_ok(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    match client.head(url).timeout(timeout).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

/// Parse-side telemetry shared by all providers.
pub(crate) fn record_parsed(source: &str, started: Instant, count: usize) {
    ensure_metrics_described();
    let ms = started.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total", "source" => source.to_string()).increment(count as u64);
}
