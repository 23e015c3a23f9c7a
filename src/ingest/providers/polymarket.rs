// src/ingest/providers/polymarket.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::types::{
    CrisisEvent, EventCategory, FetchOptions, PolymarketContract, SourceProvider, SourceTier,
    ThreatLevel,
};
use crate::ingest::{get_text, head_ok, record_parsed};

pub const POLYMARKET_ENDPOINT: &str = "https://gamma-api.polymarket.com/markets";
const MAX_CONTRACTS: usize = 20;

/// A question is relevant when every term of at least one group appears in it.
const CRISIS_FILTERS: &[&[&str]] = &[
    &["iran"],
    &["israel", "attack"],
    &["israel", "iran"],
    &["nuclear", "strike"],
    &["nuclear", "war"],
    &["military", "strike"],
    &["oil", "price"],
    &["oil", "embargo"],
    &["sanction", "iran"],
    &["strait", "hormuz"],
    &["world war"],
    &["nato", "war"],
    &["hezbollah"],
    &["houthi"],
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    outcome_prices: Value,
    #[serde(default)]
    best_ask: Value,
    #[serde(default)]
    volume: Value,
    #[serde(default)]
    volume_num: Value,
    #[serde(default)]
    slug: Option<String>,
}

pub fn is_crisis_question(question: &str) -> bool {
    let lower = question.to_lowercase();
    CRISIS_FILTERS
        .iter()
        .any(|group| group.iter().all(|t| lower.contains(t)))
}

pub fn probability_to_level(probability: u32) -> ThreatLevel {
    match probability {
        80.. => ThreatLevel::Critical,
        60..=79 => ThreatLevel::High,
        40..=59 => ThreatLevel::Medium,
        20..=39 => ThreatLevel::Low,
        _ => ThreatLevel::Info,
    }
}

/// Number from a JSON number or a numeric string.
fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First outcome price. Gamma ships `outcomePrices` as a JSON-encoded string
/// (`"[\"0.65\",\"0.35\"]"`) but a plain array is accepted too.
fn first_outcome_price(raw: &Value) -> Option<f64> {
    let decoded;
    let list = match raw {
        Value::String(s) => {
            decoded = serde_json::from_str::<Value>(s).ok()?;
            &decoded
        }
        other => other,
    };
    list.as_array()?.first().and_then(as_f64)
}

fn market_to_contract(m: GammaMarket) -> PolymarketContract {
    let price = first_outcome_price(&m.outcome_prices)
        .or_else(|| as_f64(&m.best_ask))
        .filter(|p| p.is_finite())
        .unwrap_or(0.0);
    let volume = as_f64(&m.volume)
        .or_else(|| as_f64(&m.volume_num))
        .unwrap_or(0.0);
    let id = match &m.id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    PolymarketContract {
        id,
        question: m.question.unwrap_or_default(),
        probability: (price * 100.0).round().clamp(0.0, 100.0) as u32,
        volume,
        url: m.slug.map(|s| format!("https://polymarket.com/event/{s}")),
    }
}

/// Parse a Gamma markets listing into the crisis-relevant contracts (max 20).
pub fn parse_markets(body: &str) -> Result<Vec<PolymarketContract>> {
    let markets: Vec<GammaMarket> =
        serde_json::from_str(body).context("parsing polymarket json")?;
    Ok(markets
        .into_iter()
        .filter(|m| m.question.as_deref().is_some_and(is_crisis_question))
        .take(MAX_CONTRACTS)
        .map(market_to_contract)
        .collect())
}

fn contract_to_event(c: &PolymarketContract) -> CrisisEvent {
    CrisisEvent {
        id: format!("polymarket:{}", c.id),
        title: c.question.clone(),
        summary: format!(
            "Prediction market: {}% probability. Volume: ${:.0}",
            c.probability, c.volume
        ),
        category: EventCategory::Prediction,
        level: probability_to_level(c.probability),
        location: None,
        timestamp: Utc::now(),
        source: "Polymarket".to_string(),
        source_tier: SourceTier::Public,
        url: c.url.clone(),
        actor: None,
        entities: None,
    }
}

pub struct PolymarketProvider {
    endpoint: String,
    client: reqwest::Client,
    health_timeout: Duration,
}

impl PolymarketProvider {
    pub fn new(client: reqwest::Client, health_timeout: Duration) -> Self {
        Self {
            endpoint: POLYMARKET_ENDPOINT.to_string(),
            client,
            health_timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Open crisis-relevant contracts, used directly by the markets read-model.
    pub async fn fetch_contracts(&self) -> Result<Vec<PolymarketContract>> {
        let url = format!("{}?closed=false&limit=50", self.endpoint);
        let body = get_text(&self.client, &url, "polymarket").await?;
        parse_markets(&body)
    }
}

#[async_trait]
impl SourceProvider for PolymarketProvider {
    fn id(&self) -> &str {
        "polymarket"
    }

    fn name(&self) -> &str {
        "Polymarket Predictions"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let t0 = Instant::now();
        let contracts = self.fetch_contracts().await?;
        let events: Vec<CrisisEvent> = contracts.iter().map(contract_to_event).collect();
        record_parsed("polymarket", t0, events.len());
        Ok(options.apply(events, MAX_CONTRACTS))
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}?limit=1", self.endpoint);
        head_ok(&self.client, &url, self.health_timeout).await
    }
}
