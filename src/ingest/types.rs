// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed category set every provider maps into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Conflict,
    Statement,
    Military,
    Diplomatic,
    Economic,
    Terrorism,
    Disaster,
    Prediction,
    Earthquake,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Conflict => "conflict",
            EventCategory::Statement => "statement",
            EventCategory::Military => "military",
            EventCategory::Diplomatic => "diplomatic",
            EventCategory::Economic => "economic",
            EventCategory::Terrorism => "terrorism",
            EventCategory::Disaster => "disaster",
            EventCategory::Prediction => "prediction",
            EventCategory::Earthquake => "earthquake",
        }
    }
}

/// Severity tier. Declaration order gives `Critical > High > Medium > Low > Info`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Info => "info",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceTier {
    Public,
    Private,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Canonical event. Built once by a provider and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrisisEvent {
    pub id: String, // "<source>:<hash>"
    pub title: String,
    pub summary: String,
    pub category: EventCategory,
    pub level: ThreatLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub timestamp: DateTime<Utc>,
    pub source: String, // e.g. "Reuters", "USGS", "x:@handle"
    pub source_tier: SourceTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
}

impl CrisisEvent {
    /// Lowercased "title summary", the text every post-hoc filter looks at.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.summary).to_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndicator {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolymarketContract {
    pub id: String,
    pub question: String,
    /// Whole percent, 0..=100.
    pub probability: u32,
    pub volume: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActorStatus {
    pub name: String,
    pub flag: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_statement_time: Option<DateTime<Utc>>,
    pub event_count: usize,
}

/// Shared per-request options handed to every provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    pub query: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl FetchOptions {
    pub fn is_default(&self) -> bool {
        self == &FetchOptions::default()
    }

    /// True when the event passes the `query` and `since` filters.
    pub fn matches(&self, ev: &CrisisEvent) -> bool {
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            if !ev.search_text().contains(&q.to_lowercase()) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if ev.timestamp < since {
                return false;
            }
        }
        true
    }

    /// Post-hoc filter for providers without native query/date support.
    /// Order is preserved; `limit` falls back to `default_limit`.
    pub fn apply(&self, events: Vec<CrisisEvent>, default_limit: usize) -> Vec<CrisisEvent> {
        let limit = self.limit.unwrap_or(default_limit);
        events
            .into_iter()
            .filter(|ev| self.matches(ev))
            .take(limit)
            .collect()
    }
}

/// One external feed normalized into `CrisisEvent`s.
///
/// `fetch` returns `Ok(vec![])` when credentials are missing; transport and
/// parse failures come back as `Err` so the aggregator can log them before
/// degrading to an empty contribution.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn tier(&self) -> SourceTier;
    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>>;
    /// Cheap liveness probe; never fails, only reports `false`.
    async fn health_check(&self) -> bool;
}
