// src/ingest/providers/safe_airspace.rs
use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::geocoder::geocode;
use crate::ingest::types::{
    CrisisEvent, EventCategory, FetchOptions, SourceProvider, SourceTier, ThreatLevel,
};
use crate::ingest::{content_hash, get_text, head_ok, record_parsed};

pub const SAFE_AIRSPACE_URL: &str = "https://safeairspace.net";
const DEFAULT_LIMIT: usize = 50;

static RE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"feed-item-level-(\d+)"[^>]*data-feed-item-country="([^"]+)""#).unwrap()
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AirspaceEntry {
    pub country: String,
    /// Native scale: 1 = do not fly, 2 = caution.
    pub level: u8,
}

/// Extract one advisory per country from the page markup.
///
/// Only levels 1 and 2 are kept; 0, 3 and anything unparseable are dropped.
/// Duplicates keep the lowest level number (highest risk), first-seen order.
pub fn scrape_entries(html: &str) -> Vec<AirspaceEntry> {
    let mut out: Vec<AirspaceEntry> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for cap in RE_ITEM.captures_iter(html) {
        let level: u8 = cap[1].parse().unwrap_or(0);
        if level == 0 || level > 2 {
            continue;
        }
        let country = html_escape::decode_html_entities(&cap[2]).trim().to_string();
        match seen.get(&country) {
            Some(&i) => {
                if level < out[i].level {
                    out[i].level = level;
                }
            }
            None => {
                seen.insert(country.clone(), out.len());
                out.push(AirspaceEntry { country, level });
            }
        }
    }
    out
}

fn level_to_threat(level: u8) -> ThreatLevel {
    match level {
        1 => ThreatLevel::Critical,
        2 => ThreatLevel::High,
        _ => ThreatLevel::Info,
    }
}

fn entry_to_event(entry: &AirspaceEntry, base: &str) -> CrisisEvent {
    let summary = match entry.level {
        1 => format!("{}: DO NOT FLY - airspace closed or extreme conflict risk", entry.country),
        _ => format!("{}: Exercise caution - elevated airspace risk", entry.country),
    };
    let slug = RE_WS
        .replace_all(&entry.country.to_lowercase(), "-")
        .to_string();

    CrisisEvent {
        id: format!("airspace:{}", content_hash(&entry.country)),
        title: format!("Airspace Alert: {}", entry.country),
        summary,
        category: EventCategory::Military,
        level: level_to_threat(entry.level),
        location: geocode(&entry.country),
        timestamp: Utc::now(),
        source: "Safe Airspace".to_string(),
        source_tier: SourceTier::Public,
        url: Some(format!("{}/{slug}/", base.trim_end_matches('/'))),
        actor: None,
        entities: None,
    }
}

pub fn parse_page(html: &str) -> Vec<CrisisEvent> {
    let t0 = Instant::now();
    let out: Vec<CrisisEvent> = scrape_entries(html)
        .iter()
        .map(|e| entry_to_event(e, SAFE_AIRSPACE_URL))
        .collect();
    record_parsed("safe_airspace", t0, out.len());
    out
}

pub struct SafeAirspaceProvider {
    url: String,
    client: reqwest::Client,
    health_timeout: Duration,
}

impl SafeAirspaceProvider {
    pub fn new(client: reqwest::Client, health_timeout: Duration) -> Self {
        Self {
            url: SAFE_AIRSPACE_URL.to_string(),
            client,
            health_timeout,
        }
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl SourceProvider for SafeAirspaceProvider {
    fn id(&self) -> &str {
        "safe_airspace"
    }

    fn name(&self) -> &str {
        "Safe Airspace"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let html = get_text(&self.client, &self.url, "safe_airspace").await?;
        Ok(options.apply(parse_page(&html), DEFAULT_LIMIT))
    }

    async fn health_check(&self) -> bool {
        head_ok(&self.client, &self.url, self.health_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_highest_risk_and_drops_level_three() {
        let html = r#"
            <div class="feed-item feed-item-level-2" data-feed-item-country="Iran">a</div>
            <div class="feed-item feed-item-level-3" data-feed-item-country="Egypt">b</div>
            <div class="feed-item feed-item-level-1" data-feed-item-country="Iran">c</div>
            <div class="feed-item feed-item-level-2" data-feed-item-country="Saudi Arabia">d</div>
            <div class="feed-item feed-item-level-0" data-feed-item-country="Chad">e</div>
        "#;
        let entries = scrape_entries(html);
        assert_eq!(
            entries,
            vec![
                AirspaceEntry { country: "Iran".into(), level: 1 },
                AirspaceEntry { country: "Saudi Arabia".into(), level: 2 },
            ]
        );

        let events = parse_page(html);
        assert_eq!(events[0].level, ThreatLevel::Critical);
        assert_eq!(events[1].url.as_deref(), Some("https://safeairspace.net/saudi-arabia/"));
        assert!(events[0].location.is_some());
    }
}
