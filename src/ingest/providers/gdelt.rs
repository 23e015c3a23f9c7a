// src/ingest/providers/gdelt.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Deserialize;

use crate::classify::detect_category;
use crate::geocoder::geocode;
use crate::ingest::types::{CrisisEvent, FetchOptions, SourceProvider, SourceTier};
use crate::ingest::{content_hash, get_text, head_ok, normalize_text, record_parsed};
use crate::scorer::score_threat_level;

pub const GDELT_ENDPOINT: &str = "https://api.gdeltproject.org/api/v2/doc/doc";
const DEFAULT_QUERY: &str = "crisis OR conflict OR military OR attack";
const MAX_RECORDS: usize = 250;

#[derive(Debug, Deserialize)]
struct GdeltResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    seendate: String,
    sourcecountry: Option<String>,
}

/// `20250610T123000Z` → UTC.
fn parse_seendate(raw: &str) -> Option<chrono::DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y%m%dT%H%M%SZ")
        .ok()
        .map(|n| n.and_utc())
}

fn map_article(a: Article) -> Option<CrisisEvent> {
    let title = normalize_text(&a.title, 300);
    if a.url.is_empty() || title.is_empty() {
        return None;
    }
    let category = detect_category(&title);
    let level = score_threat_level(&title, &title, category);
    let location = geocode(&title).or_else(|| a.sourcecountry.as_deref().and_then(geocode));

    Some(CrisisEvent {
        id: format!("gdelt:{}", content_hash(&a.url)),
        summary: title.clone(),
        title,
        category,
        level,
        location,
        timestamp: parse_seendate(&a.seendate).unwrap_or_else(Utc::now),
        source: "GDELT".to_string(),
        source_tier: SourceTier::Public,
        url: Some(a.url),
        actor: None,
        entities: None,
    })
}

/// Parse a GDELT `ArtList` JSON body.
pub fn parse_articles(body: &str) -> Result<Vec<CrisisEvent>> {
    let t0 = Instant::now();
    let resp: GdeltResponse = serde_json::from_str(body).context("parsing gdelt json")?;
    let out: Vec<CrisisEvent> = resp.articles.into_iter().filter_map(map_article).collect();
    record_parsed("gdelt", t0, out.len());
    Ok(out)
}

pub struct GdeltProvider {
    endpoint: String,
    client: reqwest::Client,
    health_timeout: Duration,
}

impl GdeltProvider {
    pub fn new(client: reqwest::Client, health_timeout: Duration) -> Self {
        Self {
            endpoint: GDELT_ENDPOINT.to_string(),
            client,
            health_timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_url(&self, options: &FetchOptions) -> Result<String> {
        let query = options
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(DEFAULT_QUERY);
        let limit = options.limit.unwrap_or(50).min(MAX_RECORDS);
        let url = reqwest::Url::parse_with_params(
            &self.endpoint,
            &[
                ("query", query),
                ("mode", "ArtList"),
                ("maxrecords", &limit.to_string()),
                ("format", "json"),
                ("timespan", "60min"),
            ],
        )
        .context("building gdelt url")?;
        Ok(url.into())
    }
}

#[async_trait]
impl SourceProvider for GdeltProvider {
    fn id(&self) -> &str {
        "gdelt"
    }

    fn name(&self) -> &str {
        "GDELT Project"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let url = self.build_url(options)?;
        let body = get_text(&self.client, &url, "gdelt").await?;
        let events = parse_articles(&body)?;
        // query already went upstream; since/limit are applied here
        let post = FetchOptions {
            query: None,
            ..options.clone()
        };
        Ok(post.apply(events, MAX_RECORDS))
    }

    async fn health_check(&self) -> bool {
        let opts = FetchOptions {
            limit: Some(1),
            ..FetchOptions::default()
        };
        match self.build_url(&opts) {
            Ok(url) => head_ok(&self.client, &url, self.health_timeout).await,
            Err(_) => false,
        }
    }
}
