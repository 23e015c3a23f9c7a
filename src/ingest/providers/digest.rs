// src/ingest/providers/digest.rs
//! Curated WSJ / Nikkei digests dropped as JSON arrays into a local directory.
//! Missing or malformed files read as empty.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::classify::detect_category;
use crate::geocoder::geocode;
use crate::ingest::types::{CrisisEvent, FetchOptions, SourceProvider, SourceTier};
use crate::ingest::{content_hash, record_parsed, sort_newest_first};
use crate::scorer::score_threat_level;

pub const DIGEST_FILES: &[&str] = &["wsj.json", "nikkei.json"];
const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
struct DigestEntry {
    title: String,
    summary: Option<String>,
    url: Option<String>,
    time: Option<String>,
    source: String,
}

fn entry_to_event(e: DigestEntry) -> CrisisEvent {
    let category = detect_category(&e.title);
    let summary = e.summary.unwrap_or_else(|| e.title.clone());
    let level = score_threat_level(&e.title, &summary, category);
    let timestamp = e
        .time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    CrisisEvent {
        id: format!("digest:{}", content_hash(e.url.as_deref().unwrap_or(&e.title))),
        location: geocode(&e.title),
        title: e.title,
        summary,
        category,
        level,
        timestamp,
        source: e.source,
        source_tier: SourceTier::Private,
        url: e.url,
        actor: None,
        entities: None,
    }
}

/// Parse one digest file body.
pub fn parse_digest(body: &str) -> Result<Vec<CrisisEvent>> {
    let entries: Vec<DigestEntry> = serde_json::from_str(body).context("parsing digest json")?;
    Ok(entries.into_iter().map(entry_to_event).collect())
}

pub struct DigestProvider {
    dir: PathBuf,
}

impl DigestProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_file(&self, name: &str) -> Vec<CrisisEvent> {
        let path = self.dir.join(name);
        match read_digest(&path).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(target: "ingest", error = ?e, path = %path.display(), "digest unreadable");
                Vec::new()
            }
        }
    }

    async fn read_all(&self) -> Vec<CrisisEvent> {
        let files = futures::future::join_all(DIGEST_FILES.iter().map(|f| self.read_file(f))).await;
        files.into_iter().flatten().collect()
    }
}

async fn read_digest(path: &Path) -> Result<Vec<CrisisEvent>> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    parse_digest(&body)
}

#[async_trait]
impl SourceProvider for DigestProvider {
    fn id(&self) -> &str {
        "digest"
    }

    fn name(&self) -> &str {
        "News Digests (WSJ/Nikkei)"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Private
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let t0 = Instant::now();
        let mut events = self.read_all().await;
        record_parsed("digest", t0, events.len());
        sort_newest_first(&mut events);
        Ok(options.apply(events, DEFAULT_LIMIT))
    }

    async fn health_check(&self) -> bool {
        !self.read_all().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_defaults_to_title_and_id_prefers_url() {
        let body = r#"[
            {"title":"Oil sanctions tighten on Iran","source":"WSJ","url":"https://wsj.example/a","time":"2025-06-10T08:00:00Z"},
            {"title":"Tokyo summit opens","summary":"Leaders meet","source":"Nikkei"}
        ]"#;
        let ev = parse_digest(body).unwrap();
        assert_eq!(ev[0].summary, ev[0].title);
        assert_eq!(ev[0].id, format!("digest:{}", content_hash("https://wsj.example/a")));
        assert_eq!(ev[1].id, format!("digest:{}", content_hash("Tokyo summit opens")));
        assert_eq!(ev[0].source_tier, SourceTier::Private);
    }

    #[tokio::test]
    async fn missing_directory_is_empty_and_unhealthy() {
        let p = DigestProvider::new("/nonexistent/digests");
        assert!(p.fetch(&FetchOptions::default()).await.unwrap().is_empty());
        assert!(!p.health_check().await);
    }
}
