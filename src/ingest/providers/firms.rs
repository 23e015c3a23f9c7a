// src/ingest/providers/firms.rs
//! NASA FIRMS VIIRS hotspots over the Middle East / South Asia box.
//!
//! The CSV has no native id and its column order varies by product, so
//! columns are resolved by header name and ids are hashed from lat:lng:date.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::ingest::types::{
    CrisisEvent, EventCategory, FetchOptions, Location, SourceProvider, SourceTier, ThreatLevel,
};
use crate::ingest::{content_hash, get_text, record_parsed};

pub const FIRMS_API_BASE: &str = "https://firms.modaps.eosdis.nasa.gov/api/area/csv";
const PRODUCT: &str = "VIIRS_SNPP_NRT";
/// west,south,east,north
const BBOX: &str = "25,12,75,42";
const DEFAULT_LIMIT: usize = 30;
const MIN_FRP: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub latitude: f64,
    pub longitude: f64,
    pub brightness: f64,
    pub confidence: String,
    pub acq_date: String,
    pub acq_time: String,
    pub satellite: String,
    pub frp: f64,
}

impl Hotspot {
    fn is_high_confidence(&self) -> bool {
        let c = self.confidence.trim().to_lowercase();
        c == "high" || c == "h" || c.parse::<f64>().map(|n| n >= 80.0).unwrap_or(false)
    }
}

pub fn frp_to_level(frp: f64) -> ThreatLevel {
    if frp > 100.0 {
        ThreatLevel::High
    } else if frp > 30.0 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

/// Header-indexed CSV parse. Rows with unparseable coordinates are skipped.
pub fn parse_csv(csv: &str) -> Vec<Hotspot> {
    let mut lines = csv.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let idx: HashMap<&str, usize> = header
        .split(',')
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    lines
        .filter_map(|line| {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            let col = |name: &str| idx.get(name).and_then(|&i| cols.get(i).copied());
            let num = |name: &str| col(name).and_then(|v| v.parse::<f64>().ok());

            Some(Hotspot {
                latitude: num("latitude")?,
                longitude: num("longitude")?,
                brightness: num("bright_ti4").or_else(|| num("brightness")).unwrap_or(0.0),
                confidence: col("confidence").unwrap_or_default().to_string(),
                acq_date: col("acq_date").unwrap_or_default().to_string(),
                acq_time: col("acq_time").unwrap_or_default().to_string(),
                satellite: col("satellite").unwrap_or_default().to_string(),
                frp: num("frp").unwrap_or(0.0),
            })
        })
        .collect()
}

fn hotspot_to_event(h: &Hotspot) -> Option<CrisisEvent> {
    // acq_time is HHMM, sometimes without the leading zero
    let date = NaiveDate::parse_from_str(&h.acq_date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&format!("{:0>4}", h.acq_time), "%H%M").ok()?;
    let timestamp = date.and_time(time).and_utc();

    Some(CrisisEvent {
        id: format!(
            "firms:{}",
            content_hash(&format!("{}:{}:{}", h.latitude, h.longitude, h.acq_date))
        ),
        title: format!("Fire/hotspot detected ({}, FRP {}MW)", h.satellite, h.frp),
        summary: format!(
            "Satellite: {}, Brightness: {}, Confidence: {}, FRP: {}MW",
            h.satellite, h.brightness, h.confidence, h.frp
        ),
        category: EventCategory::Military,
        level: frp_to_level(h.frp),
        location: Some(Location {
            lat: h.latitude,
            lng: h.longitude,
            name: format!("{:.2}°N, {:.2}°E", h.latitude, h.longitude),
            country: None,
        }),
        timestamp,
        source: "NASA FIRMS".to_string(),
        source_tier: SourceTier::Public,
        url: None,
        actor: None,
        entities: None,
    })
}

/// Filter to strong detections, rank by radiative power and map to events.
pub fn hotspots_to_events(mut hotspots: Vec<Hotspot>, limit: usize) -> Vec<CrisisEvent> {
    hotspots.retain(|h| h.is_high_confidence() && h.frp > MIN_FRP);
    hotspots.sort_by(|a, b| b.frp.total_cmp(&a.frp));
    hotspots
        .iter()
        .filter_map(hotspot_to_event)
        .take(limit)
        .collect()
}

pub struct FirmsProvider {
    base: String,
    map_key: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl FirmsProvider {
    pub fn new(map_key: Option<String>, client: reqwest::Client) -> Self {
        Self {
            base: FIRMS_API_BASE.to_string(),
            map_key,
            client,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_endpoint(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }
}

#[async_trait]
impl SourceProvider for FirmsProvider {
    fn id(&self) -> &str {
        "firms"
    }

    fn name(&self) -> &str {
        "NASA FIRMS"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let Some(key) = self.map_key.as_deref() else {
            return Ok(Vec::new());
        };
        let url = format!("{}/{key}/{PRODUCT}/{BBOX}/1", self.base.trim_end_matches('/'));
        let csv = tokio::time::timeout(self.timeout, get_text(&self.client, &url, "firms"))
            .await
            .map_err(|_| anyhow!("firms request timed out"))??;

        let t0 = Instant::now();
        let limit = options.limit.unwrap_or(DEFAULT_LIMIT);
        let events = hotspots_to_events(parse_csv(&csv), usize::MAX);
        record_parsed("firms", t0, events.len());

        // already ranked by FRP; query/since then limit
        Ok(options.apply(events, limit))
    }

    async fn health_check(&self) -> bool {
        self.map_key.is_some()
    }
}
