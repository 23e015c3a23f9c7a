// src/ingest/providers/usgs.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::types::{
    CrisisEvent, EventCategory, FetchOptions, Location, SourceProvider, SourceTier, ThreatLevel,
};
use crate::ingest::{get_text, head_ok, record_parsed, sort_newest_first};

pub const USGS_ENDPOINT: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/2.5_hour.geojson";
const DEFAULT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    id: String,
    properties: Properties,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    mag: Option<f64>,
    #[serde(default)]
    place: Option<String>,
    /// Epoch milliseconds.
    time: Option<i64>,
    url: Option<String>,
    title: Option<String>,
    #[serde(default)]
    tsunami: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: Vec<f64>,
}

pub fn magnitude_to_level(mag: f64) -> ThreatLevel {
    if mag >= 6.0 {
        ThreatLevel::Critical
    } else if mag >= 5.0 {
        ThreatLevel::High
    } else if mag >= 4.0 {
        ThreatLevel::Medium
    } else if mag >= 3.0 {
        ThreatLevel::Low
    } else {
        ThreatLevel::Info
    }
}

fn map_feature(f: Feature) -> Option<CrisisEvent> {
    let p = f.properties;
    let timestamp = p.time.and_then(DateTime::from_timestamp_millis)?;
    let mag = p.mag.unwrap_or(0.0);
    let place = p.place.unwrap_or_else(|| "Unknown location".to_string());
    let tsunami = if p.tsunami.unwrap_or(0) != 0 {
        " (tsunami warning)"
    } else {
        ""
    };

    // GeoJSON order is [lng, lat, depth]
    let location = f.geometry.and_then(|g| match g.coordinates.as_slice() {
        [lng, lat, ..] => Some(Location {
            lat: *lat,
            lng: *lng,
            name: place.clone(),
            country: None,
        }),
        _ => None,
    });

    Some(CrisisEvent {
        id: format!("usgs:{}", f.id),
        title: p.title.unwrap_or_else(|| format!("M {mag} - {place}")),
        summary: format!("M{mag} earthquake at {place}{tsunami}"),
        category: EventCategory::Earthquake,
        level: magnitude_to_level(mag),
        location,
        timestamp,
        source: "USGS".to_string(),
        source_tier: SourceTier::Public,
        url: p.url,
        actor: None,
        entities: None,
    })
}

/// Parse a USGS summary GeoJSON feed. Features without a time are skipped.
pub fn parse_geojson(body: &str) -> Result<Vec<CrisisEvent>> {
    let t0 = Instant::now();
    let fc: FeatureCollection = serde_json::from_str(body).context("parsing usgs geojson")?;
    let out: Vec<CrisisEvent> = fc.features.into_iter().filter_map(map_feature).collect();
    record_parsed("usgs", t0, out.len());
    Ok(out)
}

pub struct UsgsProvider {
    endpoint: String,
    client: reqwest::Client,
    health_timeout: Duration,
}

impl UsgsProvider {
    pub fn new(client: reqwest::Client, health_timeout: Duration) -> Self {
        Self {
            endpoint: USGS_ENDPOINT.to_string(),
            client,
            health_timeout,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SourceProvider for UsgsProvider {
    fn id(&self) -> &str {
        "usgs"
    }

    fn name(&self) -> &str {
        "USGS Earthquakes"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let body = get_text(&self.client, &self.endpoint, "usgs").await?;
        let mut events = parse_geojson(&body)?;
        sort_newest_first(&mut events);
        Ok(options.apply(events, DEFAULT_LIMIT))
    }

    async fn health_check(&self) -> bool {
        head_ok(&self.client, &self.endpoint, self.health_timeout).await
    }
}
