// src/ingest/providers/rss.rs
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::classify::{detect_category, is_geopolitical};
use crate::geocoder::geocode;
use crate::ingest::config::FeedConfig;
use crate::ingest::types::{CrisisEvent, FetchOptions, SourceProvider, SourceTier};
use crate::ingest::{content_hash, get_text, head_ok, normalize_text, record_parsed, sort_newest_first};
use crate::scorer::score_threat_level;

const DEFAULT_LIMIT: usize = 100;

// --- RSS 2.0 ---
#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

// --- RSS 1.0 (RDF): items sit next to the channel ---
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    guid: Option<TextNode>,
}

// --- Atom ---
#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element whose text we want regardless of its attributes.
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

/// Feed-native item flattened to what the mapper needs.
struct RawItem {
    title: String,
    description: String,
    link: Option<String>,
    date: Option<String>,
    guid: Option<String>,
}

pub(crate) fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc2822) {
        return DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn root_element(xml: &str) -> Option<String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn raw_items(xml: &str) -> Result<Vec<RawItem>> {
    let xml = scrub_html_entities_for_xml(xml);
    let root = root_element(&xml).ok_or_else(|| anyhow!("feed has no root element"))?;

    let from_rss = |it: Item| RawItem {
        title: it.title.unwrap_or_default(),
        description: it.description.unwrap_or_default(),
        guid: it
            .guid
            .map(|g| g.value)
            .filter(|g| !g.trim().is_empty()),
        link: it.link,
        date: it.pub_date.or(it.dc_date),
    };

    match root.as_str() {
        "rss" => {
            let rss: Rss = from_str(&xml).context("parsing rss xml")?;
            Ok(rss.channel.items.into_iter().map(from_rss).collect())
        }
        "rdf" => {
            let rdf: Rdf = from_str(&xml).context("parsing rdf xml")?;
            Ok(rdf.items.into_iter().map(from_rss).collect())
        }
        "feed" => {
            let feed: AtomFeed = from_str(&xml).context("parsing atom xml")?;
            Ok(feed
                .entries
                .into_iter()
                .map(|e| {
                    let link = e
                        .links
                        .iter()
                        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                        .or_else(|| e.links.first())
                        .and_then(|l| l.href.clone());
                    RawItem {
                        title: e.title.map(|t| t.value).unwrap_or_default(),
                        description: e
                            .summary
                            .or(e.content)
                            .map(|t| t.value)
                            .unwrap_or_default(),
                        link,
                        date: e.published.or(e.updated),
                        guid: e.id,
                    }
                })
                .collect())
        }
        other => Err(anyhow!("unsupported feed root <{other}>")),
    }
}

fn map_item(item: RawItem, feed: &FeedConfig) -> Option<CrisisEvent> {
    let title = normalize_text(&item.title, 300);
    let description = normalize_text(&item.description, 1_000);
    let combined = format!("{title} {description}");

    if !is_geopolitical(&combined) {
        return None;
    }

    let category = detect_category(&combined);
    let level = score_threat_level(&title, &description, category);
    let natural_key = item
        .guid
        .or_else(|| item.link.clone())
        .unwrap_or_else(|| title.clone());

    Some(CrisisEvent {
        id: format!("rss:{}:{}", feed.name, content_hash(&natural_key)),
        summary: if description.is_empty() {
            title.clone()
        } else {
            description
        },
        title,
        category,
        level,
        location: geocode(&combined),
        timestamp: item
            .date
            .as_deref()
            .and_then(parse_feed_date)
            .unwrap_or_else(Utc::now),
        source: feed.label.clone(),
        source_tier: SourceTier::Public,
        url: item.link,
        actor: None,
        entities: None,
    })
}

/// Parse one feed body (RSS 2.0, RSS 1.0 or Atom) into relevant events.
pub fn parse_feed(xml: &str, feed: &FeedConfig) -> Result<Vec<CrisisEvent>> {
    let t0 = Instant::now();
    let out: Vec<CrisisEvent> = raw_items(xml)?
        .into_iter()
        .filter_map(|it| map_item(it, feed))
        .collect();
    record_parsed("rss", t0, out.len());
    Ok(out)
}

/// Wire-service RSS aggregator: every configured feed fetched concurrently.
pub struct RssProvider {
    feeds: Vec<FeedConfig>,
    client: reqwest::Client,
    health_timeout: Duration,
}

impl RssProvider {
    pub fn new(feeds: Vec<FeedConfig>, client: reqwest::Client, health_timeout: Duration) -> Self {
        Self {
            feeds,
            client,
            health_timeout,
        }
    }

    async fn fetch_feed(&self, feed: &FeedConfig) -> Result<Vec<CrisisEvent>> {
        let body = get_text(&self.client, &feed.url, &feed.name).await?;
        parse_feed(&body, feed)
    }
}

#[async_trait]
impl SourceProvider for RssProvider {
    fn id(&self) -> &str {
        "rss"
    }

    fn name(&self) -> &str {
        "RSS Aggregator"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let results =
            futures::future::join_all(self.feeds.iter().map(|f| self.fetch_feed(f))).await;

        let mut events = Vec::new();
        for (feed, res) in self.feeds.iter().zip(results) {
            match res {
                Ok(mut v) => events.append(&mut v),
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, feed = %feed.name, "rss feed failed");
                }
            }
        }

        sort_newest_first(&mut events);
        Ok(options.apply(events, DEFAULT_LIMIT))
    }

    async fn health_check(&self) -> bool {
        match self.feeds.first() {
            Some(f) => head_ok(&self.client, &f.url, self.health_timeout).await,
            None => false,
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc2822_and_rfc3339() {
        let a = parse_feed_date("Tue, 10 Jun 2025 14:30:00 +0200").unwrap();
        assert_eq!(a.to_rfc3339(), "2025-06-10T12:30:00+00:00");
        let b = parse_feed_date("Tue, 10 Jun 2025 12:30:00 GMT").unwrap();
        assert_eq!(a, b);
        let c = parse_feed_date("2025-06-10T12:30:00Z").unwrap();
        assert_eq!(a, c);
        assert!(parse_feed_date("yesterday").is_none());
    }

    #[test]
    fn root_detection() {
        assert_eq!(root_element("<?xml version=\"1.0\"?><rss><channel/></rss>").as_deref(), Some("rss"));
        assert_eq!(
            root_element("<feed xmlns=\"http://www.w3.org/2005/Atom\"></feed>").as_deref(),
            Some("feed")
        );
        assert_eq!(root_element("<rdf:RDF></rdf:RDF>").as_deref(), Some("rdf"));
    }

    #[test]
    fn rejects_non_feed_markup() {
        let feed = FeedConfig {
            name: "x".into(),
            url: "http://x".into(),
            label: "X".into(),
        };
        assert!(parse_feed("<html><body>nope</body></html>", &feed).is_err());
        assert!(parse_feed("not xml at all", &feed).is_err());
    }
}
