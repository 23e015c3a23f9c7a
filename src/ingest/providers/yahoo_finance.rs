// src/ingest/providers/yahoo_finance.rs
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::ingest::types::{
    CrisisEvent, EventCategory, FetchOptions, MarketIndicator, SourceProvider, SourceTier,
    ThreatLevel,
};
use crate::ingest::{content_hash, get_text, head_ok, record_parsed};

pub const YAHOO_CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// (symbol, display name, big-move threshold in percent)
pub const SYMBOLS: &[(&str, &str, f64)] = &[
    ("CL=F", "WTI Oil", 5.0),
    ("GC=F", "Gold", 3.0),
    ("^VIX", "VIX", 15.0),
    ("^GSPC", "S&P 500", 3.0),
    ("BTC-USD", "Bitcoin", 5.0),
];
const DEFAULT_THRESHOLD: f64 = 5.0;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn threshold(symbol: &str) -> f64 {
    SYMBOLS
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, _, t)| *t)
        .unwrap_or(DEFAULT_THRESHOLD)
}

fn display_name(symbol: &str) -> String {
    SYMBOLS
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, n, _)| n.to_string())
        .unwrap_or_else(|| symbol.to_string())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Severity of a move relative to the symbol's big-move threshold `t`:
/// ≥2t critical, ≥t high, ≥0.6t medium, ≥0.3t low.
pub fn change_to_level(symbol: &str, abs_percent: f64) -> ThreatLevel {
    let t = threshold(symbol);
    if abs_percent >= t * 2.0 {
        ThreatLevel::Critical
    } else if abs_percent >= t {
        ThreatLevel::High
    } else if abs_percent >= t * 0.6 {
        ThreatLevel::Medium
    } else if abs_percent >= t * 0.3 {
        ThreatLevel::Low
    } else {
        ThreatLevel::Info
    }
}

/// Parse one chart body. Price comes from `meta`, else the last non-null close.
pub fn parse_chart(symbol: &str, body: &str) -> Result<MarketIndicator> {
    let resp: ChartResponse = serde_json::from_str(body).context("parsing yahoo chart json")?;
    let result = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("yahoo chart for {symbol} has no result"))?;

    let closes: Vec<f64> = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| q.close.into_iter().flatten().collect())
        .unwrap_or_default();

    let price = result
        .meta
        .regular_market_price
        .or_else(|| closes.last().copied())
        .ok_or_else(|| anyhow!("yahoo chart for {symbol} has no price"))?;
    let prev = result
        .meta
        .chart_previous_close
        .or_else(|| closes.iter().rev().nth(1).copied())
        .unwrap_or(price);

    let change = price - prev;
    let change_percent = if prev != 0.0 { change / prev * 100.0 } else { 0.0 };
    let timestamp = result
        .meta
        .regular_market_time
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .unwrap_or_else(Utc::now);

    Ok(MarketIndicator {
        symbol: symbol.to_string(),
        name: display_name(symbol),
        price,
        change: round2(change),
        change_percent: round2(change_percent),
        timestamp,
    })
}

/// `None` when the move is below 0.3 × threshold.
pub fn indicator_to_event(ind: &MarketIndicator) -> Option<CrisisEvent> {
    let t = threshold(&ind.symbol);
    let abs = ind.change_percent.abs();
    if abs < t * 0.3 {
        return None;
    }
    let (direction, sign) = if ind.change >= 0.0 { ("up", "+") } else { ("down", "") };
    let note = if abs >= t {
        "Significant market move."
    } else {
        "Notable movement."
    };

    Some(CrisisEvent {
        id: format!(
            "yahoo:{}:{}",
            ind.symbol,
            content_hash(&ind.timestamp.to_rfc3339())
        ),
        title: format!("{} {direction} {sign}{}%", ind.name, ind.change_percent),
        summary: format!("{} at ${} ({sign}{}). {note}", ind.name, ind.price, ind.change),
        category: EventCategory::Economic,
        level: change_to_level(&ind.symbol, abs),
        location: None,
        timestamp: ind.timestamp,
        source: "Yahoo Finance".to_string(),
        source_tier: SourceTier::Public,
        url: None,
        actor: None,
        entities: None,
    })
}

pub struct YahooFinanceProvider {
    base: String,
    client: reqwest::Client,
    health_timeout: Duration,
}

impl YahooFinanceProvider {
    pub fn new(client: reqwest::Client, health_timeout: Duration) -> Self {
        Self {
            base: YAHOO_CHART_BASE.to_string(),
            client,
            health_timeout,
        }
    }

    pub fn with_endpoint(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn chart_url(&self, symbol: &str, range: &str) -> String {
        // symbols like ^VIX travel as a percent-encoded path segment
        format!(
            "{}/{}?interval=1d&range={range}",
            self.base.trim_end_matches('/'),
            symbol.replace('^', "%5E")
        )
    }

    async fn fetch_symbol(&self, symbol: &str) -> Result<MarketIndicator> {
        let url = self.chart_url(symbol, "2d");
        let body = get_text(&self.client, &url, "yahoo").await?;
        parse_chart(symbol, &body)
    }

    /// Latest quote per tracked symbol; failed symbols are left out.
    pub async fn fetch_indicators(&self) -> Vec<MarketIndicator> {
        let results =
            futures::future::join_all(SYMBOLS.iter().map(|(s, _, _)| self.fetch_symbol(s))).await;
        results
            .into_iter()
            .zip(SYMBOLS)
            .filter_map(|(res, (symbol, _, _))| match res {
                Ok(ind) => Some(ind),
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, symbol = %symbol, "yahoo symbol failed");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for YahooFinanceProvider {
    fn id(&self) -> &str {
        "yahoo"
    }

    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Public
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let t0 = Instant::now();
        let events: Vec<CrisisEvent> = self
            .fetch_indicators()
            .await
            .iter()
            .filter_map(indicator_to_event)
            .collect();
        record_parsed("yahoo", t0, events.len());
        Ok(options.apply(events, SYMBOLS.len()))
    }

    async fn health_check(&self) -> bool {
        let url = self.chart_url("^GSPC", "1d");
        head_ok(&self.client, &url, self.health_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_is_a_percent_encoded_segment() {
        let p = YahooFinanceProvider::new(reqwest::Client::new(), Duration::from_secs(1));
        let url = p.chart_url("^GSPC", "2d");
        assert_eq!(
            url,
            "https://query1.finance.yahoo.com/v8/finance/chart/%5EGSPC?interval=1d&range=2d"
        );
    }

    #[test]
    fn levels_scale_with_threshold() {
        assert_eq!(change_to_level("^VIX", 30.0), ThreatLevel::Critical);
        assert_eq!(change_to_level("^VIX", 9.0), ThreatLevel::Medium);
        assert_eq!(change_to_level("GC=F", 3.0), ThreatLevel::High);
        assert_eq!(change_to_level("XYZ", 1.4), ThreatLevel::Info);
        assert_eq!(change_to_level("XYZ", 1.6), ThreatLevel::Low);
    }

    #[test]
    fn price_falls_back_to_closes() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketTime":1749556800},
            "indicators":{"quote":[{"close":[100.0,null,110.0]}]}}],"error":null}}"#;
        let ind = parse_chart("CL=F", body).unwrap();
        assert_eq!(ind.price, 110.0);
        assert_eq!(ind.change, 10.0);
        assert_eq!(ind.change_percent, 10.0);
        let ev = indicator_to_event(&ind).unwrap();
        assert_eq!(ev.level, ThreatLevel::Critical);
        assert_eq!(ev.title, "WTI Oil up +10%");
    }

    #[test]
    fn small_moves_are_not_events() {
        let body = r#"{"chart":{"result":[{"meta":{"regularMarketPrice":100.5,"chartPreviousClose":100.0,"regularMarketTime":1749556800}}]}}"#;
        let ind = parse_chart("^GSPC", body).unwrap();
        assert_eq!(ind.change_percent, 0.5);
        assert!(indicator_to_event(&ind).is_none());
        assert!(parse_chart("^GSPC", r#"{"chart":{"result":null}}"#).is_err());
    }
}
