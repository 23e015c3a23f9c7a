//! Translation batch helper: provider abstraction + in-memory cache.
//!
//! Only items whose title or summary is not cached go into one numbered
//! prompt. Reply blocks that cannot be parsed keep the original text, and
//! any provider failure returns the input unchanged.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::TtlCache;
use crate::ingest::ensure_metrics_described;
use crate::ingest::types::CrisisEvent;

pub const DEFAULT_TRANSLATE_TTL: Duration = Duration::from_secs(600);
pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

static RE_BLOCK_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"---|\n\[\d+\]").unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)TITLE:\s*(.+)").unwrap());
static RE_SUMMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)SUMMARY:\s*(.+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "zh-TW")]
    ZhTw,
    #[serde(rename = "ja")]
    Ja,
    #[serde(rename = "ko")]
    Ko,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::ZhTw => "zh-TW",
            Locale::Ja => "ja",
            Locale::Ko => "ko",
        }
    }

    fn language(&self) -> &'static str {
        match self {
            Locale::ZhTw => "Traditional Chinese (繁體中文)",
            Locale::Ja => "Japanese (日本語)",
            Locale::Ko => "Korean (한국어)",
        }
    }
}

impl FromStr for Locale {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "zh-TW" | "zh-tw" => Ok(Locale::ZhTw),
            "ja" => Ok(Locale::Ja),
            "ko" => Ok(Locale::Ko),
            other => Err(anyhow!("unsupported locale `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPair {
    pub title: String,
    pub summary: String,
}

/// Low-level text generation call. `None` on any failure.
pub trait Translator: Send + Sync + 'static {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// Gemini `generateContent`. Requires `GOOGLE_API_KEY`.
pub struct GeminiTranslator {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiTranslator {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self {
            http,
            api_key,
            endpoint: GEMINI_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn complete_impl(&self, prompt: &str) -> Option<String> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            tracing::warn!(target: "translate", status = %resp.status(), "gemini returned non-2xx");
            return None;
        }
        let v: Value = resp.json().await.ok()?;
        let text: String = v
            .pointer("/candidates/0/content/parts")?
            .as_array()?
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl Translator for GeminiTranslator {
    fn complete<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.complete_impl(prompt))
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Always `None`; used when no API key is configured.
pub struct DisabledTranslator;

impl Translator for DisabledTranslator {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic translator for tests: answers with a fixed reply and counts calls.
pub struct MockTranslator {
    reply: Option<String>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockTranslator {
    pub fn new(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Translator for MockTranslator {
    fn complete<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let out = self.reply.clone();
        Box::pin(async move { out })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Gemini when a key is present, otherwise disabled.
pub fn build_translator(api_key: Option<String>, http: reqwest::Client) -> Arc<dyn Translator> {
    match api_key {
        Some(key) => Arc::new(GeminiTranslator::new(http, key)),
        None => Arc::new(DisabledTranslator),
    }
}

fn build_prompt(locale: Locale, items: &[&TextPair]) -> String {
    let numbered = items
        .iter()
        .enumerate()
        .map(|(i, it)| format!("[{i}] TITLE: {}\nSUMMARY: {}", it.title, it.summary))
        .collect::<Vec<_>>()
        .join("\n---\n");
    format!(
        "Translate the following news items to {}. Keep the format exactly. \
         Return ONLY the translations, no explanation.\n\n{numbered}",
        locale.language()
    )
}

/// Split a model reply into per-item (title, summary); `None` for blocks
/// missing either marker.
pub fn parse_reply(reply: &str) -> Vec<Option<TextPair>> {
    RE_BLOCK_SPLIT
        .split(reply)
        .filter(|b| !b.trim().is_empty())
        .map(|block| {
            let title = RE_TITLE.captures(block)?.get(1)?.as_str().trim().to_string();
            let summary = RE_SUMMARY.captures(block)?.get(1)?.as_str().trim().to_string();
            Some(TextPair { title, summary })
        })
        .collect()
}

pub struct TranslationService {
    translator: Arc<dyn Translator>,
    cache: TtlCache,
    ttl: Duration,
}

impl TranslationService {
    pub fn new(translator: Arc<dyn Translator>, ttl: Duration) -> Self {
        Self {
            translator,
            cache: TtlCache::new(),
            ttl,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.translator.name()
    }

    fn key(locale: Locale, kind: char, text: &str) -> String {
        format!("{}/{kind}:{text}", locale.code())
    }

    fn cached(&self, locale: Locale, item: &TextPair) -> Option<TextPair> {
        let title = self.cache.get::<String>(&Self::key(locale, 't', &item.title))?;
        let summary = self.cache.get::<String>(&Self::key(locale, 's', &item.summary))?;
        Some(TextPair {
            title: (*title).clone(),
            summary: (*summary).clone(),
        })
    }

    /// Translate every item to `locale`. Never fails: on any problem the
    /// affected items come back untranslated.
    pub async fn translate_batch(&self, items: &[TextPair], locale: Locale) -> Vec<TextPair> {
        ensure_metrics_described();
        let mut out: Vec<TextPair> = items.to_vec();
        let mut pending: Vec<usize> = Vec::new();

        for (i, item) in items.iter().enumerate() {
            match self.cached(locale, item) {
                Some(hit) => {
                    counter!("translate_cache_hits_total").increment(1);
                    out[i] = hit;
                }
                None => pending.push(i),
            }
        }
        if pending.is_empty() {
            return out;
        }

        let batch: Vec<&TextPair> = pending.iter().map(|&i| &items[i]).collect();
        let prompt = build_prompt(locale, &batch);
        let Some(reply) = self.translator.complete(&prompt).await else {
            counter!("translate_failures_total").increment(1);
            tracing::debug!(target: "translate", provider = self.translator.name(), "no translation, returning originals");
            return out;
        };

        for (slot, parsed) in pending.iter().zip(parse_reply(&reply)) {
            let Some(tr) = parsed else { continue };
            let original = &items[*slot];
            self.cache.set(
                Self::key(locale, 't', &original.title),
                Arc::new(tr.title.clone()),
                self.ttl,
            );
            self.cache.set(
                Self::key(locale, 's', &original.summary),
                Arc::new(tr.summary.clone()),
                self.ttl,
            );
            out[*slot] = tr;
        }
        out
    }

    /// Events with title/summary rewritten for `locale`; all other fields kept.
    pub async fn translate_events(&self, events: &[CrisisEvent], locale: Locale) -> Vec<CrisisEvent> {
        let pairs: Vec<TextPair> = events
            .iter()
            .map(|e| TextPair {
                title: e.title.clone(),
                summary: e.summary.clone(),
            })
            .collect();
        let translated = self.translate_batch(&pairs, locale).await;
        events
            .iter()
            .zip(translated)
            .map(|(ev, tr)| CrisisEvent {
                title: tr.title,
                summary: tr.summary,
                ..ev.clone()
            })
            .collect()
    }
}
