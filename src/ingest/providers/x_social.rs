// src/ingest/providers/x_social.rs
//! Wire-desk accounts on X.
//!
//! The v2 recent-search API is tried first. When it has no token, fails or
//! comes back empty, the xAI responses API with its `x_search` tool is asked
//! for a JSON array instead; the array is cut out of free-form model text and
//! anything unparseable yields no posts.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::actors::primary_actor;
use crate::classify::detect_category_or;
use crate::geocoder::geocode;
use crate::ingest::types::{CrisisEvent, EventCategory, FetchOptions, SourceProvider, SourceTier};
use crate::ingest::{content_hash, record_parsed, sort_newest_first};
use crate::scorer::score_threat_level;

pub const X_SEARCH_ENDPOINT: &str = "https://api.x.com/2/tweets/search/recent";
pub const XAI_RESPONSES_ENDPOINT: &str = "https://api.x.ai/v1/responses";
const XAI_MODEL: &str = "grok-4-1-fast-reasoning";

const ACCOUNTS: &[&str] = &["DeItaone", "BNONews", "disclosetv"];
const KEYWORDS: &str = "Iran OR strike OR nuclear OR military OR missile OR conflict";
const CRISIS_QUERY: &str =
    "Iran strike OR nuclear OR military attack OR conflict OR missile from:DeItaone OR from:BNONews OR from:disclosetv";
const DEFAULT_LIMIT: usize = 10;

static RE_JSON_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

/// One post, whichever path produced it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Post {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub url: String,
}

// --- X API v2 ---
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<String>,
    author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Parse a v2 recent-search body, resolving author ids to handles.
pub fn parse_search_response(body: &str) -> Result<Vec<Post>> {
    let resp: SearchResponse = serde_json::from_str(body).context("parsing x search json")?;
    let users = resp.includes.map(|i| i.users).unwrap_or_default();
    Ok(resp
        .data
        .into_iter()
        .map(|t| {
            let handle = t
                .author_id
                .as_deref()
                .and_then(|a| users.iter().find(|u| u.id == a))
                .map(|u| u.username.as_str())
                .unwrap_or("unknown");
            Post {
                author: format!("@{handle}"),
                time: t.created_at.unwrap_or_default(),
                url: format!("https://x.com/i/status/{}", t.id),
                text: t.text,
            }
        })
        .collect())
}

/// First `output_text` of the first `message` item in a responses-API body.
fn output_text(resp: &Value) -> Option<&str> {
    resp.get("output")?
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("message"))
        .filter_map(|item| item.get("content")?.as_array())
        .flatten()
        .find(|c| c.get("type").and_then(Value::as_str) == Some("output_text"))
        .and_then(|c| c.get("text")?.as_str())
}

/// Pull the outermost `[...]` out of model prose and decode it. Never fails.
pub fn extract_posts(model_text: &str) -> Vec<Post> {
    RE_JSON_ARRAY
        .find(model_text)
        .and_then(|m| serde_json::from_str::<Vec<Post>>(m.as_str()).ok())
        .unwrap_or_default()
}

pub fn posts_to_events(posts: Vec<Post>) -> Vec<CrisisEvent> {
    posts
        .into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| {
            let category = detect_category_or(&p.text, EventCategory::Conflict);
            let key = if p.url.is_empty() { &p.text } else { &p.url };
            CrisisEvent {
                id: format!("x-grok:{}", content_hash(key)),
                title: p.text.chars().take(120).collect(),
                level: score_threat_level(&p.text, "", category),
                location: geocode(&p.text),
                timestamp: DateTime::parse_from_rfc3339(p.time.trim())
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                source: format!("x:{}", p.author),
                source_tier: SourceTier::Private,
                actor: primary_actor(&p.text).map(str::to_string),
                url: (!p.url.is_empty()).then(|| p.url.clone()),
                summary: p.text,
                category,
                entities: None,
            }
        })
        .collect()
}

pub struct XSocialProvider {
    bearer_token: Option<String>,
    xai_api_key: Option<String>,
    search_endpoint: String,
    xai_endpoint: String,
    client: reqwest::Client,
    search_timeout: Duration,
    llm_timeout: Duration,
}

impl XSocialProvider {
    pub fn new(
        bearer_token: Option<String>,
        xai_api_key: Option<String>,
        client: reqwest::Client,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            bearer_token,
            xai_api_key,
            search_endpoint: X_SEARCH_ENDPOINT.to_string(),
            xai_endpoint: XAI_RESPONSES_ENDPOINT.to_string(),
            client,
            search_timeout: Duration::from_secs(5),
            llm_timeout,
        }
    }

    pub fn with_endpoints(mut self, search: impl Into<String>, xai: impl Into<String>) -> Self {
        self.search_endpoint = search.into();
        self.xai_endpoint = xai.into();
        self
    }

    async fn search_recent(&self, token: &str) -> Result<Vec<Post>> {
        let from = ACCOUNTS
            .iter()
            .map(|a| format!("from:{a}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let query = format!("{from} ({KEYWORDS})");
        let resp = self
            .client
            .get(&self.search_endpoint)
            .query(&[
                ("query", query.as_str()),
                ("max_results", "10"),
                ("tweet.fields", "created_at,author_id"),
                ("expansions", "author_id"),
            ])
            .bearer_auth(token)
            .timeout(self.search_timeout)
            .send()
            .await
            .context("x search http get()")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("x search returned {status}"));
        }
        let body = resp.text().await.context("x search http .text()")?;
        parse_search_response(&body)
    }

    async fn search_via_model(&self, key: &str, query: &str) -> Result<Vec<Post>> {
        let prompt = format!(
            "Search X/Twitter for: {query}\n\nReturn ONLY a JSON array of the 10 most recent results. \
             Each object must have: {{\"text\": \"full tweet\", \"author\": \"@handle\", \"time\": \"ISO 8601\", \"url\": \"tweet url\"}}\n\n\
             No explanation, just the JSON array."
        );
        let body = json!({
            "model": XAI_MODEL,
            "tools": [{ "type": "x_search" }],
            "input": [{ "role": "user", "content": prompt }],
        });
        let resp = self
            .client
            .post(&self.xai_endpoint)
            .bearer_auth(key)
            .json(&body)
            .timeout(self.llm_timeout)
            .send()
            .await
            .context("xai responses post()")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("xai responses returned {status}"));
        }
        let v: Value = resp.json().await.context("xai responses json")?;
        Ok(output_text(&v).map(extract_posts).unwrap_or_default())
    }
}

#[async_trait]
impl SourceProvider for XSocialProvider {
    fn id(&self) -> &str {
        "x_social"
    }

    fn name(&self) -> &str {
        "X/Grok"
    }

    fn tier(&self) -> SourceTier {
        SourceTier::Private
    }

    async fn fetch(&self, options: &FetchOptions) -> Result<Vec<CrisisEvent>> {
        let t0 = Instant::now();
        let mut posts = Vec::new();
        // fixed keyword search ignores `query`, so it is filtered here instead
        let mut from_keyword_search = false;

        if let Some(token) = self.bearer_token.as_deref() {
            match self.search_recent(token).await {
                Ok(v) => {
                    from_keyword_search = !v.is_empty();
                    posts = v;
                }
                Err(e) => tracing::warn!(target: "ingest", error = ?e, "x search failed, trying model search"),
            }
        }

        if posts.is_empty() {
            if let Some(key) = self.xai_api_key.as_deref() {
                let query = options
                    .query
                    .as_deref()
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or(CRISIS_QUERY);
                match self.search_via_model(key, query).await {
                    Ok(v) => posts = v,
                    Err(e) => tracing::warn!(target: "ingest", error = ?e, "xai search failed"),
                }
            }
        }

        let mut events = posts_to_events(posts);
        record_parsed("x_social", t0, events.len());
        sort_newest_first(&mut events);

        if from_keyword_search {
            return Ok(options.apply(events, DEFAULT_LIMIT));
        }
        // the model search already ran `query` upstream
        let post = FetchOptions {
            query: None,
            ..options.clone()
        };
        Ok(post.apply(events, DEFAULT_LIMIT))
    }

    async fn health_check(&self) -> bool {
        self.bearer_token.is_some() || self.xai_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_array_from_prose() {
        let text = "Sure! Here you go:\n```json\n[{\"text\":\"IDF strikes Hezbollah targets\",\"author\":\"@BNONews\",\"time\":\"2025-06-10T12:00:00Z\",\"url\":\"https://x.com/i/status/1\"}]\n```";
        let posts = extract_posts(text);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author, "@BNONews");
        assert!(extract_posts("no json here").is_empty());
        assert!(extract_posts("[not, valid json]").is_empty());
    }

    #[test]
    fn events_use_shared_heuristics() {
        let posts = vec![Post {
            text: "Netanyahu says talks are over".into(),
            author: "@DeItaone".into(),
            time: "not a date".into(),
            url: String::new(),
        }];
        let ev = &posts_to_events(posts)[0];
        assert_eq!(ev.source, "x:@DeItaone");
        assert_eq!(ev.actor.as_deref(), Some("Netanyahu"));
        assert_eq!(ev.id, format!("x-grok:{}", content_hash("Netanyahu says talks are over")));
        assert!(ev.url.is_none());
        assert_eq!(ev.source_tier, SourceTier::Private);
    }

    #[test]
    fn v2_authors_resolve_to_handles() {
        let body = r#"{"data":[{"id":"9","text":"Missile launch reported","created_at":"2025-06-10T12:00:00Z","author_id":"u1"},
                                {"id":"10","text":"x","author_id":"u2"}],
                       "includes":{"users":[{"id":"u1","username":"BNONews"}]}}"#;
        let posts = parse_search_response(body).unwrap();
        assert_eq!(posts[0].author, "@BNONews");
        assert_eq!(posts[0].url, "https://x.com/i/status/9");
        assert_eq!(posts[1].author, "@unknown");
    }

    #[tokio::test]
    async fn no_credentials_no_posts() {
        let p = XSocialProvider::new(None, None, reqwest::Client::new(), Duration::from_secs(1));
        assert!(p.fetch(&FetchOptions::default()).await.unwrap().is_empty());
        assert!(!p.health_check().await);
    }
}
