// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PATH: &str = "CRISIS_PIPELINE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Short id used in event ids (`rss:<name>:<hash>`).
    pub name: String,
    pub url: String,
    /// Human-readable label stored in `CrisisEvent::source`.
    pub label: String,
}

impl FeedConfig {
    fn new(name: &str, url: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            label: label.to_string(),
        }
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new("reuters", "https://feeds.reuters.com/Reuters/worldNews", "Reuters"),
        FeedConfig::new("ap", "https://rsshub.app/apnews/topics/world-news", "AP News"),
        FeedConfig::new("bbc", "https://feeds.bbci.co.uk/news/world/rss.xml", "BBC News"),
        FeedConfig::new("nhk", "https://www3.nhk.or.jp/rss/news/cat6.xml", "NHK World"),
        FeedConfig::new("aljazeera", "https://www.aljazeera.com/xml/rss/all.xml", "Al Jazeera"),
    ]
}

/// Tunables for the whole pipeline. Every field has a default, so partial
/// files are fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub events_ttl_ms: u64,
    pub default_limit: usize,
    /// Outer guard around one provider's whole `fetch`.
    pub source_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub markets_ttl_ms: u64,
    pub translate_ttl_ms: u64,
    pub user_agent: String,
    pub digest_dir: PathBuf,
    pub rss_feeds: Vec<FeedConfig>,
    pub enable_private: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            events_ttl_ms: 30_000,
            default_limit: 200,
            source_timeout_secs: 35,
            http_timeout_secs: 10,
            health_timeout_secs: 3,
            llm_timeout_secs: 30,
            markets_ttl_ms: 300_000,
            translate_ttl_ms: 600_000,
            user_agent: "CrisisMap/1.0".to_string(),
            digest_dir: PathBuf::from("private/digests"),
            rss_feeds: default_feeds(),
            enable_private: true,
        }
    }
}

impl PipelineConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<PipelineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading pipeline config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $CRISIS_PIPELINE_CONFIG
/// 2) config/pipeline.toml
/// 3) config/pipeline.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<PipelineConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/pipeline.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/pipeline.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(PipelineConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<PipelineConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing pipeline config json");
    }
    if let Ok(cfg) = toml::from_str::<PipelineConfig>(s) {
        return Ok(cfg);
    }
    serde_json::from_str(s).map_err(|_| anyhow!("unsupported pipeline config format"))
}

/// Upstream credentials, read from the environment. Empty values count as absent.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub acled_api_key: Option<String>,
    pub acled_email: Option<String>,
    pub firms_map_key: Option<String>,
    pub x_bearer_token: Option<String>,
    pub xai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            acled_api_key: var("ACLED_API_KEY"),
            acled_email: var("ACLED_EMAIL"),
            firms_map_key: var("FIRMS_MAP_KEY"),
            x_bearer_token: var("X_BEARER_TOKEN"),
            xai_api_key: var("XAI_API_KEY"),
            google_api_key: var("GOOGLE_API_KEY"),
        }
    }
}
