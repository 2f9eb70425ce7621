use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_ENDPOINT: &str = "https://www.youtube.com/api/timedtext";
const DEFAULT_LANG: &str = "en";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Soft outcome of the remote fallback. The fetcher never errors: network
/// faults, bad status codes and unparseable bodies all collapse into
/// `Unavailable` with a reason the orchestrator can fold into its failure
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedText {
    Transcript(String),
    Unavailable(String),
}

/// Source of transcript text independent of the page DOM.
#[allow(async_fn_in_trait)]
pub trait TranscriptSource {
    async fn fetch_transcript(&self, video_id: &str, lang: &str) -> TimedText;
}

#[derive(Clone, Debug)]
pub struct TimedTextConfig {
    pub endpoint: String,
    pub lang: String,
    pub timeout: Duration,
}

impl Default for TimedTextConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TimedTextConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(endpoint) = get("TGRAB_TIMEDTEXT_URL") {
            cfg.endpoint = endpoint;
        }
        if let Some(lang) = get("TGRAB_LANG") {
            cfg.lang = lang;
        }
        if let Some(timeout) = get("TGRAB_HTTP_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }
}

/// Client for the site's timed-text endpoint (`?v=<id>&lang=<l>&fmt=json3`).
pub struct TimedTextClient {
    http: HttpClient,
    cfg: TimedTextConfig,
}

impl TimedTextClient {
    pub fn new(cfg: TimedTextConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .context("build timedtext HTTP client")?;
        Ok(Self { http, cfg })
    }

    async fn request(&self, video_id: &str, lang: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .get(self.cfg.endpoint.trim_end_matches('/'))
            .query(&[("v", video_id), ("lang", lang), ("fmt", "json3")])
            .send()
            .await
            .context("timedtext request")?;
        if !resp.status().is_success() {
            anyhow::bail!("timedtext status {}", resp.status());
        }
        let reply: Json3Reply = resp.json().await.context("timedtext body")?;
        Ok(flatten_events(&reply))
    }
}

impl TranscriptSource for TimedTextClient {
    async fn fetch_transcript(&self, video_id: &str, lang: &str) -> TimedText {
        match self.request(video_id, lang).await {
            Ok(Some(text)) => TimedText::Transcript(text),
            Ok(None) => TimedText::Unavailable("no caption data".to_string()),
            Err(err) => {
                warn!(video_id, "timedtext fallback failed: {err:#}");
                TimedText::Unavailable(format!("timedtext request failed: {err:#}"))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Json3Reply {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

// Segments concatenate with no separator inside an event; events join with a
// single space. An absent or effectively empty event list is "no data".
fn flatten_events(reply: &Json3Reply) -> Option<String> {
    let mut out = String::new();
    for event in &reply.events {
        let mut text = String::new();
        for seg in &event.segs {
            text.push_str(&seg.utf8);
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
    }
    if out.is_empty() { None } else { Some(out) }
}
