use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::telemetry::{self};
use crate::telemetry::ops::render::Phase as RenderPhase;

// The rendering backend is an opaque collaborator with a fixed contract:
// POST /asl_from_youtube {url} -> {url} | {error}. No retry, no backoff.
const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RenderReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct RenderClient {
    http: HttpClient,
    endpoint: String,
}

impl RenderClient {
    pub fn new(endpoint: Option<&str>) -> Result<Self> {
        let endpoint = endpoint
            .map(|s| s.to_string())
            .or_else(|| std::env::var("TGRAB_RENDER_URL").ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("build render HTTP client")?;
        Ok(Self { http, endpoint })
    }

    pub async fn render_from_watch_url(&self, watch_url: &str) -> Result<RenderReply> {
        let target = format!("{}/asl_from_youtube", self.endpoint.trim_end_matches('/'));
        let reply = self
            .http
            .post(&target)
            .json(&RenderRequest { url: watch_url })
            .send()
            .await
            .with_context(|| format!("post {target}"))?
            .json::<RenderReply>()
            .await
            .context("decode render reply")?;
        Ok(reply)
    }
}

#[derive(Args)]
pub struct RenderCmd {
    /// Watch URL to hand to the rendering backend
    pub url: String,
    /// Backend base URL (default http://localhost:5000, or TGRAB_RENDER_URL)
    #[arg(long)]
    pub endpoint: Option<String>,
}

pub async fn run(args: RenderCmd) -> Result<()> {
    let log = telemetry::render();
    let _g = log.root_span_kv([("url", args.url.clone())]).entered();

    let client = RenderClient::new(args.endpoint.as_deref())?;
    let reply = {
        let _s = log.span(&RenderPhase::Request).entered();
        client.render_from_watch_url(&args.url).await?
    };

    if telemetry::config::json_mode() {
        log.result(&reply)?;
        return Ok(());
    }
    match (&reply.url, &reply.error) {
        (Some(media), _) => log.info(format!("🎬 rendered: {media}")),
        (None, Some(error)) => {
            // Backend errors come through verbatim.
            log.error(format!("❌ {error}"));
            anyhow::bail!("render backend reported an error");
        }
        (None, None) => anyhow::bail!("render backend returned neither url nor error"),
    }
    Ok(())
}
