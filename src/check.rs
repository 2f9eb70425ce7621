use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;
use url::Url;

use crate::extraction::config::ExtractConfig;
use crate::extraction::resolver;
use crate::extraction::types::AvailabilityReply;
use crate::fetch;
use crate::page::{HtmlPage, PageDriver};
use crate::telemetry::{self};
use crate::telemetry::ops::check::Phase as CheckPhase;
use crate::video;

#[derive(Args)]
pub struct CheckCmd {
    /// Watch URL or bare video id
    pub url: String,
    /// Read the page HTML from a file instead of fetching the URL
    #[arg(long)]
    pub html: Option<PathBuf>,
    /// JSON file replacing the built-in selector tiers
    #[arg(long)]
    pub tiers: Option<PathBuf>,
}

/// Whether the page shows any sign of a transcript: the panel is already
/// open, a toggle control exists, or a selector tier matches content.
pub fn probe_page(page: &HtmlPage, cfg: &ExtractConfig) -> bool {
    page.exists(&cfg.panel.open_probe)
        || page.exists_attr_contains(&cfg.panel.toggle_attr, &cfg.panel.toggle_needle)
        || !resolver::resolve(page, &cfg.tiers).is_empty()
}

/// Availability probe for a watch URL. A page that cannot be fetched counts
/// as unavailable rather than an error; the id still comes back when the URL
/// alone yields one.
pub async fn check_availability(
    cfg: &ExtractConfig,
    requested: &str,
    html_override: Option<String>,
) -> AvailabilityReply {
    let content_id = video::extract_video_id(requested);

    let html = match html_override {
        Some(html) => Some(html),
        None => {
            let target = if Url::parse(requested).is_ok() {
                Some(requested.to_string())
            } else {
                content_id.as_ref().map(|id| format!("https://www.youtube.com/watch?v={id}"))
            };
            match target {
                Some(url) => match fetch::client() {
                    Ok(client) => match fetch::fetch_page(&client, &url).await {
                        Ok(html) => Some(html),
                        Err(err) => {
                            warn!("availability fetch failed: {err:#}");
                            None
                        }
                    },
                    Err(err) => {
                        warn!("availability client failed: {err:#}");
                        None
                    }
                },
                None => None,
            }
        }
    };

    match html {
        Some(html) => {
            let page = HtmlPage::parse(&html);
            let meta = video::resolve_meta(&page, requested);
            let id = meta.id.or(content_id);
            AvailabilityReply {
                available: id.is_some() && probe_page(&page, cfg),
                content_id: id,
                video_title: if meta.title.is_empty() { None } else { Some(meta.title) },
            }
        }
        None => AvailabilityReply { available: false, content_id, video_title: None },
    }
}

pub async fn run(args: CheckCmd) -> Result<()> {
    let log = telemetry::check();
    let _g = log.root_span_kv([("url", args.url.clone())]).entered();

    let html_override = match &args.html {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("read page HTML from {}", path.display()))?,
        ),
        None => None,
    };

    let cfg = ExtractConfig::load(args.tiers.as_deref())?;
    let reply = {
        let _s = log.span(&CheckPhase::Probe).entered();
        check_availability(&cfg, &args.url, html_override).await
    };

    if telemetry::config::json_mode() {
        log.result(&reply)?;
    } else if reply.available {
        log.info(format!(
            "✅ transcript available — id={} title={:?}",
            reply.content_id.as_deref().unwrap_or("?"),
            reply.video_title.as_deref().unwrap_or(""),
        ));
    } else {
        log.info("❌ no transcript detected");
    }
    Ok(())
}
