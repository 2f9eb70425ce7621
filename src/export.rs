use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::extraction::{self, RequestOpts};
use crate::extraction::types::ExtractOutcome;
use crate::telemetry::{self};
use crate::telemetry::ops::export::Phase as ExportPhase;

/// The downloadable transcript document: the extraction result plus the
/// derived counts and timestamps callers expect in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: String,
    pub url: String,
    pub transcript: String,
    #[serde(rename = "wordCount")]
    pub word_count: usize,
    #[serde(rename = "characterCount")]
    pub character_count: usize,
    #[serde(rename = "extractedAt")]
    pub extracted_at: DateTime<Utc>,
    /// Milliseconds since the epoch, the flat form of `extractedAt`.
    pub timestamp: i64,
}

impl ExportDocument {
    pub fn new(video_id: String, title: String, url: String, transcript: String) -> Self {
        let now = Utc::now();
        Self {
            word_count: transcript.split_whitespace().count(),
            character_count: transcript.chars().count(),
            video_id,
            title,
            url,
            transcript,
            extracted_at: now,
            timestamp: now.timestamp_millis(),
        }
    }
}

#[derive(Args)]
pub struct ExportCmd {
    /// Watch URL or bare video id
    pub url: String,
    /// Read the page HTML from a file instead of fetching the URL
    #[arg(long)]
    pub html: Option<PathBuf>,
    /// Caption language for the remote fallback (default: TGRAB_LANG or "en")
    #[arg(long)]
    pub lang: Option<String>,
    /// JSON file replacing the built-in selector tiers
    #[arg(long)]
    pub tiers: Option<PathBuf>,
    /// Write the document here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
    #[arg(long)]
    pub ttl: Option<String>,
}

pub async fn run(args: ExportCmd, cancel: CancellationToken) -> Result<()> {
    let log = telemetry::export();
    let _g = log
        .root_span_kv([
            ("url", args.url.clone()),
            ("out", format!("{:?}", args.out)),
        ])
        .entered();

    let html_override = match &args.html {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("read page HTML from {}", path.display()))?,
        ),
        None => None,
    };

    let opts = RequestOpts {
        lang: args.lang.clone(),
        tiers: args.tiers.clone(),
        no_cache: args.no_cache,
        refresh: false,
        cache_file: args.cache_file.clone(),
        ttl: args.ttl.clone(),
    };

    let outcome = {
        let _s = log.span(&ExportPhase::Extract).entered();
        extraction::obtain(&args.url, html_override, &opts, &cancel).await?
    };

    let doc = match outcome {
        ExtractOutcome::Success { transcript, video_title, video_url, content_id, .. } => {
            ExportDocument::new(content_id, video_title, video_url, transcript)
        }
        ExtractOutcome::Failure { error, .. } => {
            anyhow::bail!("nothing to export: {error}");
        }
    };

    let raw = serde_json::to_string_pretty(&doc).context("serialize export document")?;
    match &args.out {
        Some(path) => {
            let _s = log.span(&ExportPhase::Write).entered();
            fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
            if telemetry::config::json_mode() {
                log.result(&doc)?;
            } else {
                log.info(format!(
                    "💾 {} — {} words, {} chars",
                    path.display(),
                    doc.word_count,
                    doc.character_count,
                ));
            }
        }
        None => {
            if telemetry::config::json_mode() {
                log.result(&doc)?;
            } else {
                println!("{raw}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_and_characters() {
        let doc = ExportDocument::new(
            "abc".into(),
            "T".into(),
            "u".into(),
            "Hello there world".into(),
        );
        assert_eq!(doc.word_count, 3);
        assert_eq!(doc.character_count, 17);
        assert_eq!(doc.timestamp, doc.extracted_at.timestamp_millis());
    }

    #[test]
    fn serializes_with_contract_field_names() {
        let doc = ExportDocument::new("abc".into(), "T".into(), "u".into(), "hi".into());
        let v = serde_json::to_value(&doc).unwrap();
        assert!(v.get("videoId").is_some());
        assert!(v.get("wordCount").is_some());
        assert!(v.get("characterCount").is_some());
        assert!(v.get("extractedAt").is_some());
        assert!(v.get("timestamp").is_some());
    }

    #[test]
    fn empty_transcript_counts_are_zero() {
        let doc = ExportDocument::new("abc".into(), "T".into(), "u".into(), String::new());
        assert_eq!(doc.word_count, 0);
        assert_eq!(doc.character_count, 0);
    }
}
