use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::check;
use crate::extraction::config::ExtractConfig;
use crate::extraction::{self, RequestOpts};
use crate::telemetry::{self};
use crate::telemetry::ops::serve::Phase as ServePhase;

/// The caller-facing message contract, one JSON object per line on stdin.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "extractTranscript")]
    ExtractTranscript {
        url: String,
        #[serde(default)]
        lang: Option<String>,
    },
    #[serde(rename = "checkTranscriptAvailability")]
    CheckTranscriptAvailability { url: String },
}

#[derive(Args)]
pub struct ServeCmd {
    /// Caption language for the remote fallback (default: TGRAB_LANG or "en")
    #[arg(long)]
    pub lang: Option<String>,
    /// JSON file replacing the built-in selector tiers
    #[arg(long)]
    pub tiers: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
    #[arg(long)]
    pub ttl: Option<String>,
}

impl ServeCmd {
    fn opts(&self) -> RequestOpts {
        RequestOpts {
            lang: self.lang.clone(),
            tiers: self.tiers.clone(),
            no_cache: self.no_cache,
            refresh: false,
            cache_file: self.cache_file.clone(),
            ttl: self.ttl.clone(),
        }
    }
}

/// Answer one request. Extraction failures are normal replies; only the
/// request envelope itself can be "wrong", and that too becomes a reply.
pub async fn handle_request(
    req: Request,
    opts: &RequestOpts,
    cancel: &CancellationToken,
) -> Value {
    match req {
        Request::ExtractTranscript { url, lang } => {
            let mut opts = opts.clone();
            if lang.is_some() {
                opts.lang = lang;
            }
            match extraction::obtain(&url, None, &opts, cancel).await {
                Ok(outcome) => serde_json::to_value(&outcome)
                    .unwrap_or_else(|e| error_reply(&format!("encode reply: {e}"))),
                Err(err) => error_reply(&format!("{err:#}")),
            }
        }
        Request::CheckTranscriptAvailability { url } => {
            let cfg = match ExtractConfig::load(opts.tiers.as_deref()) {
                Ok(cfg) => cfg,
                Err(err) => return error_reply(&format!("{err:#}")),
            };
            let reply = check::check_availability(&cfg, &url, None).await;
            serde_json::to_value(&reply)
                .unwrap_or_else(|e| error_reply(&format!("encode reply: {e}")))
        }
    }
}

/// Parse-and-dispatch for one line. A line that is not a valid request is a
/// communication failure, surfaced verbatim in the reply; the loop lives on.
pub async fn handle_line(line: &str, opts: &RequestOpts, cancel: &CancellationToken) -> Value {
    match serde_json::from_str::<Request>(line) {
        Ok(req) => handle_request(req, opts, cancel).await,
        Err(err) => error_reply(&format!("bad request: {err}")),
    }
}

fn error_reply(message: &str) -> Value {
    json!({ "success": false, "error": message })
}

pub async fn run(args: ServeCmd, cancel: CancellationToken) -> Result<()> {
    let log = telemetry::serve();
    let _g = log
        .root_span_kv([("lang", args.lang.clone().unwrap_or_else(|| "env".to_string()))])
        .entered();
    let opts = args.opts();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let reply = {
            let _s = log.span(&ServePhase::Handle).entered();
            handle_line(&line, &opts, &cancel).await
        };
        let mut out = serde_json::to_vec(&reply)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    log.info("👋 serve loop closed");
    Ok(())
}
