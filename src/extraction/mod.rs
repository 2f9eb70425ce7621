use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span};
use url::Url;

use crate::cache::{self, CacheEntry, TranscriptCache};
use crate::fetch;
use crate::page::{HtmlPage, PageDriver};
use crate::telemetry::{self};
use crate::telemetry::ops::extract::Phase as ExtractPhase;
use crate::video::{self, VideoMeta};

pub mod assemble;
pub mod config;
pub mod panel;
pub mod remote;
pub mod resolver;
pub mod types;

use config::ExtractConfig;
use remote::{TimedText, TimedTextClient, TimedTextConfig, TranscriptSource};
use types::{ExtractOutcome, Method};

#[derive(Args)]
pub struct ExtractCmd {
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
    /// Skip the cache entirely (no read, no write)
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
    /// Ignore a fresh cached entry but still store the new result
    #[arg(long, default_value_t = false)]
    pub refresh: bool,
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
    /// Cache TTL, e.g. "3600", "45m", "1h"
    #[arg(long)]
    pub ttl: Option<String>,
}

/// The extraction pipeline with everything it needs to run a request:
/// selector configuration, the timed-text fallback client and the page
/// fetcher. Owns no cache; callers decide whether and where to cache.
pub struct Extractor {
    cfg: ExtractConfig,
    remote: TimedTextClient,
    http: reqwest::Client,
    lang: String,
}

impl Extractor {
    /// `lang` is the `--lang` flag; when absent, the environment-configured
    /// language (`TGRAB_LANG`, default "en") stays in force.
    pub fn new(cfg: ExtractConfig, lang: Option<String>) -> Result<Self> {
        let mut tt = TimedTextConfig::from_env();
        if let Some(lang) = lang {
            tt.lang = lang;
        }
        let lang = tt.lang.clone();
        Ok(Self {
            cfg,
            remote: TimedTextClient::new(tt)?,
            http: fetch::client()?,
            lang,
        })
    }

    /// Run one extraction for a watch URL (or bare id), optionally against
    /// pre-supplied page HTML. Always produces an outcome: even a failed page
    /// fetch only removes the DOM path, it does not abort the request.
    pub async fn extract(
        &self,
        requested: &str,
        html_override: Option<String>,
        cancel: &CancellationToken,
    ) -> ExtractOutcome {
        let fetched = match html_override {
            Some(html) => Ok(html),
            None => {
                let _s = info_span!("fetch_page").entered();
                self.fetch_watch_page(requested).await
            }
        };
        match fetched {
            Ok(html) => {
                let mut page = HtmlPage::parse(&html);
                let meta = video::resolve_meta(&page, requested);
                run_pipeline(&mut page, &self.remote, &meta, &self.cfg, &self.lang, cancel).await
            }
            Err(err) => {
                // No DOM to query; the remote fallback is all that is left.
                let meta = VideoMeta {
                    id: video::extract_video_id(requested),
                    title: String::new(),
                    url: requested.to_string(),
                };
                remote_fallback(
                    &self.remote,
                    &meta,
                    &format!("page fetch failed: {err:#}"),
                    &self.lang,
                )
                .await
            }
        }
    }

    async fn fetch_watch_page(&self, requested: &str) -> Result<String> {
        let url = if Url::parse(requested).is_ok() {
            requested.to_string()
        } else if let Some(id) = video::extract_video_id(requested) {
            format!("https://www.youtube.com/watch?v={id}")
        } else {
            anyhow::bail!("'{requested}' is neither a URL nor a video id");
        };
        fetch::fetch_page(&self.http, &url).await
    }
}

/// The linear extraction pipeline: panel activation, tiered selector
/// resolution, assembly, then the remote fallback. Infallible by contract;
/// every internal failure is folded into the returned outcome.
pub async fn run_pipeline<P, R>(
    page: &mut P,
    remote: &R,
    meta: &VideoMeta,
    cfg: &ExtractConfig,
    lang: &str,
    cancel: &CancellationToken,
) -> ExtractOutcome
where
    P: PageDriver,
    R: TranscriptSource,
{
    {
        let _s = info_span!("activate_panel").entered();
        panel::activate(page, &cfg.panel, cancel).await;
    }

    let matched = {
        let _s = info_span!("resolve_selectors").entered();
        resolver::resolve(&*page, &cfg.tiers)
    };

    if !matched.is_empty() {
        let transcript = assemble::assemble(&matched.fragments);
        if !transcript.is_empty() {
            info!(
                tier = matched.tier.as_deref().unwrap_or("?"),
                fragments = matched.fragments.len(),
                chars = transcript.len(),
                "transcript extracted from DOM",
            );
            return ExtractOutcome::success(
                transcript,
                meta.title.clone(),
                meta.url.clone(),
                meta.id.clone().unwrap_or_default(),
                Some(Method::Dom),
            );
        }
    }

    let dom_reason = match &matched.tier {
        Some(tier) => format!("selector tier '{tier}' matched only empty fragments"),
        None => "no selector tier matched any transcript fragments".to_string(),
    };
    remote_fallback(remote, meta, &dom_reason, lang).await
}

async fn remote_fallback<R: TranscriptSource>(
    remote: &R,
    meta: &VideoMeta,
    dom_reason: &str,
    lang: &str,
) -> ExtractOutcome {
    let Some(id) = &meta.id else {
        return ExtractOutcome::failure(format!(
            "{dom_reason}; no content id available for the remote fallback"
        ));
    };
    let fetched = {
        let _s = info_span!("remote_fallback").entered();
        remote.fetch_transcript(id, lang).await
    };
    match fetched {
        TimedText::Transcript(transcript) => {
            info!(chars = transcript.len(), "transcript fetched from timedtext fallback");
            ExtractOutcome::success(
                transcript,
                meta.title.clone(),
                meta.url.clone(),
                id.clone(),
                Some(Method::Api),
            )
        }
        TimedText::Unavailable(remote_reason) => {
            ExtractOutcome::failure(format!("{dom_reason}; {remote_reason}"))
        }
    }
}

/// Cache and configuration knobs shared by every operation that runs the
/// pipeline (extract, export, serve).
#[derive(Clone, Default)]
pub struct RequestOpts {
    /// `None` defers to the environment-configured language.
    pub lang: Option<String>,
    pub tiers: Option<PathBuf>,
    pub no_cache: bool,
    pub refresh: bool,
    pub cache_file: Option<PathBuf>,
    pub ttl: Option<String>,
}

/// Full request flow: cache read, pipeline, cache write. Errors only on
/// environmental faults (bad selector config file, unbuildable HTTP client);
/// extraction failures come back as a `Failure` outcome.
pub async fn obtain(
    requested: &str,
    html_override: Option<String>,
    opts: &RequestOpts,
    cancel: &CancellationToken,
) -> Result<ExtractOutcome> {
    let content_id = video::extract_video_id(requested);

    let mut store = if opts.no_cache {
        None
    } else {
        let _s = info_span!("cache_read").entered();
        Some(TranscriptCache::load(
            &cache::cache_file(opts.cache_file.as_deref()),
            cache::cache_ttl(opts.ttl.as_deref()),
        ))
    };

    if !opts.refresh {
        if let (Some(store), Some(id)) = (&store, &content_id) {
            if let Some(entry) = store.get(id) {
                info!(id = %id, "cache hit");
                return Ok(ExtractOutcome::success(
                    entry.transcript.clone(),
                    entry.title.clone(),
                    entry.url.clone(),
                    id.clone(),
                    None,
                ));
            }
        }
    }

    let cfg = ExtractConfig::load(opts.tiers.as_deref())?;
    let extractor = Extractor::new(cfg, opts.lang.clone())?;
    let outcome = extractor.extract(requested, html_override, cancel).await;

    if let ExtractOutcome::Success { transcript, video_title, video_url, content_id, .. } =
        &outcome
    {
        if !content_id.is_empty() {
            if let Some(store) = store.as_mut() {
                let _s = info_span!("cache_write").entered();
                store.put(
                    content_id,
                    CacheEntry::new(transcript.clone(), video_title.clone(), video_url.clone()),
                );
                store.save()?;
            }
        }
    }
    Ok(outcome)
}

pub async fn run(args: ExtractCmd, cancel: CancellationToken) -> Result<()> {
    let log = telemetry::extract();
    let _g = log
        .root_span_kv([
            ("url", args.url.clone()),
            ("lang", args.lang.clone().unwrap_or_else(|| "env".to_string())),
            ("no_cache", args.no_cache.to_string()),
            ("refresh", args.refresh.to_string()),
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
        refresh: args.refresh,
        cache_file: args.cache_file.clone(),
        ttl: args.ttl.clone(),
    };

    let outcome = {
        let _s = log.span(&ExtractPhase::Pipeline).entered();
        obtain(&args.url, html_override, &opts, &cancel).await?
    };

    emit_outcome(&log, &outcome)
}

fn emit_outcome(
    log: &telemetry::ctx::LogCtx<telemetry::ops::extract::Extract>,
    outcome: &ExtractOutcome,
) -> Result<()> {
    if telemetry::config::json_mode() {
        log.result(outcome)?;
    } else {
        match outcome {
            ExtractOutcome::Success { transcript, video_title, method, .. } => {
                let via = match method {
                    Some(m) => m.to_string(),
                    None => "cache".to_string(),
                };
                log.info(format!("✅ {video_title} — {} chars via {via}", transcript.len()));
                println!("{transcript}");
            }
            ExtractOutcome::Failure { error, .. } => {
                log.error(format!("❌ {error}"));
            }
        }
    }
    if !outcome.is_success() {
        anyhow::bail!("transcript extraction failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeRemote(TimedText);

    impl TranscriptSource for FakeRemote {
        async fn fetch_transcript(&self, _video_id: &str, _lang: &str) -> TimedText {
            self.0.clone()
        }
    }

    fn meta() -> VideoMeta {
        VideoMeta {
            id: Some("abcdefghijk".to_string()),
            title: "A Video".to_string(),
            url: "https://www.youtube.com/watch?v=abcdefghijk".to_string(),
        }
    }

    fn cfg() -> ExtractConfig {
        ExtractConfig::default()
    }

    #[tokio::test(start_paused = true)]
    async fn dom_match_wins_and_is_tagged_dom() {
        let mut page = HtmlPage::parse(
            r#"<ytd-transcript-renderer>
                 <ytd-transcript-segment-renderer><div class="segment-text"> Hello </div></ytd-transcript-segment-renderer>
                 <ytd-transcript-segment-renderer><div class="segment-text">world</div></ytd-transcript-segment-renderer>
               </ytd-transcript-renderer>"#,
        );
        let remote = FakeRemote(TimedText::Unavailable("should not be consulted".into()));
        let out =
            run_pipeline(&mut page, &remote, &meta(), &cfg(), "en", &CancellationToken::new())
                .await;
        match out {
            ExtractOutcome::Success { transcript, method, .. } => {
                assert_eq!(transcript, "Hello world");
                assert_eq!(method, Some(Method::Dom));
            }
            ExtractOutcome::Failure { error, .. } => panic!("unexpected failure: {error}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dom_failure_falls_back_to_api() {
        let mut page = HtmlPage::parse("<body><p>nothing here</p></body>");
        let remote = FakeRemote(TimedText::Transcript("Hi there".into()));
        let out =
            run_pipeline(&mut page, &remote, &meta(), &cfg(), "en", &CancellationToken::new())
                .await;
        match out {
            ExtractOutcome::Success { transcript, method, content_id, .. } => {
                assert_eq!(transcript, "Hi there");
                assert_eq!(method, Some(Method::Api));
                assert_eq!(content_id, "abcdefghijk");
            }
            ExtractOutcome::Failure { error, .. } => panic!("unexpected failure: {error}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn double_failure_concatenates_both_reasons() {
        let mut page = HtmlPage::parse("<body></body>");
        let remote = FakeRemote(TimedText::Unavailable("timedtext request failed: 404".into()));
        let out =
            run_pipeline(&mut page, &remote, &meta(), &cfg(), "en", &CancellationToken::new())
                .await;
        match out {
            ExtractOutcome::Failure { error, .. } => {
                assert!(error.contains("no selector tier matched"));
                assert!(error.contains("timedtext request failed: 404"));
            }
            ExtractOutcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn missing_content_id_blocks_the_remote_fallback() {
        let mut page = HtmlPage::parse("<body></body>");
        let remote = FakeRemote(TimedText::Transcript("never used".into()));
        let no_id = VideoMeta { id: None, title: String::new(), url: "x".to_string() };
        let out =
            run_pipeline(&mut page, &remote, &no_id, &cfg(), "en", &CancellationToken::new())
                .await;
        match out {
            ExtractOutcome::Failure { error, .. } => {
                assert!(error.contains("no content id"));
            }
            ExtractOutcome::Success { .. } => panic!("expected failure"),
        }
    }

    #[test]
    fn lang_flag_overrides_the_configured_language() {
        let extractor = Extractor::new(cfg(), Some("de".to_string())).unwrap();
        assert_eq!(extractor.lang, "de");
    }

    #[test]
    fn absent_lang_flag_keeps_the_configured_language() {
        let extractor = Extractor::new(cfg(), None).unwrap();
        assert_eq!(extractor.lang, TimedTextConfig::from_env().lang);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_fragments_only_counts_as_dom_failure() {
        let mut page = HtmlPage::parse(
            r#"<div class="segment-text">   </div><div class="segment-text"></div>"#,
        );
        let remote = FakeRemote(TimedText::Transcript("from api".into()));
        let out =
            run_pipeline(&mut page, &remote, &meta(), &cfg(), "en", &CancellationToken::new())
                .await;
        match out {
            ExtractOutcome::Success { transcript, method, .. } => {
                assert_eq!(transcript, "from api");
                assert_eq!(method, Some(Method::Api));
            }
            ExtractOutcome::Failure { error, .. } => panic!("unexpected failure: {error}"),
        }
    }
}
