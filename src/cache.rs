use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::telemetry::{self};
use crate::telemetry::ops::cache::Phase as CachePhase;

pub const DEFAULT_TTL_SECS: i64 = 3600;
const KEY_PREFIX: &str = "transcript_";
const DEFAULT_CACHE_FILE: &str = ".tgrab_cache.json";

/// One cached extraction, exactly what a later popup-equivalent read needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub transcript: String,
    pub title: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(transcript: String, title: String, url: String) -> Self {
        Self { transcript, title, url, timestamp: Utc::now() }
    }
}

/// Time-bounded transcript store, explicitly owned by the caller. Entries
/// past the TTL are masked on read, never evicted. Persists as a JSON object
/// keyed `transcript_<id>`, standing in for the extension-local storage the
/// contract was written against.
pub struct TranscriptCache {
    entries: BTreeMap<String, CacheEntry>,
    ttl: Duration,
    path: Option<PathBuf>,
}

impl TranscriptCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: BTreeMap::new(), ttl, path: None }
    }

    /// Load from `path`, tolerating a missing or unreadable file: a cache
    /// that fails to load is an empty cache, not an error.
    pub fn load(path: &Path, ttl: Duration) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), "cache file unreadable, starting empty: {err}");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { entries, ttl, path: Some(path.to_path_buf()) }
    }

    /// Write back atomically (temp file + rename). No-op without a path.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let raw = serde_json::to_string_pretty(&self.entries).context("serialize cache")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }

    /// Unconditional overwrite for the given content id.
    pub fn put(&mut self, content_id: &str, entry: CacheEntry) {
        self.entries.insert(storage_key(content_id), entry);
    }

    /// Fresh entry for the id, if any. Stale entries behave as absent.
    pub fn get(&self, content_id: &str) -> Option<&CacheEntry> {
        self.get_at(content_id, Utc::now())
    }

    /// Clock-injected read used by `get` and by tests.
    pub fn get_at(&self, content_id: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        let entry = self.entries.get(&storage_key(content_id))?;
        if now - entry.timestamp < self.ttl {
            Some(entry)
        } else {
            debug!(content_id, "cache entry stale, masking");
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, returning how many were held.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// (storage key, entry, fresh-at-now) listing for inspection.
    pub fn list(&self) -> Vec<(String, &CacheEntry, bool)> {
        let now = Utc::now();
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e, now - e.timestamp < self.ttl))
            .collect()
    }
}

fn storage_key(content_id: &str) -> String {
    format!("{KEY_PREFIX}{content_id}")
}

/// Cache file location: `--cache-file`, else `TGRAB_CACHE_FILE`, else the
/// default beside the working directory.
pub fn cache_file(flag: Option<&Path>) -> PathBuf {
    if let Some(p) = flag {
        return p.to_path_buf();
    }
    std::env::var("TGRAB_CACHE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_FILE))
}

/// TTL from a `--ttl` flag string, else `TGRAB_CACHE_TTL`, else 3600 s.
pub fn cache_ttl(flag: Option<&str>) -> Duration {
    let raw = flag
        .map(|s| s.to_string())
        .or_else(|| std::env::var("TGRAB_CACHE_TTL").ok());
    raw.and_then(|s| crate::util::time::parse_duration_str(&s))
        .unwrap_or_else(|| Duration::seconds(DEFAULT_TTL_SECS))
}

#[derive(Args)]
pub struct CacheCmd {
    #[command(subcommand)]
    pub action: CacheAction,
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
    #[arg(long)]
    pub ttl: Option<String>,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached transcripts and their freshness.
    Show,
    /// Delete every cached transcript. Plans by default; runs with --apply.
    Clear {
        #[arg(long, default_value_t = false)]
        apply: bool,
    },
}

#[derive(Serialize)]
struct CacheEntryRow {
    key: String,
    title: String,
    url: String,
    age_secs: i64,
    fresh: bool,
}

#[derive(Serialize)]
struct CacheShowResult {
    file: String,
    entries: Vec<CacheEntryRow>,
}

#[derive(Serialize)]
struct CacheClearPlan {
    file: String,
    entries: usize,
}

#[derive(Serialize)]
struct CacheClearResult {
    file: String,
    removed: usize,
}

pub async fn run(args: CacheCmd) -> Result<()> {
    let log = telemetry::cache();
    let path = cache_file(args.cache_file.as_deref());
    let _g = log
        .root_span_kv([("file", path.display().to_string())])
        .entered();

    let mut cache = {
        let _s = log.span(&CachePhase::Load).entered();
        TranscriptCache::load(&path, cache_ttl(args.ttl.as_deref()))
    };

    match args.action {
        CacheAction::Show => {
            let now = Utc::now();
            let rows: Vec<CacheEntryRow> = cache
                .list()
                .into_iter()
                .map(|(key, e, fresh)| CacheEntryRow {
                    key,
                    title: e.title.clone(),
                    url: e.url.clone(),
                    age_secs: (now - e.timestamp).num_seconds(),
                    fresh,
                })
                .collect();
            if telemetry::config::json_mode() {
                log.result(&CacheShowResult { file: path.display().to_string(), entries: rows })?;
            } else {
                log.info(format!("🗃  {} — {} entries", path.display(), rows.len()));
                for r in &rows {
                    let state = if r.fresh { "fresh" } else { "stale" };
                    log.info(format!("  {} [{state}] age={}s {}", r.key, r.age_secs, r.title));
                }
            }
        }
        CacheAction::Clear { apply } => {
            if !apply {
                let plan = CacheClearPlan { file: path.display().to_string(), entries: cache.len() };
                if telemetry::config::json_mode() {
                    log.plan(&plan)?;
                } else {
                    log.info(format!("📝 Would remove {} entries from {}", plan.entries, plan.file));
                    log.info("   Use --apply to execute.");
                }
                return Ok(());
            }
            let removed = {
                let _s = log.span(&CachePhase::Clear).entered();
                let n = cache.clear();
                cache.save()?;
                n
            };
            if telemetry::config::json_mode() {
                log.result(&CacheClearResult { file: path.display().to_string(), removed })?;
            } else {
                log.info(format!("🧹 Removed {removed} entries from {}", path.display()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str) -> CacheEntry {
        CacheEntry::new(text.to_string(), "t".to_string(), "u".to_string())
    }

    #[test]
    fn put_then_get_returns_entry() {
        let mut cache = TranscriptCache::new(Duration::seconds(DEFAULT_TTL_SECS));
        cache.put("abc", entry("hello"));
        assert_eq!(cache.get("abc").map(|e| e.transcript.as_str()), Some("hello"));
    }

    #[test]
    fn stale_entry_is_masked_not_removed() {
        let mut cache = TranscriptCache::new(Duration::seconds(DEFAULT_TTL_SECS));
        cache.put("abc", entry("hello"));
        let later = Utc::now() + Duration::seconds(DEFAULT_TTL_SECS + 1);
        assert!(cache.get_at("abc", later).is_none());
        // Masked, not evicted: the entry still occupies the store.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn fresh_up_to_the_ttl_boundary() {
        let mut cache = TranscriptCache::new(Duration::seconds(DEFAULT_TTL_SECS));
        cache.put("abc", entry("hello"));
        let just_before = Utc::now() + Duration::seconds(DEFAULT_TTL_SECS - 2);
        assert!(cache.get_at("abc", just_before).is_some());
    }

    #[test]
    fn second_put_overwrites() {
        let mut cache = TranscriptCache::new(Duration::seconds(DEFAULT_TTL_SECS));
        cache.put("abc", entry("first"));
        cache.put("abc", entry("second"));
        assert_eq!(cache.get("abc").map(|e| e.transcript.as_str()), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn storage_keys_carry_the_prefix() {
        let mut cache = TranscriptCache::new(Duration::seconds(DEFAULT_TTL_SECS));
        cache.put("abc", entry("hello"));
        let keys: Vec<String> = cache.list().into_iter().map(|(k, _, _)| k).collect();
        assert_eq!(keys, vec!["transcript_abc".to_string()]);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = std::env::temp_dir().join(format!("tgrab-cache-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.json");

        let mut cache = TranscriptCache::load(&path, Duration::seconds(DEFAULT_TTL_SECS));
        assert!(cache.is_empty());
        cache.put("abc", entry("persisted"));
        cache.save().unwrap();

        let reloaded = TranscriptCache::load(&path, Duration::seconds(DEFAULT_TTL_SECS));
        assert_eq!(reloaded.get("abc").map(|e| e.transcript.as_str()), Some("persisted"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = std::env::temp_dir().join(format!("tgrab-cache-corrupt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();

        let cache = TranscriptCache::load(&path, Duration::seconds(DEFAULT_TTL_SECS));
        assert!(cache.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ttl_flag_parsing_defaults() {
        assert_eq!(cache_ttl(Some("120s")), Duration::seconds(120));
        assert_eq!(cache_ttl(Some("2h")), Duration::hours(2));
    }
}
