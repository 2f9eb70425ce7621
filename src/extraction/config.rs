use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_PANEL_BUDGET_MS: u64 = 1000;
const DEFAULT_MENU_BUDGET_MS: u64 = 500;
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// One fallback tier: a set of equivalent selectors for the same semantic
/// element. Tiers are tried in order; the first with any match wins whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorTier {
    pub name: String,
    pub selectors: Vec<String>,
}

impl SelectorTier {
    pub fn new(name: &str, selectors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Controls and budgets for bringing the transcript panel into view.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Probe that tells whether the panel is already open.
    pub open_probe: String,
    /// Attribute + substring locating the primary toggle control.
    pub toggle_attr: String,
    pub toggle_needle: String,
    /// Attribute + substring locating the "more actions" control.
    pub menu_attr: String,
    pub menu_needle: String,
    /// Menu item selector and the label text that identifies the target action.
    pub menu_item_selector: String,
    pub menu_item_label: String,
    pub panel_budget: Duration,
    pub menu_budget: Duration,
    pub poll_interval: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            open_probe: "ytd-transcript-renderer, ytd-transcript-segment-list-renderer".to_string(),
            toggle_attr: "aria-label".to_string(),
            toggle_needle: "transcript".to_string(),
            menu_attr: "aria-label".to_string(),
            menu_needle: "more actions".to_string(),
            menu_item_selector: "tp-yt-paper-item, ytd-menu-service-item-renderer".to_string(),
            menu_item_label: "transcript".to_string(),
            panel_budget: Duration::from_millis(DEFAULT_PANEL_BUDGET_MS),
            menu_budget: Duration::from_millis(DEFAULT_MENU_BUDGET_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Extraction configuration. Selector values are data, not logic: the
/// defaults track the site markup the tool currently understands and can be
/// replaced wholesale from a JSON file without touching code.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub tiers: Vec<SelectorTier>,
    pub panel: PanelConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                SelectorTier::new(
                    "segment-renderer",
                    &[
                        "ytd-transcript-segment-renderer .segment-text",
                        "ytd-transcript-segment-renderer yt-formatted-string",
                    ],
                ),
                SelectorTier::new(
                    "legacy-cues",
                    &[
                        ".cue.ytd-transcript-body-renderer",
                        ".caption-line-text",
                        ".segment-text",
                    ],
                ),
            ],
            panel: PanelConfig::default(),
        }
    }
}

impl ExtractConfig {
    /// Default config, with selector tiers replaced from a JSON file when one
    /// is given. File shape: `[{"name": ..., "selectors": [...]}, ...]`.
    pub fn load(tiers_file: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = tiers_file {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read selector tiers from {}", path.display()))?;
            let tiers: Vec<SelectorTier> = serde_json::from_str(&raw)
                .with_context(|| format!("parse selector tiers from {}", path.display()))?;
            cfg.tiers = tiers;
        }
        Ok(cfg)
    }
}
