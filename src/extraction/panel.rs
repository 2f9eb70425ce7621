use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::extraction::config::PanelConfig;
use crate::page::PageDriver;

/// Bring the transcript panel into a queryable state. Best-effort by
/// contract: this never returns an error and makes no promise the panel is
/// open afterwards. The caller proceeds to query for content and treats
/// absence as failure.
///
/// Both activation paths are attempted independently; the open probe, not the
/// click result, decides whether to keep going. Fixed settle sleeps are
/// replaced by bounded polls so a fast page costs one probe and a dead
/// control costs at most the budget.
pub async fn activate<P: PageDriver>(page: &mut P, cfg: &PanelConfig, cancel: &CancellationToken) {
    if page.exists(&cfg.open_probe) {
        debug!("transcript panel already open");
        return;
    }

    if page.click_attr_contains(&cfg.toggle_attr, &cfg.toggle_needle) {
        debug!(needle = %cfg.toggle_needle, "clicked primary toggle");
        if poll_until(page, &cfg.open_probe, cfg.panel_budget, cfg.poll_interval, cancel).await {
            return;
        }
    }

    // Secondary path: open the "more actions" menu and pick the item by label.
    if page.click_attr_contains(&cfg.menu_attr, &cfg.menu_needle) {
        debug!(needle = %cfg.menu_needle, "opened actions menu");
        poll_until(page, &cfg.menu_item_selector, cfg.menu_budget, cfg.poll_interval, cancel)
            .await;
        if page.click_labeled(&cfg.menu_item_selector, &cfg.menu_item_label) {
            debug!(label = %cfg.menu_item_label, "clicked menu item");
            poll_until(page, &cfg.open_probe, cfg.panel_budget, cfg.poll_interval, cancel).await;
        }
    }
}

/// Poll `probe` until it matches, the budget runs out, or the token fires.
/// Returns whether the probe matched.
async fn poll_until<P: PageDriver>(
    page: &P,
    probe: &str,
    budget: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> bool {
    let deadline = Instant::now() + budget;
    loop {
        if page.exists(probe) {
            return true;
        }
        let now = Instant::now();
        if cancel.is_cancelled() || now >= deadline {
            return false;
        }
        let nap = interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = sleep(nap) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// A page whose panel opens a few probes after the right control is
    /// clicked, standing in for a UI that settles asynchronously.
    struct ScriptedPage {
        has_toggle: bool,
        has_menu: bool,
        toggle_works: bool,
        clicked: Cell<bool>,
        probes_since_click: Cell<u32>,
        opens_after_probes: u32,
    }

    impl ScriptedPage {
        fn new(has_toggle: bool, has_menu: bool, toggle_works: bool) -> Self {
            Self {
                has_toggle,
                has_menu,
                toggle_works,
                clicked: Cell::new(false),
                probes_since_click: Cell::new(0),
                opens_after_probes: 3,
            }
        }

        fn panel_open(&self) -> bool {
            self.clicked.get() && self.probes_since_click.get() >= self.opens_after_probes
        }
    }

    impl PageDriver for ScriptedPage {
        fn query_texts(&self, _selector: &str) -> Vec<String> {
            Vec::new()
        }

        fn exists(&self, selector: &str) -> bool {
            match selector {
                "#panel" => {
                    if self.clicked.get() {
                        self.probes_since_click.set(self.probes_since_click.get() + 1);
                    }
                    self.panel_open()
                }
                "#menu-item" => self.has_menu && self.clicked.get(),
                _ => false,
            }
        }

        fn exists_attr_contains(&self, _attr: &str, needle: &str) -> bool {
            match needle {
                "transcript" => self.has_toggle,
                "more actions" => self.has_menu,
                _ => false,
            }
        }

        fn click_attr_contains(&mut self, _attr: &str, needle: &str) -> bool {
            match needle {
                "transcript" if self.has_toggle => {
                    if self.toggle_works {
                        self.clicked.set(true);
                    }
                    true
                }
                "more actions" if self.has_menu => true,
                _ => false,
            }
        }

        fn click_labeled(&mut self, _selector: &str, label: &str) -> bool {
            if self.has_menu && label == "transcript" {
                self.clicked.set(true);
                return true;
            }
            false
        }
    }

    fn cfg() -> PanelConfig {
        PanelConfig {
            open_probe: "#panel".to_string(),
            menu_item_selector: "#menu-item".to_string(),
            ..PanelConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn opens_via_primary_toggle_within_budget() {
        let mut page = ScriptedPage::new(true, false, true);
        activate(&mut page, &cfg(), &CancellationToken::new()).await;
        assert!(page.panel_open());
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_menu_when_toggle_is_dead() {
        let mut page = ScriptedPage::new(true, true, false);
        activate(&mut page, &cfg(), &CancellationToken::new()).await;
        assert!(page.panel_open());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_when_no_controls_exist() {
        let mut page = ScriptedPage::new(false, false, false);
        activate(&mut page, &cfg(), &CancellationToken::new()).await;
        assert!(!page.panel_open());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_the_wait() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut page = ScriptedPage::new(true, false, true);
        activate(&mut page, &cfg(), &cancel).await;
        // One probe at most before the token is honored.
        assert!(page.probes_since_click.get() <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_bounds_a_panel_that_never_opens() {
        let mut page = ScriptedPage::new(true, false, true);
        page.opens_after_probes = u32::MAX;
        let started = Instant::now();
        activate(&mut page, &cfg(), &CancellationToken::new()).await;
        // Paused clock advances only by the sleeps we issued.
        assert!(started.elapsed() <= cfg().panel_budget + cfg().menu_budget);
    }
}
