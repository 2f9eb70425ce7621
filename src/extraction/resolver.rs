use crate::extraction::config::SelectorTier;
use crate::page::PageDriver;

/// The winning tier's full match set. Empty `fragments` means no tier matched.
#[derive(Debug, Clone, Default)]
pub struct TierMatch {
    pub tier: Option<String>,
    pub fragments: Vec<String>,
}

impl TierMatch {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Evaluate tiers in order and return the first tier whose combined match set
/// is non-empty. Strict first-match-wins: later tiers are never consulted and
/// never merged in. An all-empty result is a valid outcome, not an error; the
/// caller decides whether empty means failure.
pub fn resolve<P: PageDriver>(page: &P, tiers: &[SelectorTier]) -> TierMatch {
    for tier in tiers {
        let mut fragments = Vec::new();
        for selector in &tier.selectors {
            fragments.extend(page.query_texts(selector));
        }
        if !fragments.is_empty() {
            return TierMatch { tier: Some(tier.name.clone()), fragments };
        }
    }
    TierMatch::default()
}
