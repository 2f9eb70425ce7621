use scraper::{ElementRef, Html, Selector};

/// Capability surface the extraction pipeline needs from a page.
///
/// Clicks are best-effort: implementations report whether a control was hit,
/// and a static document is free to hit it without changing state. The
/// activator re-checks state instead of trusting the click.
pub trait PageDriver {
    /// Text content of every element matching the CSS selector, in document order.
    fn query_texts(&self, selector: &str) -> Vec<String>;

    /// Whether at least one element matches the CSS selector.
    fn exists(&self, selector: &str) -> bool;

    /// Whether any element carries `attr` whose value contains `needle` (case-insensitive).
    fn exists_attr_contains(&self, attr: &str, needle: &str) -> bool;

    /// Click the first element whose `attr` value contains `needle` (case-insensitive).
    fn click_attr_contains(&mut self, attr: &str, needle: &str) -> bool;

    /// Click the first element matching `selector` whose text contains `label`
    /// (case-insensitive). Used for menu items addressed by visible label.
    fn click_labeled(&mut self, selector: &str, label: &str) -> bool;
}

/// A parsed, static HTML document. Clicks resolve targets but cannot change
/// state, so extraction over an `HtmlPage` sees the page as served.
pub struct HtmlPage {
    doc: Html,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self { doc: Html::parse_document(html) }
    }

    /// Text of the first element matching the selector, if any.
    pub fn first_text(&self, selector: &str) -> Option<String> {
        let sel = parse_selector(selector)?;
        let el = self.doc.select(&sel).next()?;
        let text = el.text().collect::<String>();
        let trimmed = text.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }

    /// Attribute value of the first element matching the selector, if any.
    pub fn first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        let sel = parse_selector(selector)?;
        self.doc
            .select(&sel)
            .find_map(|el| el.value().attr(attr))
            .map(|v| v.to_string())
    }

    fn find_attr_contains(&self, attr: &str, needle: &str) -> Option<ElementRef<'_>> {
        let all = parse_selector("*")?;
        let needle = needle.to_lowercase();
        self.doc.select(&all).find(|el| {
            el.value()
                .attr(attr)
                .map(|v| v.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }
}

impl PageDriver for HtmlPage {
    fn query_texts(&self, selector: &str) -> Vec<String> {
        let Some(sel) = parse_selector(selector) else { return Vec::new() };
        self.doc
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .collect()
    }

    fn exists(&self, selector: &str) -> bool {
        match parse_selector(selector) {
            Some(sel) => self.doc.select(&sel).next().is_some(),
            None => false,
        }
    }

    fn exists_attr_contains(&self, attr: &str, needle: &str) -> bool {
        self.find_attr_contains(attr, needle).is_some()
    }

    fn click_attr_contains(&mut self, attr: &str, needle: &str) -> bool {
        self.find_attr_contains(attr, needle).is_some()
    }

    fn click_labeled(&mut self, selector: &str, label: &str) -> bool {
        let Some(sel) = parse_selector(selector) else { return false };
        let label = label.to_lowercase();
        self.doc.select(&sel).any(|el| {
            el.text().collect::<String>().to_lowercase().contains(&label)
        })
    }
}

// Unparseable selectors behave as matching nothing; selector strings are
// configuration data and a bad entry must not take down extraction.
fn parse_selector(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}
