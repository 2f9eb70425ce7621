use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::page::HtmlPage;

// Same shape the site uses everywhere: 11 chars of [0-9A-Za-z_-], found after
// "v=" or a path separator.
static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("video id regex"));

/// Identity of the video under extraction. `id` is the cache/fallback key and
/// may legitimately be absent when the input is not a watch page.
#[derive(Debug, Clone)]
pub struct VideoMeta {
    pub id: Option<String>,
    pub title: String,
    pub url: String,
}

/// Pull the 11-char video id out of a watch URL, a share URL, or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    if let Some(caps) = VIDEO_ID_RE.captures(input) {
        return Some(caps[1].to_string());
    }
    // A bare id is accepted as-is.
    if input.len() == 11
        && input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Some(input.to_string());
    }
    None
}

/// Gather id, title and canonical URL for a fetched watch page. Never fails;
/// missing pieces come back empty or `None` and the pipeline copes.
pub fn resolve_meta(page: &HtmlPage, requested: &str) -> VideoMeta {
    let canonical = page.first_attr(r#"link[rel="canonical"]"#, "href");

    let id = extract_video_id(requested)
        .or_else(|| canonical.as_deref().and_then(extract_video_id));

    let title = page
        .first_attr(r#"meta[property="og:title"]"#, "content")
        .or_else(|| page.first_text("title").map(|t| strip_site_suffix(&t)))
        .unwrap_or_default();

    let url = if Url::parse(requested).is_ok() {
        requested.to_string()
    } else if let Some(canon) = canonical {
        canon
    } else if let Some(id) = &id {
        format!("https://www.youtube.com/watch?v={id}")
    } else {
        requested.to_string()
    };

    VideoMeta { id, title, url }
}

// Strip the site suffix once; a title that legitimately ends in the phrase
// keeps its own copy.
fn strip_site_suffix(title: &str) -> String {
    title.strip_suffix(" - YouTube").unwrap_or(title).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ"),
        );
    }

    #[test]
    fn id_from_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/abc_DEF-123?t=4").as_deref(),
            Some("abc_DEF-123"),
        );
    }

    #[test]
    fn bare_id_accepted() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn garbage_yields_none() {
        assert_eq!(extract_video_id("not a url"), None);
        assert_eq!(extract_video_id("short"), None);
    }

    #[test]
    fn meta_prefers_og_title_and_strips_suffix() {
        let page = HtmlPage::parse(
            r#"<head><title>My Video - YouTube</title>
               <meta property="og:title" content="My Video (OG)">
               <link rel="canonical" href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">
               </head>"#,
        );
        let meta = resolve_meta(&page, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(meta.title, "My Video (OG)");
        assert_eq!(meta.id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn meta_falls_back_to_title_tag_and_canonical_id() {
        let page = HtmlPage::parse(
            r#"<head><title>Plain Title - YouTube</title>
               <link rel="canonical" href="https://www.youtube.com/watch?v=abcdefghijk">
               </head>"#,
        );
        let meta = resolve_meta(&page, "some local file");
        assert_eq!(meta.title, "Plain Title");
        assert_eq!(meta.id.as_deref(), Some("abcdefghijk"));
        assert_eq!(meta.url, "https://www.youtube.com/watch?v=abcdefghijk");
    }

    #[test]
    fn site_suffix_strips_exactly_once() {
        assert_eq!(strip_site_suffix("My Video - YouTube"), "My Video");
        assert_eq!(
            strip_site_suffix("Tribute - YouTube - YouTube"),
            "Tribute - YouTube",
        );
        assert_eq!(strip_site_suffix("No Suffix Here"), "No Suffix Here");
    }

    #[test]
    fn meta_with_nothing_resolvable() {
        let page = HtmlPage::parse("<body></body>");
        let meta = resolve_meta(&page, "nowhere");
        assert!(meta.id.is_none());
        assert!(meta.title.is_empty());
    }
}
