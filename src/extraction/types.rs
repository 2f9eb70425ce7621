use serde::{Deserialize, Serialize};

/// Provenance of a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Dom,
    Api,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Dom => write!(f, "dom"),
            Method::Api => write!(f, "api"),
        }
    }
}

/// Uniform result of a transcript extraction. Serializes to the wire shape
/// callers expect: `{success: true, transcript, videoTitle, videoUrl,
/// contentId, method}` or `{success: false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractOutcome {
    Success {
        success: bool,
        transcript: String,
        #[serde(rename = "videoTitle")]
        video_title: String,
        #[serde(rename = "videoUrl")]
        video_url: String,
        #[serde(rename = "contentId")]
        content_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<Method>,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl ExtractOutcome {
    pub fn success(
        transcript: String,
        video_title: String,
        video_url: String,
        content_id: String,
        method: Option<Method>,
    ) -> Self {
        ExtractOutcome::Success {
            success: true,
            transcript,
            video_title,
            video_url,
            content_id,
            method,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ExtractOutcome::Failure { success: false, error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractOutcome::Success { .. })
    }

    pub fn transcript(&self) -> Option<&str> {
        match self {
            ExtractOutcome::Success { transcript, .. } => Some(transcript),
            ExtractOutcome::Failure { .. } => None,
        }
    }
}

/// Reply to an availability probe: `{available, contentId, videoTitle}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityReply {
    pub available: bool,
    #[serde(rename = "contentId")]
    pub content_id: Option<String>,
    #[serde(rename = "videoTitle")]
    pub video_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_to_wire_shape() {
        let out = ExtractOutcome::success(
            "hello".into(),
            "Title".into(),
            "https://example.com/watch?v=abc".into(),
            "abc".into(),
            Some(Method::Dom),
        );
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["videoTitle"], "Title");
        assert_eq!(v["contentId"], "abc");
        assert_eq!(v["method"], "dom");
    }

    #[test]
    fn failure_serializes_to_wire_shape() {
        let out = ExtractOutcome::failure("both paths failed");
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], "both paths failed");
        assert!(v.get("transcript").is_none());
    }

    #[test]
    fn method_display_matches_serde() {
        assert_eq!(Method::Api.to_string(), "api");
        assert_eq!(serde_json::to_value(Method::Api).unwrap(), "api");
    }
}
