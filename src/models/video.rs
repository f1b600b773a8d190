//! The durable video record and the payload used to commit one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maximum title length, counted in characters.
pub const TITLE_MAX_CHARS: usize = 25;

/// Maximum description length, counted in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 100;

/// Category value meaning "no category filter" on the read path.
pub const CATEGORY_WILDCARD: &str = "all";

/// A committed video.
///
/// Readers only ever see records whose binary was written to `video_url`
/// before the record was inserted.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Identifier minted at grant time; primary key.
    pub video_id: String,

    pub title: String,

    pub description: String,

    /// One of the configured category tags.
    pub category: String,

    /// Public locator of the stored binary. Never reassigned.
    pub video_url: String,

    /// Assigned by the store when the record is written.
    #[serde(alias = "uploadedAt")]
    pub upload_date: DateTime<Utc>,
}

/// Body of `POST /saveVideoMetadata`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewVideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub video_url: String,

    /// Client clock reading; accepted for wire compatibility and ignored.
    #[serde(default, alias = "uploadedAt", skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<DateTime<Utc>>,
}

/// Query string of `GET /fetchVideos`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl VideoQuery {
    /// Search text to match, `None` when absent or blank.
    pub fn search(&self) -> Option<&str> {
        self.search_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    /// Category to match exactly, `None` when absent, blank or the wildcard.
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(CATEGORY_WILDCARD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_blank_categories_do_not_filter() {
        let all = VideoQuery {
            category: Some("all".into()),
            ..Default::default()
        };
        let blank = VideoQuery {
            category: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(all.category_filter(), None);
        assert_eq!(blank.category_filter(), None);

        let music = VideoQuery {
            category: Some("music".into()),
            ..Default::default()
        };
        assert_eq!(music.category_filter(), Some("music"));
    }

    #[test]
    fn record_serializes_with_camel_case_wire_names() {
        let record = VideoRecord {
            video_id: "abc".into(),
            title: "t".into(),
            description: "d".into(),
            category: "category1".into(),
            video_url: "http://localhost/objects/videos/abc.mp4".into(),
            upload_date: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("videoId").is_some());
        assert!(json.get("videoUrl").is_some());
        assert!(json.get("uploadDate").is_some());
    }

    #[test]
    fn commit_payload_accepts_uploaded_at_alias() {
        let body = r#"{"videoId":"a","title":"t","description":"d","category":"c",
            "videoUrl":"u","uploadedAt":"2024-05-01T10:00:00Z"}"#;
        let parsed: NewVideoRecord = serde_json::from_str(body).unwrap();
        assert!(parsed.upload_date.is_some());
    }
}
