//! Domain types shared by the cache, the extractor and the gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized match from the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub page_url: String,
    pub image_url: String,
    /// Host of `page_url`, empty when it does not parse.
    pub domain: String,
}

/// Cached provider answer for one image fingerprint.
///
/// An empty `results` list is a legitimate answer, not a failed lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_url: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CachedSearchResult {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            task_id: None,
            results,
            check_url: None,
            cached_at: Utc::now(),
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_check_url(mut self, url: impl Into<String>) -> Self {
        self.check_url = Some(url.into());
        self
    }

    pub fn with_cached_at(mut self, at: DateTime<Utc>) -> Self {
        self.cached_at = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape_is_camel_case() {
        let entry = CachedSearchResult::new(vec![SearchResult {
            title: "Cat".into(),
            page_url: "https://example.com/cat".into(),
            image_url: "https://example.com/cat.jpg".into(),
            domain: "example.com".into(),
        }])
        .with_task_id("t-1");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["taskId"], "t-1");
        assert_eq!(json["results"][0]["pageUrl"], "https://example.com/cat");
        assert_eq!(json["results"][0]["imageUrl"], "https://example.com/cat.jpg");
        assert!(json.get("checkUrl").is_none());
        assert!(json.get("cachedAt").is_some());
    }
}
