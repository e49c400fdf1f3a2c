//! Provider payload extraction.
//!
//! The reverse-image-search provider answers with
//! `{ tasks: [{ id, result: [{ check_url, items: [{ type, items: [...] }] }] }] }`.
//! The shape is loosely specified, so every accessor here tolerates missing or mistyped
//! levels and degrades to `None` or an empty list.

use serde_json::Value;
use url::Url;

use crate::types::SearchResult;

/// Group type code carrying image matches.
pub const IMAGES_GROUP: &str = "images";

fn first_task(payload: &Value) -> &Value {
    &payload["tasks"][0]
}

fn first_result(payload: &Value) -> &Value {
    &first_task(payload)["result"][0]
}

fn string_field(item: &Value, field: &str) -> String {
    item[field].as_str().unwrap_or_default().to_string()
}

/// Host portion of `page_url`, or an empty string.
pub fn domain_of(page_url: &str) -> String {
    Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Provider task id of the first task.
pub fn extract_task_id(payload: &Value) -> Option<String> {
    match &first_task(payload)["id"] {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `check_url` of the first result of the first task.
pub fn extract_check_url(payload: &Value) -> Option<String> {
    first_result(payload)["check_url"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flatten every `images` group of the first result into [`SearchResult`]s.
pub fn extract_search_results(payload: &Value) -> Vec<SearchResult> {
    let Some(groups) = first_result(payload)["items"].as_array() else {
        return Vec::new();
    };

    groups
        .iter()
        .filter(|group| group["type"].as_str() == Some(IMAGES_GROUP))
        .filter_map(|group| group["items"].as_array())
        .flatten()
        .filter(|item| item.is_object())
        .map(|item| {
            let page_url = string_field(item, "url");
            SearchResult {
                title: string_field(item, "title"),
                domain: domain_of(&page_url),
                image_url: string_field(item, "image_url"),
                page_url,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "tasks": [{
                "id": "task-42",
                "result": [{
                    "check_url": "https://provider.example/check/42",
                    "items": [{
                        "type": "images",
                        "items": [{
                            "title": "A cat",
                            "url": "https://www.example.com/cats/1",
                            "image_url": "https://cdn.example.com/cat.jpg"
                        }]
                    }]
                }]
            }]
        })
    }

    #[test]
    fn test_single_image_match() {
        let results = extract_search_results(&sample());
        assert_eq!(
            results,
            vec![SearchResult {
                title: "A cat".into(),
                page_url: "https://www.example.com/cats/1".into(),
                image_url: "https://cdn.example.com/cat.jpg".into(),
                domain: "www.example.com".into(),
            }]
        );
    }

    #[test]
    fn test_check_url_and_task_id() {
        let payload = sample();
        assert_eq!(
            extract_check_url(&payload).as_deref(),
            Some("https://provider.example/check/42")
        );
        assert_eq!(extract_task_id(&payload).as_deref(), Some("task-42"));
        assert_eq!(extract_task_id(&json!({"tasks": [{"id": 7}]})).as_deref(), Some("7"));
    }

    #[test]
    fn test_non_image_groups_are_skipped_and_groups_flattened() {
        let payload = json!({
            "tasks": [{ "result": [{ "items": [
                { "type": "text", "items": [{ "title": "ignored", "url": "https://a.example/" }] },
                { "type": "images", "items": [
                    { "title": "one", "url": "https://a.example/1", "image_url": "https://a.example/1.png" },
                    { "title": "two", "url": "not a url" }
                ]},
                { "type": "images", "items": [
                    { "title": "three", "url": "https://b.example/3" },
                    "garbage"
                ]}
            ]}]}]
        });
        let results = extract_search_results(&payload);
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two", "three"]);
        assert_eq!(results[1].domain, "");
        assert_eq!(results[1].image_url, "");
        assert_eq!(results[2].domain, "b.example");
    }

    #[test]
    fn test_incomplete_payloads_degrade() {
        for payload in [
            json!(null),
            json!({}),
            json!({ "tasks": [] }),
            json!({ "tasks": [{}] }),
            json!({ "tasks": [{ "result": [] }] }),
            json!({ "tasks": [{ "result": [{}] }] }),
            json!({ "tasks": [{ "result": [{ "items": "nope" }] }] }),
            json!({ "tasks": [{ "result": [{ "items": [{ "type": "images" }] }] }] }),
        ] {
            assert!(extract_search_results(&payload).is_empty(), "{}", payload);
            assert_eq!(extract_check_url(&payload), None, "{}", payload);
        }
        assert_eq!(extract_task_id(&json!({})), None);
    }
}
