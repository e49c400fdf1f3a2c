//! End-to-end admission flow over the in-memory store

use chrono::{TimeZone, Utc};
use image_search_guard::cache::{self, build_cache_key};
use image_search_guard::guard::client_identity;
use image_search_guard::provider::{extract_check_url, extract_search_results};
use image_search_guard::resilience::rate_limiter::{build_key, check, RateLimitDecision};
use image_search_guard::store::{KvStore, ListOptions, MemoryStore};
use image_search_guard::{
    Admission, CachedSearchResult, Error, GuardConfig, SearchGate, SearchRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn provider_payload(task_id: &str) -> serde_json::Value {
    json!({
        "tasks": [{
            "id": task_id,
            "result": [{
                "check_url": format!("https://provider.example/check/{}", task_id),
                "items": [
                    { "type": "images", "items": [
                        { "title": "Sunset", "url": "https://photos.example.org/sunset", "image_url": "https://photos.example.org/sunset.jpg" },
                        { "title": "Sunset 2", "url": "https://blog.example.net/p/2", "image_url": "https://blog.example.net/2.jpg" }
                    ]},
                    { "type": "related_searches", "items": [{ "title": "beach" }] }
                ]
            }]
        }]
    })
}

#[tokio::test]
async fn test_limit_of_two_sequence() {
    let store = MemoryStore::new();
    let now = Utc.with_ymd_and_hms(2026, 1, 14, 10, 0, 0).unwrap();
    let key = build_key("127.0.0.1", now, None);
    assert_eq!(key, "limit:127.0.0.1:2026-01-14");

    let results: Vec<RateLimitDecision> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(check(&store, &key, 2).await.unwrap());
        }
        out
    };
    assert_eq!(
        results,
        vec![
            RateLimitDecision { allowed: true, remaining: 1 },
            RateLimitDecision { allowed: true, remaining: 0 },
            RateLimitDecision { allowed: false, remaining: 0 },
        ]
    );
}

#[tokio::test]
async fn test_cache_round_trip_through_store() {
    let store = MemoryStore::new();
    let payload = provider_payload("t-1");
    let mut entry = CachedSearchResult::new(extract_search_results(&payload)).with_task_id("t-1");
    if let Some(url) = extract_check_url(&payload) {
        entry = entry.with_check_url(url);
    }
    let key = build_cache_key("https://photos.example.org/sunset.jpg", None);

    cache::put(&store, &key, &entry, Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache::get(&store, &key).await, Some(entry));
}

#[tokio::test]
async fn test_full_async_flow() {
    let store = Arc::new(MemoryStore::new());
    let gate = SearchGate::new(GuardConfig::new(), store.clone());
    let headers = vec![("X-Forwarded-For", "203.0.113.50, 10.0.0.2")];
    let identity = client_identity(&headers);
    assert_eq!(identity, "203.0.113.50");

    let request = SearchRequest::from_url(&identity, "https://photos.example.org/sunset.jpg");
    let key = match gate.admit(&request).await.unwrap() {
        Admission::Miss { key, fetch_url, remaining } => {
            assert_eq!(fetch_url, "https://photos.example.org/sunset.jpg");
            assert_eq!(remaining, 19);
            key
        }
        other => panic!("expected miss, got {:?}", other),
    };

    gate.record_pending(&key, "t-500").await.unwrap();
    let stored = gate
        .complete("t-500", &provider_payload("t-500"))
        .await
        .unwrap()
        .expect("task was mapped");
    assert_eq!(stored.results.len(), 2);
    assert_eq!(stored.results[1].domain, "blog.example.net");
    assert_eq!(
        stored.check_url.as_deref(),
        Some("https://provider.example/check/t-500")
    );

    // second identical request is a cache hit
    let again = gate.admit(&request).await.unwrap();
    assert!(again.is_cached());

    // both tables are present in the store
    let tasks = store
        .list(ListOptions::new().with_prefix("task:"))
        .await
        .unwrap();
    assert_eq!(tasks.keys, vec!["task:t-500"]);
    assert!(store.get(key.as_str()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rejections_surface_as_client_errors() {
    let mut config = GuardConfig::new();
    config.rate_limit.daily_limit = 1;
    let gate = SearchGate::new(config, Arc::new(MemoryStore::new()));

    let err = gate
        .admit(&SearchRequest::from_url("203.0.113.7", "http://example.com/a.png"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "unsupported_scheme");
    assert!(err.is_client_error());

    gate.admit(&SearchRequest::from_url("203.0.113.7", "https://example.com/a.png"))
        .await
        .unwrap();
    let err = gate
        .admit(&SearchRequest::from_url("203.0.113.7", "https://example.com/b.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited { limit: 1, .. }));
}
