use crate::store::KvStore;
use crate::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Namespace used when no bucket is given.
pub const DEFAULT_BUCKET: &str = "limit";

/// One calendar day; counters expire on their own.
pub const DAILY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u64,
}

/// `{bucket}:{identity}:{YYYY-MM-DD}`, with the date taken in UTC.
///
/// Every call for the same identity on the same UTC day yields the same key, so the quota
/// resets at midnight UTC rather than a fixed time after first use.
pub fn build_key(identity: &str, now: DateTime<Utc>, bucket: Option<&str>) -> String {
    format!(
        "{}:{}:{}",
        bucket.unwrap_or(DEFAULT_BUCKET),
        identity,
        now.format("%Y-%m-%d")
    )
}

/// Check and consume one unit of quota under `key`, counters living for [`DAILY_WINDOW`].
pub async fn check(store: &dyn KvStore, key: &str, limit: u64) -> Result<RateLimitDecision> {
    check_with_window(store, key, limit, DAILY_WINDOW).await
}

/// Read the counter, refuse at `limit`, otherwise write `counter + 1` with `window` as TTL.
///
/// Not atomic: two concurrent checks may read the same value and both pass. Store errors
/// propagate to the caller.
pub async fn check_with_window(
    store: &dyn KvStore,
    key: &str,
    limit: u64,
    window: Duration,
) -> Result<RateLimitDecision> {
    let current = match store.get(key).await? {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "unreadable rate-limit counter, treating as zero");
            0
        }),
        None => 0,
    };

    if current >= limit {
        return Ok(RateLimitDecision {
            allowed: false,
            remaining: 0,
        });
    }

    let next = current + 1;
    store.put(key, &next.to_string(), Some(window)).await?;
    Ok(RateLimitDecision {
        allowed: true,
        remaining: limit - next,
    })
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Admitted requests per identity per UTC day.
    pub daily_limit: u64,
    pub bucket: String,
    /// Counter TTL.
    pub window: Duration,
}

impl RateLimiterConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self {
            daily_limit: 20,
            bucket: DEFAULT_BUCKET.to_string(),
            window: DAILY_WINDOW,
        }
    }

    pub fn with_daily_limit(mut self, limit: u64) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-identity daily quota over a shared store.
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    store: Arc<dyn KvStore>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig, store: Arc<dyn KvStore>) -> Self {
        Self { cfg, store }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.cfg
    }

    pub async fn check(&self, identity: &str) -> Result<RateLimitDecision> {
        self.check_at(identity, Utc::now()).await
    }

    pub async fn check_at(&self, identity: &str, now: DateTime<Utc>) -> Result<RateLimitDecision> {
        let key = build_key(identity, now, Some(&self.cfg.bucket));
        let decision =
            check_with_window(self.store.as_ref(), &key, self.cfg.daily_limit, self.cfg.window)
                .await?;
        if decision.allowed {
            tracing::debug!(identity, remaining = decision.remaining, "quota consumed");
        } else {
            tracing::info!(identity, limit = self.cfg.daily_limit, "daily quota exhausted");
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ListOptions, ListResult, MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_build_key_default_bucket() {
        assert_eq!(
            build_key("127.0.0.1", at(2026, 1, 14, 10), None),
            "limit:127.0.0.1:2026-01-14"
        );
    }

    #[test]
    fn test_build_key_custom_bucket() {
        assert_eq!(
            build_key("127.0.0.1", at(2026, 1, 14, 10), Some("upload")),
            "upload:127.0.0.1:2026-01-14"
        );
    }

    #[test]
    fn test_build_key_is_stable_within_a_day() {
        let morning = build_key("203.0.113.9", at(2026, 3, 1, 0), None);
        let night = build_key("203.0.113.9", Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 59).unwrap(), None);
        let next_day = build_key("203.0.113.9", at(2026, 3, 2, 0), None);
        assert_eq!(morning, night);
        assert_ne!(morning, next_day);
    }

    #[tokio::test]
    async fn test_check_sequence() {
        let store = MemoryStore::new();
        let key = "limit:127.0.0.1:2026-01-14";
        assert_eq!(
            check(&store, key, 2).await.unwrap(),
            RateLimitDecision { allowed: true, remaining: 1 }
        );
        assert_eq!(
            check(&store, key, 2).await.unwrap(),
            RateLimitDecision { allowed: true, remaining: 0 }
        );
        assert_eq!(
            check(&store, key, 2).await.unwrap(),
            RateLimitDecision { allowed: false, remaining: 0 }
        );
        // refusals do not move the counter
        assert_eq!(store.get(key).await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_zero_limit_refuses_without_writing() {
        let store = MemoryStore::new();
        let decision = check(&store, "k", 0).await.unwrap();
        assert!(!decision.allowed);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_garbage_counter_counts_as_zero() {
        let store = MemoryStore::new();
        store.put("k", "NaN", None).await.unwrap();
        let decision = check(&store, "k", 3).await.unwrap();
        assert_eq!(decision, RateLimitDecision { allowed: true, remaining: 2 });
    }

    #[tokio::test]
    async fn test_counter_expires_with_window() {
        let store = MemoryStore::new();
        let window = Duration::from_millis(20);
        assert!(check_with_window(&store, "k", 1, window).await.unwrap().allowed);
        assert!(!check_with_window(&store, "k", 1, window).await.unwrap().allowed);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(check_with_window(&store, "k", 1, window).await.unwrap().allowed);
    }

    struct FailingStore;

    #[async_trait]
    impl KvStore for FailingStore {
        async fn get(&self, _: &str) -> StoreResult<Option<String>> {
            Err(StoreError::Backend("unavailable".into()))
        }
        async fn put(&self, _: &str, _: &str, _: Option<Duration>) -> StoreResult<()> {
            Err(StoreError::Backend("unavailable".into()))
        }
        async fn delete(&self, _: &str) -> StoreResult<()> {
            Ok(())
        }
        async fn list(&self, _: ListOptions) -> StoreResult<ListResult> {
            Err(StoreError::Backend("unavailable".into()))
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let err = check(&FailingStore, "k", 5).await.unwrap_err();
        assert!(matches!(err, crate::Error::Store(_)));
    }

    #[tokio::test]
    async fn test_limiter_separates_identities_and_buckets() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let now = at(2026, 1, 14, 10);
        let search = RateLimiter::new(RateLimiterConfig::new().with_daily_limit(1), store.clone());
        let upload = RateLimiter::new(
            RateLimiterConfig::new().with_daily_limit(1).with_bucket("upload"),
            store.clone(),
        );

        assert!(search.check_at("198.51.100.1", now).await.unwrap().allowed);
        assert!(!search.check_at("198.51.100.1", now).await.unwrap().allowed);
        assert!(search.check_at("198.51.100.2", now).await.unwrap().allowed);
        assert!(upload.check_at("198.51.100.1", now).await.unwrap().allowed);

        assert_eq!(
            store.get("upload:198.51.100.1:2026-01-14").await.unwrap().as_deref(),
            Some("1")
        );
    }
}
