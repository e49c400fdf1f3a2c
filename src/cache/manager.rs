//! Result cache over the key-value store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::key::{CacheKey, DEFAULT_NAMESPACE};
use crate::store::{KvStore, StoreError, StoreResult};
use crate::types::CachedSearchResult;
use crate::Result;

/// Prefix of the task index table.
pub const TASK_PREFIX: &str = "task:";

fn task_key(task_id: &str) -> String {
    format!("{}{}", TASK_PREFIX, task_id)
}

/// Read an entry, keeping store failures visible.
///
/// Missing and malformed values are `Ok(None)`. A value is malformed when it is not a JSON
/// object, when `results` is not an array, or when it does not decode as a
/// [`CachedSearchResult`].
pub async fn try_get(store: &dyn KvStore, key: &CacheKey) -> StoreResult<Option<CachedSearchResult>> {
    let Some(raw) = store.get(key.as_str()).await? else {
        return Ok(None);
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    if !value.is_object() || !value["results"].is_array() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Read an entry; store errors become misses.
pub async fn get(store: &dyn KvStore, key: &CacheKey) -> Option<CachedSearchResult> {
    match try_get(store, key).await {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
            None
        }
    }
}

/// Write an entry, replacing any previous one. Errors propagate.
pub async fn put(
    store: &dyn KvStore,
    key: &CacheKey,
    payload: &CachedSearchResult,
    ttl: Duration,
) -> Result<()> {
    let data =
        serde_json::to_string(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
    store.put(key.as_str(), &data, Some(ttl)).await?;
    Ok(())
}

/// Record which cache entry a provider task will populate.
pub async fn map_task(
    store: &dyn KvStore,
    task_id: &str,
    key: &CacheKey,
    ttl: Duration,
) -> Result<()> {
    store.put(&task_key(task_id), key.as_str(), Some(ttl)).await?;
    Ok(())
}

/// Cache key for a provider task; store errors become `None`.
pub async fn resolve_task(store: &dyn KvStore, task_id: &str) -> Option<CacheKey> {
    match store.get(&task_key(task_id)).await {
        Ok(Some(key)) if !key.is_empty() => Some(CacheKey::from(key)),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(task_id, error = %e, "task index read failed");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of cached results.
    pub ttl: Duration,
    /// Lifetime of task index entries, independent of `ttl`.
    pub task_ttl: Duration,
    pub namespace: String,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 3600),
            task_ttl: Duration::from_secs(3600),
            namespace: DEFAULT_NAMESPACE.to_string(),
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
    pub fn with_task_ttl(mut self, ttl: Duration) -> Self {
        self.task_ttl = ttl;
        self
    }
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub errors: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    errors: AtomicU64,
}

impl AtomicStats {
    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Search result cache plus the task index, sharing one store.
pub struct ResultCache {
    config: CacheConfig,
    store: Arc<dyn KvStore>,
    stats: Arc<AtomicStats>,
}

impl ResultCache {
    pub fn new(config: CacheConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            config,
            store,
            stats: Arc::new(AtomicStats::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn key_for(&self, image_url: &str, image_hash: Option<&str>) -> CacheKey {
        CacheKey::for_image(&self.config.namespace, image_url, image_hash)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedSearchResult> {
        if !self.config.enabled {
            return None;
        }
        match try_get(self.store.as_ref(), key).await {
            Ok(Some(entry)) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &CacheKey, payload: &CachedSearchResult) -> Result<()> {
        self.put_with_ttl(key, payload, self.config.ttl).await
    }

    pub async fn put_with_ttl(
        &self,
        key: &CacheKey,
        payload: &CachedSearchResult,
        ttl: Duration,
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        match put(self.store.as_ref(), key, payload, ttl).await {
            Ok(()) => {
                self.stats.sets.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub async fn map_task(&self, task_id: &str, key: &CacheKey) -> Result<()> {
        map_task(self.store.as_ref(), task_id, key, self.config.task_ttl).await
    }

    pub async fn resolve_task(&self, task_id: &str) -> Option<CacheKey> {
        resolve_task(self.store.as_ref(), task_id).await
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }
}
