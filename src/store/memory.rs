//! In-process store backends.

use super::{KvStore, ListOptions, ListResult, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|t| Instant::now() + t),
        }
    }
    fn is_expired(&self) -> bool {
        self.expires_at.map(|at| Instant::now() >= at).unwrap_or(false)
    }
}

/// Writes between sweeps of expired entries.
const PURGE_INTERVAL: u64 = 256;

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

/// Key-value store held in process memory.
///
/// Keys are kept ordered so `list` pages deterministically. Expired entries are dropped
/// lazily on access and swept every few hundred writes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|e| e.values().filter(|v| !v.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let expired = match entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return Ok(None),
        };
        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_INTERVAL == 0 {
            entries.retain(|_, e| !e.is_expired());
        }
        entries.insert(key.to_string(), Entry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().map_err(poisoned)?.remove(key);
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> StoreResult<ListResult> {
        let entries = self.entries.read().map_err(poisoned)?;
        let prefix = options.prefix.as_deref().unwrap_or("");
        let limit = options.limit.unwrap_or(1000).max(1);

        let mut matching = entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && !e.is_expired())
            .filter(|(k, _)| match options.cursor.as_deref() {
                Some(after) => k.as_str() > after,
                None => true,
            })
            .map(|(k, _)| k.clone());

        let keys: Vec<String> = matching.by_ref().take(limit).collect();
        let list_complete = matching.next().is_none();
        let cursor = if list_complete { None } else { keys.last().cloned() };
        Ok(ListResult {
            keys,
            cursor,
            list_complete,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Store that discards every write.
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for NullStore {
    async fn get(&self, _: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }
    async fn put(&self, _: &str, _: &str, _: Option<Duration>) -> StoreResult<()> {
        Ok(())
    }
    async fn delete(&self, _: &str) -> StoreResult<()> {
        Ok(())
    }
    async fn list(&self, _: ListOptions) -> StoreResult<ListResult> {
        Ok(ListResult {
            keys: Vec::new(),
            cursor: None,
            list_complete: true,
        })
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();
        store.put("a", "1", None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        store.put("a", "2", None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        store.delete("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new();
        store
            .put("short", "x", Some(Duration::from_millis(20)))
            .await
            .unwrap();
        store.put("long", "y", Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(store.len(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap().as_deref(), Some("y"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_swept_on_interval() {
        let store = MemoryStore::new();
        let raw_len = |s: &MemoryStore| s.entries.read().unwrap().len();

        store
            .put("stale", "x", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        store.put("k0", "v", None).await.unwrap();
        assert_eq!(raw_len(&store), 2, "no sweep before the interval");

        for i in 1..PURGE_INTERVAL - 2 {
            store.put(&format!("k{}", i), "v", None).await.unwrap();
        }
        assert!(store.entries.read().unwrap().contains_key("stale"));

        store.put("last", "v", None).await.unwrap();
        assert!(!store.entries.read().unwrap().contains_key("stale"));
        assert_eq!(raw_len(&store) as u64, PURGE_INTERVAL - 1);
    }

    #[tokio::test]
    async fn test_list_pages_with_cursor() {
        let store = MemoryStore::new();
        for k in ["task:a", "task:b", "task:c", "search:hash:z"] {
            store.put(k, "v", None).await.unwrap();
        }

        let first = store
            .list(ListOptions::new().with_prefix("task:").with_limit(2))
            .await
            .unwrap();
        assert_eq!(first.keys, vec!["task:a", "task:b"]);
        assert!(!first.list_complete);

        let second = store
            .list(
                ListOptions::new()
                    .with_prefix("task:")
                    .with_limit(2)
                    .with_cursor(first.cursor.unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["task:c"]);
        assert!(second.list_complete);
        assert_eq!(second.cursor, None);
    }

    #[tokio::test]
    async fn test_null_store_never_retains() {
        let store = NullStore::new();
        store.put("k", "v", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.list(ListOptions::new()).await.unwrap().list_complete);
        assert_eq!(store.name(), "null");
    }
}
