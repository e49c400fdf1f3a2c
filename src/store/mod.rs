//! Key-value store seam.
//!
//! # Key-Value Store
//!
//! The admission core never owns storage. Rate-limit counters, cached search results and the
//! task index all live in an external, eventually-consistent key-value store with per-key
//! expiry. This module defines the [`KvStore`] trait the core talks to, plus two local
//! backends.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`KvStore`] | Trait implemented by store clients |
//! | [`MemoryStore`] | In-process store with TTL expiry, for tests and single-node use |
//! | [`NullStore`] | Store that keeps nothing; every read misses |
//!
//! Implementations must not be assumed to offer atomic read-modify-write. Callers that
//! need a counter read the value, then write the new one, and accept the race.

mod memory;

pub use memory::{MemoryStore, NullStore};

use async_trait::async_trait;
use std::time::Duration;

/// Errors raised by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("backend failure: {0}")]
    Backend(String),

    #[error("value could not be encoded: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Options for [`KvStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    /// Opaque cursor returned by a previous call.
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One page of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResult {
    pub keys: Vec<String>,
    pub cursor: Option<String>,
    pub list_complete: bool,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    /// Store `value`, replacing any previous one. `ttl: None` keeps it until deleted.
    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<()>;
    async fn list(&self, options: ListOptions) -> StoreResult<ListResult>;
    fn name(&self) -> &'static str;
}
