//! 结果缓存模块：按内容摘要去重搜索请求，并将异步任务映射回缓存条目。
//!
//! # Result Cache Module
//!
//! Memoizes provider answers so identical searches hit the provider once.
//!
//! ## Overview
//!
//! Two tables share the key-value store:
//! - the **result table**, `{namespace}:{hash|url}:{digest}` → [`CachedSearchResult`] JSON
//! - the **task table**, `task:{taskId}` → result-table key
//!
//! The provider may answer asynchronously with only a task id. The task table lets the
//! later callback find which result entry to fill. Each table has its own TTL, so a task
//! mapping can expire long before (or after) the result it points to.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResultCache`] | Cache bound to a store, with TTLs and statistics |
//! | [`CacheConfig`] | TTLs, namespace and on/off switch |
//! | [`CacheKey`] | Content-addressed key |
//! | [`get`] / [`put`] | Store-level operations |
//! | [`map_task`] / [`resolve_task`] | Task index |
//!
//! ## Failure policy
//!
//! Reads fail open: a store error or a malformed entry is reported as a miss, and the
//! request goes on to the provider. Writes propagate errors; the caller decides whether
//! a failed write matters.
//!
//! [`CachedSearchResult`]: crate::types::CachedSearchResult

mod key;
mod manager;

pub use key::{build_cache_key, CacheKey, SourceKind, DEFAULT_NAMESPACE};
pub use manager::{
    get, map_task, put, resolve_task, try_get, CacheConfig, CacheStats, ResultCache, TASK_PREFIX,
};
