//! 限流模块：基于键值存储的按日配额。
//!
//! # Resilience Primitives Module
//!
//! Abuse protection for the search endpoint.
//!
//! ## Rate Limiter
//!
//! Each client identity gets a fixed number of admitted requests per UTC calendar day.
//! Counters live in the shared key-value store under `{bucket}:{identity}:{YYYY-MM-DD}`
//! and expire on their own after one day.
//!
//! ```rust
//! use image_search_guard::resilience::rate_limiter::{check, build_key};
//! use image_search_guard::store::MemoryStore;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let key = build_key("203.0.113.9", chrono::Utc::now(), None);
//! let decision = check(&store, &key, 2).await.unwrap();
//! assert!(decision.allowed);
//! assert_eq!(decision.remaining, 1);
//! # });
//! ```
//!
//! The store offers no atomic increment, so the check is read-then-write. Concurrent
//! requests from one identity can slip past the limit; treat it as a deterrent, not a
//! billing-grade quota.

pub mod rate_limiter;
