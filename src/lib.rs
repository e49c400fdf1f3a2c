//! # image-search-guard
//!
//! Request admission and response memoization for a reverse-image-search service.
//!
//! ## Overview
//!
//! Every search request passes through a defensive core before any external fetch or
//! provider call is made. The core rejects URLs that point at internal infrastructure,
//! enforces a per-client daily quota, and deduplicates identical searches through a
//! content-addressed cache backed by an eventually-consistent key-value store.
//!
//! ## Key Features
//!
//! - **SSRF gate**: [`guard::UrlValidator`] rejects private, loopback, link-local and
//!   cloud-metadata targets, including double-encoded bypass attempts
//! - **Daily quota**: [`resilience::rate_limiter`] keys counters by identity and UTC day
//! - **Result cache**: [`cache::ResultCache`] maps content digests and provider task ids to
//!   cached results, failing open on read errors
//! - **Provider normalization**: [`provider`] flattens loosely-shaped provider payloads
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use image_search_guard::{GuardConfig, SearchGate, SearchRequest, store::MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> image_search_guard::Result<()> {
//!     let gate = SearchGate::new(GuardConfig::from_env(), Arc::new(MemoryStore::new()));
//!     let request = SearchRequest::from_url("203.0.113.9", "https://images.example.com/cat.jpg");
//!     let admission = gate.admit(&request).await?;
//!     println!("{:?}", admission);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`digest`] | SHA-256 content fingerprints |
//! | [`guard`] | URL validation and client identity extraction |
//! | [`resilience`] | Store-backed daily rate limiting |
//! | [`cache`] | Search result cache and task index |
//! | [`provider`] | Provider payload extraction |
//! | [`store`] | Key-value store seam and in-memory backend |
//! | [`config`] | Configuration loading |

pub mod cache;
pub mod config;
pub mod digest;
pub mod gate;
pub mod guard;
pub mod provider;
pub mod resilience;
pub mod store;
pub mod types;

pub use cache::{CacheKey, ResultCache};
pub use config::GuardConfig;
pub use gate::{Admission, SearchGate, SearchRequest};
pub use guard::{UrlError, UrlValidator};
pub use types::{CachedSearchResult, SearchResult};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
