//! Request admission pipeline.
//!
//! Validates the image source, charges the client's daily quota and consults the result
//! cache, in that order. On a miss the caller invokes the provider and hands the answer
//! back through [`SearchGate::record_response`] or, for asynchronous tasks,
//! [`SearchGate::record_pending`] followed by [`SearchGate::complete`].

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::cache::{CacheKey, ResultCache};
use crate::config::GuardConfig;
use crate::guard::UrlValidator;
use crate::provider::{extract_check_url, extract_search_results, extract_task_id};
use crate::resilience::rate_limiter::RateLimiter;
use crate::store::KvStore;
use crate::types::CachedSearchResult;
use crate::{Error, Result};

/// Where the image to search for comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Client-supplied URL; untrusted and validated before use.
    Remote(String),
    /// Image already uploaded to our own storage, identified by its content digest.
    Upload { hash: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Rate-limit subject, see [`client_identity`](crate::guard::client_identity).
    pub identity: String,
    pub source: ImageSource,
}

impl SearchRequest {
    pub fn from_url(identity: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            source: ImageSource::Remote(url.into()),
        }
    }

    pub fn from_upload(
        identity: impl Into<String>,
        hash: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            source: ImageSource::Upload {
                hash: hash.into(),
                url: url.into(),
            },
        }
    }
}

/// Outcome of [`SearchGate::admit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Served from cache; no provider call needed.
    Cached {
        key: CacheKey,
        result: CachedSearchResult,
    },
    /// Admitted; call the provider with `fetch_url`.
    Miss {
        key: CacheKey,
        /// Canonical URL to hand to the provider or fetcher.
        fetch_url: String,
        /// Quota left today after this request.
        remaining: u64,
    },
}

impl Admission {
    pub fn key(&self) -> &CacheKey {
        match self {
            Admission::Cached { key, .. } | Admission::Miss { key, .. } => key,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Admission::Cached { .. })
    }
}

pub struct SearchGate {
    validator: UrlValidator,
    limiter: RateLimiter,
    cache: ResultCache,
}

impl SearchGate {
    pub fn new(config: GuardConfig, store: Arc<dyn KvStore>) -> Self {
        Self {
            validator: UrlValidator::new(config.url_policy()),
            limiter: RateLimiter::new(config.rate_limiter_config(), store.clone()),
            cache: ResultCache::new(config.cache_config(), store),
        }
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub async fn admit(&self, request: &SearchRequest) -> Result<Admission> {
        self.admit_at(request, Utc::now()).await
    }

    /// [`admit`](Self::admit) with an explicit clock, for quota-day tests.
    pub async fn admit_at(&self, request: &SearchRequest, now: DateTime<Utc>) -> Result<Admission> {
        let (fetch_url, hash) = match &request.source {
            ImageSource::Remote(raw) => (self.validator.validate(raw)?, None),
            ImageSource::Upload { hash, url } => (url.clone(), Some(hash.as_str())),
        };

        let decision = self.limiter.check_at(&request.identity, now).await?;
        if !decision.allowed {
            return Err(Error::RateLimited {
                identity: request.identity.clone(),
                limit: self.limiter.config().daily_limit,
            });
        }

        let key = self.cache.key_for(&fetch_url, hash);
        match self.cache.get(&key).await {
            Some(result) => {
                tracing::debug!(key = %key, "search served from cache");
                Ok(Admission::Cached { key, result })
            }
            None => Ok(Admission::Miss {
                key,
                fetch_url,
                remaining: decision.remaining,
            }),
        }
    }

    /// Remember that provider task `task_id` will produce the result for `key`.
    pub async fn record_pending(&self, key: &CacheKey, task_id: &str) -> Result<()> {
        self.cache.map_task(task_id, key).await
    }

    /// Normalize a provider payload and store it under `key`.
    pub async fn record_response(&self, key: &CacheKey, payload: &Value) -> Result<CachedSearchResult> {
        let entry = build_entry(payload);
        self.cache.put(key, &entry).await?;
        Ok(entry)
    }

    /// Store the result of an asynchronous task. `None` when the task is unknown or its
    /// mapping has expired.
    pub async fn complete(&self, task_id: &str, payload: &Value) -> Result<Option<CachedSearchResult>> {
        let Some(key) = self.cache.resolve_task(task_id).await else {
            tracing::info!(task_id, "completion for unknown task dropped");
            return Ok(None);
        };
        let mut entry = build_entry(payload);
        if entry.task_id.is_none() {
            entry.task_id = Some(task_id.to_string());
        }
        self.cache.put(&key, &entry).await?;
        Ok(Some(entry))
    }
}

fn build_entry(payload: &Value) -> CachedSearchResult {
    let mut entry = CachedSearchResult::new(extract_search_results(payload));
    entry.task_id = extract_task_id(payload);
    entry.check_url = extract_check_url(payload);
    entry
}
