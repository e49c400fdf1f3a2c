//! Configuration loading.
//!
//! TTLs, quotas and host lists are deployment parameters. They come from a YAML file, from
//! environment variables, or both (environment wins):
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `IMAGE_GUARD_CACHE_TTL_SECS` | `cache.ttl_secs` | 86400 |
//! | `IMAGE_GUARD_TASK_TTL_SECS` | `cache.task_ttl_secs` | 3600 |
//! | `IMAGE_GUARD_DAILY_LIMIT` | `rate_limit.daily_limit` | 20 |
//! | `IMAGE_GUARD_ALLOWED_HOSTS` | `url.allowed_hosts` (comma separated) | empty |
//!
//! Unparseable numbers in the environment are ignored and the previous value kept, as is
//! an empty host list.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cache::{CacheConfig, DEFAULT_NAMESPACE};
use crate::guard::UrlPolicy;
use crate::resilience::rate_limiter::{RateLimiterConfig, DAILY_WINDOW, DEFAULT_BUCKET};
use crate::{Error, ErrorContext, Result};

pub const ENV_CACHE_TTL_SECS: &str = "IMAGE_GUARD_CACHE_TTL_SECS";
pub const ENV_TASK_TTL_SECS: &str = "IMAGE_GUARD_TASK_TTL_SECS";
pub const ENV_DAILY_LIMIT: &str = "IMAGE_GUARD_DAILY_LIMIT";
pub const ENV_ALLOWED_HOSTS: &str = "IMAGE_GUARD_ALLOWED_HOSTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub ttl_secs: u64,
    pub task_ttl_secs: u64,
    pub namespace: String,
    pub enabled: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 3600,
            task_ttl_secs: 3600,
            namespace: DEFAULT_NAMESPACE.to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub daily_limit: u64,
    pub bucket: String,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            daily_limit: 20,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlSection {
    /// Empty disables the allow-list.
    pub allowed_hosts: Vec<String>,
    pub extra_blocked_hosts: Vec<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub cache: CacheSection,
    pub rate_limit: RateLimitSection,
    pub url: UrlSection,
}

impl GuardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            Error::configuration_with_context(
                "invalid configuration YAML",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })
    }

    /// Load a YAML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            Error::Configuration { message, context } => Error::Configuration {
                message,
                context: context.with_field_path(path.display().to_string()),
            },
            other => other,
        })?;
        let config = config.with_env_overrides();
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |name: &str| lookup(name).and_then(|s| s.trim().parse::<u64>().ok());

        if let Some(v) = number(ENV_CACHE_TTL_SECS) {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = number(ENV_TASK_TTL_SECS) {
            self.cache.task_ttl_secs = v;
        }
        if let Some(v) = number(ENV_DAILY_LIMIT) {
            self.rate_limit.daily_limit = v;
        }
        if let Some(raw) = lookup(ENV_ALLOWED_HOSTS) {
            let hosts: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
            // an empty override never widens a configured allow-list
            if hosts.is_empty() {
                if !self.url.allowed_hosts.is_empty() {
                    tracing::warn!(
                        var = ENV_ALLOWED_HOSTS,
                        "empty allow-list override ignored, keeping configured hosts"
                    );
                }
            } else {
                self.url.allowed_hosts = hosts;
            }
        }
        self
    }

    /// Reject values that would make the cache or limiter meaningless.
    pub fn validate(&self) -> Result<()> {
        let zero = |field: &str| {
            Err(Error::configuration_with_context(
                "value must be greater than zero",
                ErrorContext::new().with_field_path(field),
            ))
        };
        if self.cache.ttl_secs == 0 {
            return zero("cache.ttl_secs");
        }
        if self.cache.task_ttl_secs == 0 {
            return zero("cache.task_ttl_secs");
        }
        if self.cache.namespace.is_empty() || self.cache.namespace.contains(':') {
            return Err(Error::configuration_with_context(
                "namespace must be non-empty and must not contain ':'",
                ErrorContext::new().with_field_path("cache.namespace"),
            ));
        }
        if self.rate_limit.bucket.is_empty() || self.rate_limit.bucket.contains(':') {
            return Err(Error::configuration_with_context(
                "bucket must be non-empty and must not contain ':'",
                ErrorContext::new().with_field_path("rate_limit.bucket"),
            ));
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_ttl(Duration::from_secs(self.cache.ttl_secs))
            .with_task_ttl(Duration::from_secs(self.cache.task_ttl_secs))
            .with_namespace(self.cache.namespace.clone())
            .with_enabled(self.cache.enabled)
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            daily_limit: self.rate_limit.daily_limit,
            bucket: self.rate_limit.bucket.clone(),
            window: DAILY_WINDOW,
        }
    }

    pub fn url_policy(&self) -> UrlPolicy {
        self.url
            .extra_blocked_hosts
            .iter()
            .fold(
                UrlPolicy::builder().allow_hosts(self.url.allowed_hosts.iter().cloned()),
                |builder, host| builder.block_host(host.clone()),
            )
            .build()
    }
}
