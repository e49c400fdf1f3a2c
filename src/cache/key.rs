//! Cache key generation.

use serde::{Deserialize, Serialize};

use crate::digest::digest;

/// Namespace used by [`build_cache_key`].
pub const DEFAULT_NAMESPACE: &str = "search";

/// Where the digest in a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Caller-supplied content digest; identical bytes share one entry.
    Hash,
    /// Digest of the URL string; used only when no content digest is known.
    Url,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Hash => "hash",
            SourceKind::Url => "url",
        }
    }
}

/// `{namespace}:{source-kind}:{digest}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(namespace: &str, kind: SourceKind, digest: &str) -> Self {
        Self(format!("{}:{}:{}", namespace, kind.as_str(), digest))
    }

    /// Key for an image in `namespace`, preferring the content digest over the URL.
    pub fn for_image(namespace: &str, image_url: &str, image_hash: Option<&str>) -> Self {
        match image_hash.map(str::trim).filter(|h| !h.is_empty()) {
            Some(hash) => Self::new(namespace, SourceKind::Hash, &hash.to_ascii_lowercase()),
            None => Self::new(namespace, SourceKind::Url, &digest(image_url)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        match self.0.split(':').nth(1) {
            Some("hash") => Some(SourceKind::Hash),
            Some("url") => Some(SourceKind::Url),
            _ => None,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Key in the default namespace. See [`CacheKey::for_image`].
pub fn build_cache_key(image_url: &str, image_hash: Option<&str>) -> CacheKey {
    CacheKey::for_image(DEFAULT_NAMESPACE, image_url, image_hash)
}
