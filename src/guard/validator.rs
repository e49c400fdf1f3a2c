//! URL validation

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use url::{Host, Url};

use super::config::UrlPolicy;
use super::host::{canonical_host, is_blocked_hostname, is_blocked_ip};

static PERCENT_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[0-9A-Fa-f]{2}").expect("percent-sequence pattern is valid"));

static DEFAULT_VALIDATOR: Lazy<UrlValidator> = Lazy::new(UrlValidator::default);

/// Why a URL was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported scheme '{0}': only https is allowed")]
    UnsupportedScheme(String),

    #[error("URLs with embedded credentials are not allowed")]
    CredentialsNotAllowed,

    #[error("host '{0}' is not allowed")]
    BlockedHost(String),

    #[error("host '{host}' could not be resolved: {reason}")]
    UnresolvableHost { host: String, reason: String },
}

impl UrlError {
    /// Stable snake_case code for HTTP responses.
    pub fn code(&self) -> &'static str {
        match self {
            UrlError::InvalidUrl(_) => "invalid_url",
            UrlError::UnsupportedScheme(_) => "unsupported_scheme",
            UrlError::CredentialsNotAllowed => "credentials_not_allowed",
            UrlError::BlockedHost(_) => "blocked_host",
            UrlError::UnresolvableHost { .. } => "unresolvable_host",
        }
    }
}

/// Undo percent-encoding before any structural check.
///
/// Decodes once; decodes a second time only when encoded sequences remain and the second
/// pass changes the string. Invalid UTF-8 after decoding falls back to the input.
pub fn normalize_encoding(raw: &str) -> String {
    let once = match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return raw.to_string(),
    };

    if PERCENT_SEQUENCE.is_match(&once) {
        if let Ok(twice) = percent_decode_str(&once).decode_utf8() {
            if twice != once {
                return twice.into_owned();
            }
        }
    }
    once
}

/// Validate with the default policy. See [`UrlValidator::validate`].
pub fn validate(raw: &str) -> Result<String, UrlError> {
    DEFAULT_VALIDATOR.validate(raw)
}

/// A validated URL together with the addresses its host resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    /// Every address checked; connect only to these.
    pub addrs: Vec<SocketAddr>,
}

/// SSRF gate for client-supplied URLs.
#[derive(Debug, Clone, Default)]
pub struct UrlValidator {
    policy: UrlPolicy,
}

impl UrlValidator {
    pub fn new(policy: UrlPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UrlPolicy {
        &self.policy
    }

    /// Returns the canonical form of `raw`, which callers must use for the fetch.
    pub fn validate(&self, raw: &str) -> Result<String, UrlError> {
        self.validate_url(raw).map(|u| u.to_string())
    }

    /// Like [`validate`](Self::validate) but returns the parsed [`Url`].
    ///
    /// Security checks run on the decoded form. The returned URL is the parse of the raw
    /// input, so encoded delimiters in the path or query keep their meaning. Input whose
    /// raw and decoded parses disagree on scheme, userinfo, host or port is refused.
    pub fn validate_url(&self, raw: &str) -> Result<Url, UrlError> {
        let raw = raw.trim();
        let decoded = self.check_parsed(&normalize_encoding(raw))?;
        let url = self.check_parsed(raw)?;

        if url.scheme() != decoded.scheme()
            || url.username() != decoded.username()
            || url.password() != decoded.password()
            || url.host_str() != decoded.host_str()
            || url.port_or_known_default() != decoded.port_or_known_default()
        {
            tracing::warn!(url = %url, decoded = %decoded, "encoded delimiters change URL authority");
            return Err(UrlError::InvalidUrl(
                "percent-encoding changes the URL authority".into(),
            ));
        }

        tracing::debug!(url = %url, "URL admitted");
        Ok(url)
    }

    fn check_parsed(&self, candidate: &str) -> Result<Url, UrlError> {
        let url = Url::parse(candidate).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

        if url.scheme() != "https" {
            return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(UrlError::CredentialsNotAllowed);
        }

        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(UrlError::InvalidUrl("missing hostname".into())),
        };

        if self.is_blocked_hostname(&host) {
            tracing::warn!(host = %host, "rejected URL with blocked host");
            return Err(UrlError::BlockedHost(canonical_host(&host)));
        }
        Ok(url)
    }

    pub fn is_blocked_hostname(&self, hostname: &str) -> bool {
        is_blocked_hostname(&self.policy, hostname)
    }

    /// Validate, then resolve the host and reject if any resulting address is blocked.
    pub async fn validate_resolved(&self, raw: &str) -> Result<ResolvedUrl, UrlError> {
        let url = self.validate_url(raw)?;
        let port = url.port_or_known_default().unwrap_or(443);

        let addrs: Vec<SocketAddr> = match url.host() {
            Some(Host::Ipv4(ip)) => vec![SocketAddr::new(IpAddr::V4(ip), port)],
            Some(Host::Ipv6(ip)) => vec![SocketAddr::new(IpAddr::V6(ip), port)],
            Some(Host::Domain(domain)) => tokio::net::lookup_host((domain, port))
                .await
                .map_err(|e| UrlError::UnresolvableHost {
                    host: domain.to_string(),
                    reason: e.to_string(),
                })?
                .collect(),
            None => return Err(UrlError::InvalidUrl("missing hostname".into())),
        };

        if addrs.is_empty() {
            return Err(UrlError::UnresolvableHost {
                host: url.host_str().unwrap_or_default().to_string(),
                reason: "no addresses".into(),
            });
        }
        if let Some(bad) = addrs.iter().find(|a| is_blocked_ip(a.ip())) {
            tracing::warn!(host = ?url.host_str(), addr = %bad, "host resolved to blocked address");
            return Err(UrlError::BlockedHost(bad.ip().to_string()));
        }

        Ok(ResolvedUrl {
            url: url.to_string(),
            addrs,
        })
    }
}
