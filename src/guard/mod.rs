//! 请求准入模块：在任何外部抓取之前校验不可信的 URL 与客户端身份。
//!
//! # Guard Module
//!
//! Admission checks that run before the service touches the network on a client's
//! behalf.
//!
//! ## Overview
//!
//! A reverse-image-search request may name a remote image by URL. Fetching that URL from
//! inside the service turns the service into a proxy, so every URL must pass the
//! validator first:
//! - Only `https` URLs without embedded credentials are admitted
//! - Loopback, private, link-local, CGNAT and multicast literals are refused
//! - Cloud metadata endpoints and local-only hostnames are refused
//! - Percent-encoding (including double encoding) is undone before any check
//!
//! ## Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`UrlValidator`] | Validates and canonicalizes untrusted URLs |
//! | [`UrlPolicy`] | Immutable allow/deny configuration |
//! | [`AllowList`] | Explicit allow-list switch |
//! | [`UrlError`] | Rejection reasons |
//! | [`client_identity`] | Derives the rate-limit subject from request headers |
//!
//! ## Example
//!
//! ```rust
//! use image_search_guard::guard::{UrlError, UrlValidator};
//!
//! let validator = UrlValidator::default();
//! assert_eq!(validator.validate("https://8.8.8.8/x").unwrap(), "https://8.8.8.8/x");
//! assert!(matches!(
//!     validator.validate("https://169.254.169.254/latest/meta-data"),
//!     Err(UrlError::BlockedHost(_))
//! ));
//! ```
//!
//! String inspection cannot catch a hostname that resolves to a private address at fetch
//! time. [`UrlValidator::validate_resolved`] resolves the host and checks every address;
//! callers that need rebinding protection must connect to the returned addresses.

mod config;
mod host;
mod identity;
mod validator;

pub use config::{AllowList, UrlPolicy, UrlPolicyBuilder};
pub use host::{is_blocked_ip, is_blocked_ipv4, is_blocked_ipv6};
pub use identity::{
    client_identity, HeaderSource, FALLBACK_IDENTITY, FORWARDED_FOR_HEADER,
    TRUSTED_CLIENT_IP_HEADER,
};
pub use validator::{normalize_encoding, validate, ResolvedUrl, UrlError, UrlValidator};
