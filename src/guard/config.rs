//! URL policy configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether hostnames must appear in an explicit allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "hosts")]
pub enum AllowList {
    /// Any public hostname is admitted
    #[default]
    Disabled,
    /// Only these exact (lower-cased) hostnames are admitted
    Only(BTreeSet<String>),
}

impl AllowList {
    /// Build from a host list; an empty list disables the allow-list.
    pub fn from_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = hosts
            .into_iter()
            .map(|h| h.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        if set.is_empty() {
            AllowList::Disabled
        } else {
            AllowList::Only(set)
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, AllowList::Only(_))
    }

    /// `true` when the allow-list is active and `host` is not on it.
    pub fn excludes(&self, host: &str) -> bool {
        match self {
            AllowList::Disabled => false,
            AllowList::Only(hosts) => !hosts.contains(host),
        }
    }
}

/// Immutable host policy handed to [`UrlValidator`](super::UrlValidator) at construction.
///
/// The built-in local, metadata and address-range rules always apply; this type only adds
/// an allow-list and extra exact-match denials on top of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPolicy {
    #[serde(default)]
    pub allow_list: AllowList,
    #[serde(default)]
    pub extra_blocked_hosts: BTreeSet<String>,
}

impl UrlPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> UrlPolicyBuilder {
        UrlPolicyBuilder::default()
    }
}

/// Builder for [`UrlPolicy`]
#[derive(Debug, Default)]
pub struct UrlPolicyBuilder {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl UrlPolicyBuilder {
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed.push(host.into());
        self
    }

    pub fn allow_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(hosts.into_iter().map(Into::into));
        self
    }

    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked.push(host.into());
        self
    }

    pub fn build(self) -> UrlPolicy {
        UrlPolicy {
            allow_list: AllowList::from_hosts(self.allowed),
            extra_blocked_hosts: self
                .blocked
                .iter()
                .map(|h| h.trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }
}
