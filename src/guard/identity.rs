//! Client identity extraction

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Header injected by the edge proxy; trusted over anything the client sends.
pub const TRUSTED_CLIENT_IP_HEADER: &str = "cf-connecting-ip";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Identity used when no header carries a usable address.
pub const FALLBACK_IDENTITY: &str = "127.0.0.1";

/// Case-insensitive header lookup.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderSource for [(K, V)] {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(k, _)| k.as_ref().eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_ref())
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderSource for Vec<(K, V)> {
    fn header(&self, name: &str) -> Option<&str> {
        self.as_slice().header(name)
    }
}

/// Rate-limit subject for a request.
///
/// Tries the trusted edge header, then the first `X-Forwarded-For` hop, then falls back to
/// [`FALLBACK_IDENTITY`]. Only literal IP addresses are accepted, so arbitrary header text
/// never reaches a store key.
pub fn client_identity<H: HeaderSource + ?Sized>(headers: &H) -> String {
    let trusted = headers.header(TRUSTED_CLIENT_IP_HEADER);
    let forwarded = headers
        .header(FORWARDED_FOR_HEADER)
        .and_then(|v| v.split(',').next());

    [trusted, forwarded]
        .into_iter()
        .flatten()
        .find_map(parse_client_ip)
        .unwrap_or_else(|| FALLBACK_IDENTITY.to_string())
}

fn parse_client_ip(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    // [v6]:port, kept as given
    if let Some(rest) = candidate.strip_prefix('[') {
        let (addr, tail) = rest.split_once(']')?;
        addr.parse::<Ipv6Addr>().ok()?;
        let port_ok = tail.is_empty()
            || tail
                .strip_prefix(':')
                .map(|p| p.parse::<u16>().is_ok())
                .unwrap_or(false);
        return port_ok.then(|| candidate.to_string());
    }

    if let Ok(ip) = candidate.parse::<IpAddr>() {
        return Some(ip.to_string());
    }

    // v4:port
    let (addr, port) = candidate.split_once(':')?;
    port.parse::<u16>().ok()?;
    addr.parse::<Ipv4Addr>().ok().map(|ip| ip.to_string())
}
