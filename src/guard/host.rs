//! Hostname and address blocking rules.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::config::UrlPolicy;

const LOCAL_HOSTNAMES: &[&str] = &["localhost", "localhost.localdomain", "local"];

const LOCAL_SUFFIXES: &[&str] = &[".local", ".localhost", ".internal", ".localdomain"];

const METADATA_HOSTNAMES: &[&str] = &[
    "metadata.google.internal",
    "metadata",
    "169.254.169.254",
    "169.254.170.2",
    "fd00:ec2::254",
    "instance-data",
    "instance-data.ec2.internal",
];

/// Lower-case, strip IPv6 brackets and a trailing root dot.
pub(crate) fn canonical_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.trim_end_matches('.').to_ascii_lowercase()
}

pub(crate) fn is_blocked_hostname(policy: &UrlPolicy, hostname: &str) -> bool {
    let host = canonical_host(hostname);
    if host.is_empty() {
        return true;
    }

    if policy.allow_list.excludes(&host) {
        return true;
    }
    if policy.extra_blocked_hosts.contains(&host) {
        return true;
    }

    if LOCAL_HOSTNAMES.contains(&host.as_str())
        || LOCAL_SUFFIXES.iter().any(|s| host.ends_with(s))
    {
        return true;
    }

    if METADATA_HOSTNAMES.contains(&host.as_str())
        || host.starts_with("metadata.")
        || host.ends_with(".metadata")
    {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(ip) => is_blocked_ip(ip),
        Err(_) => false,
    }
}

pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

/// Loopback, this-network, link-local, private, CGNAT, benchmark, `192.0.0.0/24` and
/// everything from `224.0.0.0` up.
pub fn is_blocked_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    a == 0
        || a == 10
        || a == 127
        || (a == 169 && b == 254)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 100 && (64..=127).contains(&b))
        || (a == 198 && (b == 18 || b == 19))
        || (a == 192 && b == 0 && c == 0)
        || a >= 224
}

pub fn is_blocked_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() {
        return true;
    }
    let seg = ip.segments();
    // fe80::/10
    if seg[0] & 0xffc0 == 0xfe80 {
        return true;
    }
    // fc00::/7
    if seg[0] & 0xfe00 == 0xfc00 {
        return true;
    }
    // 2001:db8::/32
    if seg[0] == 0x2001 && seg[1] == 0x0db8 {
        return true;
    }
    embedded_ipv4(ip).map(is_blocked_ipv4).unwrap_or(false)
}

/// IPv4 carried inside an IPv6 literal: mapped `::ffff:a.b.c.d`, compatible `::a.b.c.d`
/// and NAT64 `64:ff9b::a.b.c.d`.
fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }
    let seg = ip.segments();
    let tail = Ipv4Addr::new(
        (seg[6] >> 8) as u8,
        seg[6] as u8,
        (seg[7] >> 8) as u8,
        seg[7] as u8,
    );
    match seg {
        [0, 0, 0, 0, 0, 0, _, _] => Some(tail),
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(tail),
        _ => None,
    }
}
