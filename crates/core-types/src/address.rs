//! Origin address patterns: exact IPs, CIDR ranges and wildcard host names.

use std::fmt;
use std::net::IpAddr;

use crate::matcher::MatcherWithWildcards;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostPattern {
    Exact(IpAddr),
    Cidr { network: IpAddr, prefix: u8 },
    Wildcard(MatcherWithWildcards),
}

impl HostPattern {
    /// Parses one configured entry; `None` when it is neither an address, a
    /// range nor a usable pattern.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some((net, prefix)) = raw.split_once('/') {
            let network: IpAddr = net.parse().ok()?;
            let prefix: u8 = prefix.parse().ok()?;
            let max = if network.is_ipv4() { 32 } else { 128 };
            if prefix > max {
                return None;
            }
            return Some(HostPattern::Cidr { network, prefix });
        }
        if let Ok(ip) = raw.parse::<IpAddr>() {
            return Some(HostPattern::Exact(ip));
        }
        if raw.chars().any(|c| c.is_whitespace()) {
            return None;
        }
        Some(HostPattern::Wildcard(MatcherWithWildcards::new([raw])))
    }

    pub fn matches(&self, address: &str) -> bool {
        match self {
            HostPattern::Exact(ip) => address.parse::<IpAddr>().map_or(false, |a| a == *ip),
            HostPattern::Cidr { network, prefix } => address
                .parse::<IpAddr>()
                .map_or(false, |a| in_network(&a, network, *prefix)),
            HostPattern::Wildcard(matcher) => matcher.matches(address),
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPattern::Exact(ip) => write!(f, "{ip}"),
            HostPattern::Cidr { network, prefix } => write!(f, "{network}/{prefix}"),
            HostPattern::Wildcard(matcher) => {
                f.write_str(&matcher.patterns().collect::<Vec<_>>().join(","))
            }
        }
    }
}

fn in_network(addr: &IpAddr, network: &IpAddr, prefix: u8) -> bool {
    match (addr, network) {
        (IpAddr::V4(a), IpAddr::V4(n)) => {
            let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
            u32::from(*a) & mask == u32::from(*n) & mask
        }
        (IpAddr::V6(a), IpAddr::V6(n)) => {
            let mask = if prefix == 0 { 0 } else { u128::MAX << (128 - prefix) };
            u128::from(*a) & mask == u128::from(*n) & mask
        }
        _ => false,
    }
}
