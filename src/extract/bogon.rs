//! Bogon classification.
//!
//! A bogon is any address that is not globally routable: private, loopback,
//! link-local, shared (CGNAT), documentation, benchmarking, multicast,
//! reserved and broadcast space. Such addresses carry no useful geolocation
//! and are dropped during extraction unless the caller opts in.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

const IPV4_BOGONS: &[&str] = &[
    "0.0.0.0/8",       // "this" network
    "10.0.0.0/8",      // RFC 1918
    "100.64.0.0/10",   // shared address space (CGNAT)
    "127.0.0.0/8",     // loopback
    "169.254.0.0/16",  // link local
    "172.16.0.0/12",   // RFC 1918
    "192.0.0.0/24",    // IETF protocol assignments
    "192.0.2.0/24",    // TEST-NET-1
    "192.88.99.0/24",  // 6to4 relay anycast
    "192.168.0.0/16",  // RFC 1918
    "198.18.0.0/15",   // benchmarking
    "198.51.100.0/24", // TEST-NET-2
    "203.0.113.0/24",  // TEST-NET-3
    "224.0.0.0/4",     // multicast
    "240.0.0.0/4",     // reserved, includes limited broadcast
];

// Only 2000::/3 is allocated for global unicast; these are the holes in it.
const IPV6_GLOBAL_UNICAST: &str = "2000::/3";
const IPV6_BOGONS_IN_GLOBAL: &[&str] = &[
    "2001:10::/28",  // ORCHID
    "2001:db8::/32", // documentation
    "3ffe::/16",     // former 6bone
    "3fff::/20",     // documentation
];

fn ipv4_table() -> &'static [Ipv4Net] {
    static TABLE: OnceLock<Vec<Ipv4Net>> = OnceLock::new();
    TABLE.get_or_init(|| IPV4_BOGONS.iter().filter_map(|s| s.parse().ok()).collect())
}

fn ipv6_tables() -> &'static (Vec<Ipv6Net>, Vec<Ipv6Net>) {
    static TABLES: OnceLock<(Vec<Ipv6Net>, Vec<Ipv6Net>)> = OnceLock::new();
    TABLES.get_or_init(|| {
        let global: Vec<Ipv6Net> = IPV6_GLOBAL_UNICAST.parse().into_iter().collect();
        let holes: Vec<Ipv6Net> = IPV6_BOGONS_IN_GLOBAL
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        (global, holes)
    })
}

/// True when the IPv4 address falls in a non-routable range.
pub fn is_bogon_v4(ip: Ipv4Addr) -> bool {
    ipv4_table().iter().any(|net| net.contains(&ip))
}

/// True when the IPv6 address falls outside routable unicast space.
///
/// IPv4-mapped addresses (`::ffff:a.b.c.d`) are judged by their IPv4 part.
pub fn is_bogon_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_bogon_v4(v4);
    }
    let (global, holes) = ipv6_tables();
    let in_global = global.iter().any(|net| net.contains(&ip));
    !in_global || holes.iter().any(|net| net.contains(&ip))
}

/// True when the address is a bogon.
pub fn is_bogon(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_bogon_v4(v4),
        IpAddr::V6(v6) => is_bogon_v6(v6),
    }
}

/// Classifies a textual address; `None` when it is not a valid IP.
pub fn is_bogon_str(ip: &str) -> Option<bool> {
    ip.trim().parse::<IpAddr>().ok().map(is_bogon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bogon(s: &str) -> bool {
        is_bogon_str(s).unwrap()
    }

    #[test]
    fn test_tables_fully_parsed() {
        assert_eq!(ipv4_table().len(), IPV4_BOGONS.len());
        assert_eq!(ipv6_tables().0.len(), 1);
        assert_eq!(ipv6_tables().1.len(), IPV6_BOGONS_IN_GLOBAL.len());
    }

    #[test]
    fn test_bogon_ipv4() {
        for ip in [
            "10.1.1.1",
            "192.168.1.1",
            "127.0.0.1",
            "172.16.1.1",
            "0.0.0.0",
            "100.64.1.1",
            "169.254.1.1",
            "192.0.0.23",
            "192.0.2.1",
            "198.18.0.22",
            "198.51.100.1",
            "203.0.113.45",
            "224.0.0.1",
            "240.0.2.0",
            "255.255.255.255",
        ] {
            assert!(bogon(ip), "{} should be a bogon", ip);
        }
    }

    #[test]
    fn test_nonbogon_ipv4() {
        for ip in ["1.1.1.1", "8.8.8.8", "192.169.1.1", "172.36.1.1", "198.51.101.1"] {
            assert!(!bogon(ip), "{} should be routable", ip);
        }
    }

    #[test]
    fn test_bogon_ipv6() {
        for ip in [
            "::1",
            "::",
            "fe80::175:a2ad:8508:a655",
            "fec0::517b:deaa:fb23:5013",
            "fe00::517b:deaa:fb23:5013",
            "ff00::517b:deaa:fb23:5013",
            "100::517b:deaa:fb23:5013",
            "fd12:3456:789a::1",
            "2001:db8::1",
            "::ffff:10.0.0.1",
        ] {
            assert!(bogon(ip), "{} should be a bogon", ip);
        }
    }

    #[test]
    fn test_nonbogon_ipv6() {
        for ip in [
            "2607:f8b0:4006:803::200e",
            "2a03:2880:f112:83:face:b00c:0:25de",
            "2001:4860:4860::8844",
            "2001:4860:4860::8888",
            "2001:4860:4860:0:0:0:0:8844",
            "::ffff:8.8.8.8",
        ] {
            assert!(!bogon(ip), "{} should be routable", ip);
        }
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(is_bogon_str("not-an-ip"), None);
        assert_eq!(is_bogon_str("256.1.1.1"), None);
    }
}
