//! IP address patterns and candidate scanning.
//!
//! The regular expressions find IP-shaped tokens in arbitrary text. Every
//! match is then boundary-checked (so `1.2.3.4` is not pulled out of
//! `11.2.3.4.5`) and validated by `std::net` parsing, which rejects anything
//! the patterns let through, such as out-of-range IPv6 forms.

use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;

const IPV4_SEG: &str = r"(?:25[0-5]|(?:2[0-4]|1?[0-9])?[0-9])";
const IPV6_SEG: &str = r"(?:[0-9a-fA-F]{1,4})";

fn ipv4_addr() -> String {
    format!(r"(?:(?:{seg}\.){{3}}{seg})", seg = IPV4_SEG)
}

fn ipv6_addr() -> String {
    let s = IPV6_SEG;
    let v4 = ipv4_addr();
    // Alternatives are listed most specific first; regex alternation is
    // leftmost-first, so a shorter form must not shadow a longer one.
    let groups = [
        format!(r"(?:{s}:){{1,4}}:{v4}"),
        format!(r"::(?:ffff(?::0{{1,4}})?:)?{v4}"),
        format!(r"fe80:(?::{s}){{0,4}}%[0-9a-zA-Z]+"),
        format!(r":(?:(?::{s}){{1,7}}|:)"),
        format!(r"{s}:(?::{s}){{1,6}}"),
        format!(r"(?:{s}:){{1,2}}(?::{s}){{1,5}}"),
        format!(r"(?:{s}:){{1,3}}(?::{s}){{1,4}}"),
        format!(r"(?:{s}:){{1,4}}(?::{s}){{1,3}}"),
        format!(r"(?:{s}:){{1,5}}(?::{s}){{1,2}}"),
        format!(r"(?:{s}:){{1,6}}:{s}"),
        format!(r"(?:{s}:){{1,7}}:"),
        format!(r"(?:{s}:){{7}}{s}"),
    ];
    groups
        .iter()
        .map(|g| format!("(?:{})", g))
        .collect::<Vec<_>>()
        .join("|")
}

/// Compiled IPv4 scanner.
pub fn ipv4_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&ipv4_addr()).expect("Invalid IPv4 pattern"))
}

/// Compiled IPv6 scanner.
pub fn ipv6_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&ipv6_addr()).expect("Invalid IPv6 pattern"))
}

/// Drops an IPv6 zone index (`fe80::1%eth0` -> `fe80::1`).
pub fn strip_zone(ip: &str) -> &str {
    ip.split_once('%').map_or(ip, |(addr, _)| addr)
}

fn is_v4_boundary(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let before = start.checked_sub(1).map(|i| bytes[i]);
    let before2 = start.checked_sub(2).map(|i| bytes[i]);
    let after = bytes.get(end).copied();
    let after2 = bytes.get(end + 1).copied();

    let digit = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_digit());
    let dotted_digit = |dot: Option<u8>, next: Option<u8>| dot == Some(b'.') && digit(next);

    !(digit(before) || dotted_digit(before, before2) || digit(after) || dotted_digit(after, after2))
}

fn is_v6_boundary(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let edge = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_alphanumeric() || b == b':');
    let before = start.checked_sub(1).map(|i| bytes[i]);
    let after = bytes.get(end).copied();
    !(edge(before) || edge(after))
}

/// Finds every valid IP address in `text`, in canonical form.
///
/// IPv4 matches come first, then IPv6, each in order of appearance.
/// Duplicates are kept; counting is the caller's job.
pub fn find_ips(text: &str) -> Vec<IpAddr> {
    let mut found = Vec::new();

    for m in ipv4_pattern().find_iter(text) {
        if !is_v4_boundary(text, m.start(), m.end()) {
            continue;
        }
        if let Ok(ip) = m.as_str().parse::<IpAddr>() {
            found.push(ip);
        }
    }

    for m in ipv6_pattern().find_iter(text) {
        if !is_v6_boundary(text, m.start(), m.end()) {
            continue;
        }
        if let Ok(ip) = strip_zone(m.as_str()).parse::<IpAddr>() {
            found.push(ip);
        }
    }

    found
}

/// [`find_ips`] rendered as strings, the form tallies and records use.
pub fn find_candidates(text: &str) -> Vec<String> {
    find_ips(text).iter().map(ToString::to_string).collect()
}

/// Parses a single user-supplied value (command-line argument), accepting
/// an optional zone suffix.
pub fn parse_ip(value: &str) -> Option<IpAddr> {
    strip_zone(value.trim()).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(text: &str) -> Vec<String> {
        find_candidates(text)
    }

    #[test]
    fn test_patterns_compile() {
        assert!(ipv4_pattern().is_match("8.8.8.8"));
        assert!(ipv6_pattern().is_match("2001:4860:4860::8888"));
    }

    #[test]
    fn test_strip_zone() {
        let ip = "2001:4860:4860::8844%16";
        assert_eq!(strip_zone(ip), "2001:4860:4860::8844");
        assert_eq!(strip_zone("1.1.1.1"), "1.1.1.1");
    }

    #[test]
    fn test_ipv4_in_log_line() {
        assert_eq!(
            found(r#"203.0.113.9 - - [10/Oct/2020:13:55:36] "GET / HTTP/1.1" 200 from 8.8.8.8."#),
            vec!["203.0.113.9", "8.8.8.8"]
        );
    }

    #[test]
    fn test_ipv4_rejects_longer_tokens() {
        assert!(found("256.1.1.1").is_empty());
        assert!(found("1.1.1.1234").is_empty());
        assert!(found("version 11.2.3.4.5").is_empty());
    }

    #[test]
    fn test_ipv6_forms() {
        assert_eq!(
            found("a=2001:4860:4860::8844,b=2001:4860:4860:0:0:0:0:8888"),
            vec!["2001:4860:4860::8844", "2001:4860:4860::8888"]
        );
        assert_eq!(
            found("fe80::175:a2ad:8508:a655%16 end"),
            vec!["fe80::175:a2ad:8508:a655"]
        );
        assert_eq!(found("loopback ::1 here"), vec!["::1"]);
    }

    #[test]
    fn test_non_addresses_ignored() {
        assert!(found("std::string and 12:30:45 and aa:bb:cc:dd:ee:ff").is_empty());
    }

    #[test]
    fn test_parse_ip() {
        assert_eq!(parse_ip(" 8.8.8.8 "), Some("8.8.8.8".parse().unwrap()));
        assert_eq!(parse_ip("fe80::1%eth0"), Some("fe80::1".parse().unwrap()));
        assert_eq!(parse_ip("example.com"), None);
    }
}
