//! Proxy parser module for extracting proxies from free-form text

use crate::error::{Error, Result};
use crate::proxy::models::{Proxy, ProxyType};
use once_cell::sync::Lazy;
use regex::{CaptureMatches, Captures, Regex};
use std::iter::Peekable;
use std::net::Ipv4Addr;

/// Matches `[scheme://][user:pass@]host:port` anywhere in a text blob.
///
/// The scheme may carry a trailing `s` (`https`, `socks5s`), which is
/// dropped when resolving the protocol. Octet values are not range-checked.
static PROXY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^0-9a-z])(?:(?P<protocol>(?:http|socks4|socks5)s?)://)?(?:(?P<username>[^\s:@/]+):(?P<password>[^\s:@/]+)@)?(?P<host>[0-9]{1,3}(?:\.[0-9]{1,3}){3}):(?P<port>[0-9]{1,5})\b",
    )
    .expect("Invalid proxy regex")
});

/// Runs of digits and dots in a check response body; each run is an IPv4
/// candidate taken whole, so extra digits or octets make it invalid
static IPV4_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9](?:[0-9.]*[0-9])?").expect("Invalid IPv4 regex"));

/// Proxy parser for extracting proxies from raw source text
pub struct ProxyParser;

impl ProxyParser {
    /// Find every proxy in `text`
    ///
    /// Returns `None` when the text contains no match at all. Matches
    /// without a scheme take `default_protocol`.
    ///
    /// Supports formats:
    /// - IP:PORT
    /// - USER:PASS@IP:PORT
    /// - scheme://IP:PORT
    /// - scheme://USER:PASS@IP:PORT
    pub fn parse(text: &str, default_protocol: ProxyType) -> Option<ProxyMatches<'_>> {
        let mut captures = PROXY_REGEX.captures_iter(text).peekable();
        captures.peek()?;
        Some(ProxyMatches {
            captures,
            default_protocol,
        })
    }

    /// Collect every proxy in `text`; empty when nothing matched
    pub fn parse_all(text: &str, default_protocol: ProxyType) -> Vec<Proxy> {
        Self::parse(text, default_protocol)
            .map(Iterator::collect)
            .unwrap_or_default()
    }
}

/// Lazy sequence of proxies found in one text blob
pub struct ProxyMatches<'t> {
    captures: Peekable<CaptureMatches<'static, 't>>,
    default_protocol: ProxyType,
}

impl ProxyMatches<'_> {
    fn build(caps: &Captures<'_>, default_protocol: ProxyType) -> Option<Proxy> {
        // Ports outside 1-65535 cannot form a proxy.
        let port = caps["port"].parse::<u16>().ok().filter(|p| *p != 0)?;
        let protocol = caps
            .name("protocol")
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(default_protocol);

        Some(Proxy::from_parts(
            protocol,
            &caps["host"],
            port,
            caps.name("username").map(|m| m.as_str().to_string()),
            caps.name("password").map(|m| m.as_str().to_string()),
        ))
    }
}

impl Iterator for ProxyMatches<'_> {
    type Item = Proxy;

    fn next(&mut self) -> Option<Proxy> {
        let default_protocol = self.default_protocol;
        self.captures
            .by_ref()
            .find_map(|caps| Self::build(&caps, default_protocol))
    }
}

/// Extract the first valid IPv4 address from a check response
///
/// A candidate glued to further digits or octets is rejected rather than
/// truncated into a different address.
pub fn parse_ipv4(text: &str) -> Result<Ipv4Addr> {
    IPV4_REGEX
        .find_iter(text)
        .find_map(|m| m.as_str().parse::<Ipv4Addr>().ok())
        .ok_or_else(|| Error::InvalidResponse(format!("no IPv4 address in {:?}", text.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_format() {
        let proxies = ProxyParser::parse_all("192.168.1.1:8080", ProxyType::Http);
        assert_eq!(proxies.len(), 1);
        let proxy = &proxies[0];
        assert_eq!(proxy.host(), "192.168.1.1");
        assert_eq!(proxy.port(), 8080);
        assert_eq!(proxy.protocol(), ProxyType::Http);
        assert!(proxy.username().is_none());
        assert!(proxy.password().is_none());
    }

    #[test]
    fn test_parse_auth_at_format() {
        let proxies = ProxyParser::parse_all("user:pass@192.168.1.1:8080", ProxyType::Socks4);
        assert_eq!(proxies.len(), 1);
        let proxy = &proxies[0];
        assert_eq!(proxy.host(), "192.168.1.1");
        assert_eq!(proxy.username(), Some("user"));
        assert_eq!(proxy.password(), Some("pass"));
        assert_eq!(proxy.protocol(), ProxyType::Socks4);
    }

    #[test]
    fn test_parse_url_format_recovers_all_fields() {
        for protocol in ProxyType::ALL {
            let line = format!("{}://alice:s3cret@10.20.30.40:3128", protocol.scheme());
            let proxies = ProxyParser::parse_all(&line, ProxyType::Http);
            assert_eq!(proxies.len(), 1, "{line}");
            let proxy = &proxies[0];
            assert_eq!(proxy.protocol(), protocol);
            assert_eq!(proxy.host(), "10.20.30.40");
            assert_eq!(proxy.port(), 3128);
            assert_eq!(proxy.username(), Some("alice"));
            assert_eq!(proxy.password(), Some("s3cret"));
        }
    }

    #[test]
    fn test_scheme_overrides_default_protocol() {
        let proxies = ProxyParser::parse_all("socks5://192.168.1.1:1080", ProxyType::Http);
        assert_eq!(proxies[0].protocol(), ProxyType::Socks5);
    }

    #[test]
    fn test_scheme_is_case_insensitive_and_plural_tolerant() {
        let text = "HTTPS://1.1.1.1:443\nSocks5s://2.2.2.2:1080\nSOCKS4://3.3.3.3:1080";
        let protocols: Vec<_> = ProxyParser::parse_all(text, ProxyType::Socks4)
            .iter()
            .map(|p| p.protocol())
            .collect();
        assert_eq!(
            protocols,
            vec![ProxyType::Http, ProxyType::Socks5, ProxyType::Socks4]
        );
    }

    #[test]
    fn test_parse_no_matches() {
        assert!(ProxyParser::parse("", ProxyType::Http).is_none());
        assert!(ProxyParser::parse("# nothing to see here", ProxyType::Http).is_none());
        assert!(ProxyParser::parse("192.168.1.1", ProxyType::Http).is_none());
        assert!(ProxyParser::parse("192.168.1.1:abc", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_all("invalid", ProxyType::Http).is_empty());
    }

    #[test]
    fn test_parse_messy_text() {
        let content = r#"
<html>
<tr><td>192.168.1.1</td><td>8080</td></tr>
Some text with 10.0.0.1:3128 embedded, and socks4://10.0.0.2:1080.
# comment 10.0.0.3:80
</html>
"#;
        let proxies = ProxyParser::parse_all(content, ProxyType::Http);
        let found: Vec<String> = proxies.iter().map(|p| p.as_str(true)).collect();
        assert_eq!(
            found,
            vec![
                "http://10.0.0.1:3128",
                "socks4://10.0.0.2:1080",
                "http://10.0.0.3:80",
            ]
        );
    }

    #[test]
    fn test_parse_colon_separated_credentials_keeps_host_port() {
        let proxies = ProxyParser::parse_all("192.168.1.2:8080:user:pass", ProxyType::Http);
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].as_str(false), "192.168.1.2:8080");
    }

    #[test]
    fn test_parse_accepts_unchecked_octets() {
        let proxies = ProxyParser::parse_all("999.999.999.999:8080", ProxyType::Http);
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].host(), "999.999.999.999");
    }

    #[test]
    fn test_parse_skips_out_of_range_ports() {
        let text = "1.1.1.1:0\n2.2.2.2:70000\n3.3.3.3:65535";
        let proxies = ProxyParser::parse_all(text, ProxyType::Http);
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].port(), 65535);
    }

    #[test]
    fn test_parse_is_lazy() {
        let text = "1.1.1.1:80 2.2.2.2:80 3.3.3.3:80";
        let mut matches = ProxyParser::parse(text, ProxyType::Http).unwrap();
        assert_eq!(matches.next().unwrap().host(), "1.1.1.1");
        assert_eq!(matches.next().unwrap().host(), "2.2.2.2");
        assert_eq!(matches.next().unwrap().host(), "3.3.3.3");
        assert!(matches.next().is_none());
    }

    #[test]
    fn test_parse_ipv4() {
        assert_eq!(parse_ipv4("1.2.3.4\n").unwrap(), Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(
            parse_ipv4("5.6.7.8, 1.2.3.4").unwrap(),
            Ipv4Addr::new(5, 6, 7, 8)
        );
        assert!(parse_ipv4("not an ip").is_err());
        assert!(parse_ipv4("300.1.1.1").is_err());
    }

    #[test]
    fn test_parse_ipv4_rejects_glued_digits() {
        assert!(parse_ipv4("10.0.0.1234").is_err());
        assert!(parse_ipv4("1234.5.6.7").is_err());
        assert!(parse_ipv4("1.2.3.4.5").is_err());
        assert!(parse_ipv4("origin: 10.0.0.1234\n").is_err());
    }

    #[test]
    fn test_parse_ipv4_skips_to_first_valid_candidate() {
        assert_eq!(
            parse_ipv4("HTTP/1.1 ok 10.0.0.1234 then 9.8.7.6.").unwrap(),
            Ipv4Addr::new(9, 8, 7, 6)
        );
    }
}
