//! Sort keys for checked proxies
//!
//! Two different orderings of [`ProxyType`] are in use and both are part of
//! the output format: the protocol sort groups HTTP first, while the natural
//! sort follows declaration order (SOCKS4, SOCKS5, HTTP).

use crate::error::{Error, Result};
use crate::proxy::models::{Proxy, ProxyType};
use serde::{Deserialize, Serialize};

/// Order used by the protocol sort and by `Ord for ProxyType`
const PROTOCOL_ORDER: [ProxyType; 3] = [ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5];

/// Declaration order, used by the natural sort
const DECLARATION_ORDER: [ProxyType; 3] =
    [ProxyType::Socks4, ProxyType::Socks5, ProxyType::Http];

/// Key produced by [`natural_sort_key`]
pub type NaturalKey = (usize, [u32; 4], u16);

/// Output ordering selected in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Fastest first
    #[default]
    Speed,
    /// Grouped by protocol
    Type,
    /// Protocol, then numeric address, then port
    Natural,
}

fn position(table: &[ProxyType; 3], protocol: ProxyType) -> usize {
    table
        .iter()
        .position(|p| *p == protocol)
        .unwrap_or(table.len())
}

pub(crate) fn protocol_position(protocol: ProxyType) -> usize {
    position(&PROTOCOL_ORDER, protocol)
}

pub fn protocol_sort_key(proxy: &Proxy) -> usize {
    protocol_position(proxy.protocol())
}

/// Fails with [`Error::MalformedHost`] unless the host is four dot-separated integers.
pub fn natural_sort_key(proxy: &Proxy) -> Result<NaturalKey> {
    let malformed = || Error::MalformedHost {
        host: proxy.host().to_string(),
    };

    let mut octets = [0u32; 4];
    let mut parts = proxy.host().split('.');
    for octet in octets.iter_mut() {
        *octet = parts
            .next()
            .and_then(|part| part.parse().ok())
            .ok_or_else(malformed)?;
    }
    if parts.next().is_some() {
        return Err(malformed());
    }

    Ok((
        position(&DECLARATION_ORDER, proxy.protocol()),
        octets,
        proxy.port(),
    ))
}

/// Unchecked proxies sort last.
pub fn timeout_sort_key(proxy: &Proxy) -> f64 {
    proxy.timeout().unwrap_or(f64::INFINITY)
}

/// Stable sort of `proxies` by the selected key
///
/// On a malformed host the natural sort fails before touching the slice.
pub fn sort_proxies(proxies: &mut [Proxy], sort_by: SortBy) -> Result<()> {
    match sort_by {
        SortBy::Speed => {
            proxies.sort_by(|a, b| timeout_sort_key(a).total_cmp(&timeout_sort_key(b)));
        }
        SortBy::Type => proxies.sort_by_key(protocol_sort_key),
        SortBy::Natural => {
            let keys = proxies
                .iter()
                .map(natural_sort_key)
                .collect::<Result<Vec<_>>>()?;
            let mut order: Vec<usize> = (0..proxies.len()).collect();
            order.sort_by_key(|&i| keys[i]);
            let sorted: Vec<Proxy> = order.iter().map(|&i| proxies[i].clone()).collect();
            proxies.clone_from_slice(&sorted);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(protocol: ProxyType, host: &str, timeout: f64) -> Proxy {
        let mut proxy = Proxy::new(protocol, host, 8080);
        proxy.record_check(timeout, None);
        proxy
    }

    fn hosts(proxies: &[Proxy]) -> Vec<&str> {
        proxies.iter().map(|p| p.host()).collect()
    }

    #[test]
    fn test_protocol_sort() {
        let mut proxies = vec![
            checked(ProxyType::Socks5, "1.1.1.1", 0.1),
            checked(ProxyType::Http, "2.2.2.2", 0.2),
            checked(ProxyType::Socks4, "3.3.3.3", 0.3),
        ];
        sort_proxies(&mut proxies, SortBy::Type).unwrap();
        let protocols: Vec<_> = proxies.iter().map(|p| p.protocol()).collect();
        assert_eq!(
            protocols,
            vec![ProxyType::Http, ProxyType::Socks4, ProxyType::Socks5]
        );
    }

    #[test]
    fn test_natural_sort_is_numeric() {
        let mut proxies = vec![
            checked(ProxyType::Http, "10.0.0.2", 0.1),
            checked(ProxyType::Http, "10.0.0.10", 0.1),
            checked(ProxyType::Http, "10.0.0.1", 0.1),
        ];
        sort_proxies(&mut proxies, SortBy::Natural).unwrap();
        assert_eq!(hosts(&proxies), vec!["10.0.0.1", "10.0.0.2", "10.0.0.10"]);
    }

    #[test]
    fn test_natural_key_uses_declaration_order() {
        let http = natural_sort_key(&Proxy::new(ProxyType::Http, "1.1.1.1", 80)).unwrap();
        let socks4 = natural_sort_key(&Proxy::new(ProxyType::Socks4, "9.9.9.9", 80)).unwrap();
        let socks5 = natural_sort_key(&Proxy::new(ProxyType::Socks5, "5.5.5.5", 80)).unwrap();
        assert!(socks4 < socks5);
        assert!(socks5 < http);
        assert_eq!(http, (2, [1, 1, 1, 1], 80));
    }

    #[test]
    fn test_natural_key_orders_by_port_last() {
        let a = natural_sort_key(&Proxy::new(ProxyType::Http, "1.1.1.1", 8080)).unwrap();
        let b = natural_sort_key(&Proxy::new(ProxyType::Http, "1.1.1.1", 80)).unwrap();
        assert!(b < a);
    }

    #[test]
    fn test_natural_key_rejects_malformed_host() {
        for host in ["example.com", "1.2.3", "1.2.3.4.5", "1.2.x.4", ""] {
            let err = natural_sort_key(&Proxy::new(ProxyType::Http, host, 80)).unwrap_err();
            assert!(matches!(err, Error::MalformedHost { .. }), "{host}");
        }
    }

    #[test]
    fn test_natural_sort_failure_leaves_slice_untouched() {
        let mut proxies = vec![
            checked(ProxyType::Http, "10.0.0.2", 0.1),
            checked(ProxyType::Http, "localhost", 0.1),
            checked(ProxyType::Http, "10.0.0.1", 0.1),
        ];
        assert!(sort_proxies(&mut proxies, SortBy::Natural).is_err());
        assert_eq!(hosts(&proxies), vec!["10.0.0.2", "localhost", "10.0.0.1"]);
    }

    #[test]
    fn test_timeout_sort_ascending() {
        let mut proxies = vec![
            checked(ProxyType::Http, "1.1.1.1", 0.8),
            checked(ProxyType::Http, "2.2.2.2", 0.1),
            checked(ProxyType::Http, "3.3.3.3", 0.4),
        ];
        sort_proxies(&mut proxies, SortBy::Speed).unwrap();
        let timeouts: Vec<f64> = proxies.iter().map(timeout_sort_key).collect();
        assert_eq!(timeouts, vec![0.1, 0.4, 0.8]);
    }

    #[test]
    fn test_unchecked_sorts_last_by_speed() {
        let mut proxies = vec![
            Proxy::new(ProxyType::Http, "9.9.9.9", 80),
            checked(ProxyType::Http, "1.1.1.1", 2.5),
        ];
        sort_proxies(&mut proxies, SortBy::Speed).unwrap();
        assert_eq!(hosts(&proxies), vec!["1.1.1.1", "9.9.9.9"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut proxies = vec![
            checked(ProxyType::Socks5, "1.1.1.1", 0.3),
            checked(ProxyType::Http, "2.2.2.2", 0.3),
            checked(ProxyType::Socks5, "3.3.3.3", 0.3),
            checked(ProxyType::Http, "4.4.4.4", 0.3),
        ];
        sort_proxies(&mut proxies, SortBy::Type).unwrap();
        assert_eq!(hosts(&proxies), vec!["2.2.2.2", "4.4.4.4", "1.1.1.1", "3.3.3.3"]);
    }
}
