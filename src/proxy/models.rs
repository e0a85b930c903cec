//! Proxy data models

use crate::proxy::sort;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Proxy type enumeration
///
/// Declaration order is SOCKS4, SOCKS5, HTTP; the natural sort relies on it.
/// `Ord` follows the protocol table instead (HTTP < SOCKS4 < SOCKS5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Socks4,
    Socks5,
    Http,
}

impl ProxyType {
    /// Every variant, in declaration order
    pub const ALL: [ProxyType; 3] = [ProxyType::Socks4, ProxyType::Socks5, ProxyType::Http];

    /// Scheme used in proxy URIs
    pub fn scheme(self) -> &'static str {
        match self {
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
            ProxyType::Http => "http",
        }
    }

    /// Upper-case name used in logs, progress lanes and JSON output
    pub fn name(self) -> &'static str {
        match self {
            ProxyType::Socks4 => "SOCKS4",
            ProxyType::Socks5 => "SOCKS5",
            ProxyType::Http => "HTTP",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl PartialOrd for ProxyType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProxyType {
    fn cmp(&self, other: &Self) -> Ordering {
        sort::protocol_position(*self).cmp(&sort::protocol_position(*other))
    }
}

/// Error returned when a protocol token is not one of the known schemes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProxyType(pub String);

impl fmt::Display for UnknownProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown proxy type: {}", self.0)
    }
}

impl std::error::Error for UnknownProxyType {}

impl FromStr for ProxyType {
    type Err = UnknownProxyType;

    /// Case-insensitive; trailing `s` is dropped so `https` and `socks5s` resolve.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim_end_matches(['s', 'S']);
        match token.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "socks4" => Ok(ProxyType::Socks4),
            "socks5" => Ok(ProxyType::Socks5),
            _ => Err(UnknownProxyType(s.to_string())),
        }
    }
}

/// A discovered proxy and the results of its last successful check
///
/// Equality and hashing use only the identity fields (protocol, host, port,
/// credentials); probe results never take part.
#[derive(Debug, Clone)]
pub struct Proxy {
    protocol: ProxyType,
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<f64>,
    exit_ip: Option<Ipv4Addr>,
}

impl Proxy {
    /// Create a new proxy without authentication
    pub fn new(protocol: ProxyType, host: impl Into<String>, port: u16) -> Self {
        Self::from_parts(protocol, host, port, None, None)
    }

    /// Create a new proxy with authentication
    pub fn with_auth(
        protocol: ProxyType,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::from_parts(
            protocol,
            host,
            port,
            Some(username.into()),
            Some(password.into()),
        )
    }

    pub fn from_parts(
        protocol: ProxyType,
        host: impl Into<String>,
        port: u16,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
            username,
            password,
            timeout: None,
            exit_ip: None,
        }
    }

    pub fn protocol(&self) -> ProxyType {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Elapsed seconds of the last successful check
    pub fn timeout(&self) -> Option<f64> {
        self.timeout
    }

    /// Egress address reported by the check endpoint
    pub fn exit_ip(&self) -> Option<Ipv4Addr> {
        self.exit_ip
    }

    pub fn is_checked(&self) -> bool {
        self.timeout.is_some()
    }

    pub(crate) fn record_check(&mut self, elapsed: f64, exit_ip: Option<Ipv4Addr>) {
        self.timeout = Some(elapsed);
        self.exit_ip = exit_ip;
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }

    /// URI the check request is routed through
    pub fn proxy_uri(&self) -> String {
        match self.credentials() {
            Some((user, pass)) => format!(
                "{}://{}:{}@{}:{}",
                self.protocol.scheme(),
                user,
                pass,
                self.host,
                self.port
            ),
            None => format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port),
        }
    }

    /// Display form, optionally prefixed with the scheme
    ///
    /// Credentials are written only when both username and password are set.
    pub fn as_str(&self, include_protocol: bool) -> String {
        let mut out = String::new();
        if include_protocol {
            out.push_str(&self.protocol.name().to_ascii_lowercase());
            out.push_str("://");
        }
        if let Some((user, pass)) = self.credentials() {
            out.push_str(user);
            out.push(':');
            out.push_str(pass);
            out.push('@');
        }
        out.push_str(&self.host);
        out.push(':');
        out.push_str(&self.port.to_string());
        out
    }

    fn identity(&self) -> (ProxyType, &str, u16, Option<&str>, Option<&str>) {
        (
            self.protocol,
            &self.host,
            self.port,
            self.username.as_deref(),
            self.password.as_deref(),
        )
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Proxy {}

impl Hash for Proxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str(true))
    }
}
