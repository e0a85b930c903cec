//! Run settings loaded from a TOML file and `PSC_*` environment variables

use crate::error::{Error, Result};
use crate::proxy::models::ProxyType;
use crate::proxy::sort::SortBy;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default URL to test proxies against
const DEFAULT_CHECK_WEBSITE: &str = "https://httpbin.org/ip";

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// Default timeout for fetching one source in seconds
const DEFAULT_SOURCE_TIMEOUT_SECS: f64 = 15.0;

/// Default number of concurrent checks
const DEFAULT_MAX_CONNECTIONS: usize = 512;

/// How the check endpoint reports the egress address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckWebsiteType {
    /// JSON object with an `origin` field, as served by httpbin.org/ip
    #[default]
    HttpbinIp,
    /// Body is the bare IP address
    PlainIp,
    /// Body carries no address; only liveness and latency are measured
    Unknown,
}

impl CheckWebsiteType {
    /// Request headers sent with every check
    pub fn headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            CheckWebsiteType::HttpbinIp => &[("Accept", "application/json")],
            CheckWebsiteType::PlainIp => &[("Accept", "text/plain")],
            CheckWebsiteType::Unknown => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub txt: bool,
    #[serde(default = "default_true")]
    pub json: bool,
    /// MaxMind City database used to annotate exit IPs in JSON output
    #[serde(default)]
    pub mmdb_path: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            txt: true,
            json: true,
            mmdb_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Fallback filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SourceSettings {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    sources: Vec<String>,
}

/// On-disk shape of the settings file
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    #[serde(default = "default_check_website")]
    check_website: String,
    #[serde(default)]
    check_website_type: CheckWebsiteType,
    #[serde(default = "default_timeout")]
    timeout: f64,
    #[serde(default = "default_source_timeout")]
    source_timeout: f64,
    #[serde(default = "default_max_connections")]
    max_connections: usize,
    #[serde(default)]
    sort_by: SortBy,
    #[serde(default)]
    output: OutputSettings,
    #[serde(default)]
    logging: LoggingSettings,
    #[serde(default)]
    http: SourceSettings,
    #[serde(default)]
    socks4: SourceSettings,
    #[serde(default)]
    socks5: SourceSettings,
}

fn default_true() -> bool {
    true
}

fn default_output_path() -> PathBuf {
    PathBuf::from("out")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_check_website() -> String {
    DEFAULT_CHECK_WEBSITE.to_string()
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_source_timeout() -> f64 {
    DEFAULT_SOURCE_TIMEOUT_SECS
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

/// Settings consumed by the scraper, checker and output writer
#[derive(Debug, Clone)]
pub struct Settings {
    pub check_website: String,
    pub check_website_type: CheckWebsiteType,
    /// Timeout of one proxy check
    pub timeout: Duration,
    /// Timeout of one source fetch
    pub source_timeout: Duration,
    pub max_connections: usize,
    /// Sources of every enabled protocol, in configured order
    pub sources: BTreeMap<ProxyType, Vec<String>>,
    pub sort_by: SortBy,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
    /// Caps concurrent check requests at `max_connections`
    pub semaphore: Arc<Semaphore>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_website: DEFAULT_CHECK_WEBSITE.to_string(),
            check_website_type: CheckWebsiteType::default(),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            source_timeout: Duration::from_secs_f64(DEFAULT_SOURCE_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            sources: BTreeMap::new(),
            sort_by: SortBy::default(),
            output: OutputSettings::default(),
            logging: LoggingSettings::default(),
            semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_CONNECTIONS)),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from `path`, with `PSC_*` environment variables on top
    ///
    /// Sections are separated by a double underscore: `PSC_TIMEOUT=5`,
    /// `PSC_OUTPUT__PATH=results`, `PSC_HTTP__ENABLED=false`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PSC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<SettingsFile>()?;
        Self::from_file(file)
    }

    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let file = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<SettingsFile>()?;
        Self::from_file(file)
    }

    fn from_file(file: SettingsFile) -> Result<Self> {
        let timeout = positive_secs("timeout", file.timeout)?;
        let source_timeout = positive_secs("source_timeout", file.source_timeout)?;
        if file.max_connections == 0 {
            return Err(invalid("max_connections must be at least 1"));
        }

        let mut sources = BTreeMap::new();
        for (protocol, section) in [
            (ProxyType::Http, file.http),
            (ProxyType::Socks4, file.socks4),
            (ProxyType::Socks5, file.socks5),
        ] {
            if section.enabled {
                sources.insert(protocol, section.sources);
            }
        }

        Ok(Self {
            check_website: file.check_website,
            check_website_type: file.check_website_type,
            timeout,
            source_timeout,
            sources,
            sort_by: file.sort_by,
            output: file.output,
            logging: file.logging,
            ..Self::default()
        }
        .with_max_connections(file.max_connections))
    }

    pub fn with_check_website(mut self, url: impl Into<String>, kind: CheckWebsiteType) -> Self {
        self.check_website = url.into();
        self.check_website_type = kind;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Also replaces the limiter, so build settings before sharing them
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        let max_connections = max_connections.clamp(1, Semaphore::MAX_PERMITS);
        self.max_connections = max_connections;
        self.semaphore = Arc::new(Semaphore::new(max_connections));
        self
    }

    pub fn with_sources(mut self, protocol: ProxyType, sources: Vec<String>) -> Self {
        self.sources.insert(protocol, sources);
        self
    }

    pub fn total_sources(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }
}

fn invalid(message: &str) -> Error {
    Error::Config(config::ConfigError::Message(message.to_string()))
}

fn positive_secs(name: &str, secs: f64) -> Result<Duration> {
    if !(secs > 0.0) {
        return Err(invalid(&format!("{name} must be a positive number of seconds")));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(&format!("{name} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
check_website = "http://ip.example.com"
check_website_type = "plain_ip"
timeout = 5.5
source_timeout = 20
max_connections = 64
sort_by = "natural"

[output]
path = "results"
json = false

[http]
sources = ["https://example.com/http.txt", "./local.txt"]

[socks4]
enabled = false
sources = ["https://example.com/socks4.txt"]

[socks5]
sources = ["https://example.com/socks5.txt"]
"#;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.check_website, DEFAULT_CHECK_WEBSITE);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(settings.semaphore.available_permits(), DEFAULT_MAX_CONNECTIONS);
        assert!(settings.sources.is_empty());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.check_website, "http://ip.example.com");
        assert_eq!(settings.check_website_type, CheckWebsiteType::PlainIp);
        assert_eq!(settings.timeout, Duration::from_secs_f64(5.5));
        assert_eq!(settings.source_timeout, Duration::from_secs(20));
        assert_eq!(settings.max_connections, 64);
        assert_eq!(settings.semaphore.available_permits(), 64);
        assert_eq!(settings.sort_by, SortBy::Natural);
        assert_eq!(settings.output.path, PathBuf::from("results"));
        assert!(settings.output.txt);
        assert!(!settings.output.json);
    }

    #[test]
    fn test_disabled_protocols_are_dropped() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        let protocols: Vec<_> = settings.sources.keys().copied().collect();
        assert_eq!(protocols, vec![ProxyType::Http, ProxyType::Socks5]);
        assert_eq!(settings.sources[&ProxyType::Http].len(), 2);
        assert_eq!(settings.total_sources(), 3);
    }

    #[test]
    fn test_load_applies_env_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();

        let vars = [
            ("PSC_MAX_CONNECTIONS", "7"),
            ("PSC_OUTPUT__PATH", "env_out"),
            ("PSC_LOGGING__LEVEL", "debug"),
            ("PSC_HTTP__ENABLED", "false"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let loaded = Settings::load(file.path());
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let settings = loaded.unwrap();
        assert_eq!(settings.max_connections, 7);
        assert_eq!(settings.semaphore.available_permits(), 7);
        assert_eq!(settings.output.path, PathBuf::from("env_out"));
        assert!(!settings.output.json);
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.sources.contains_key(&ProxyType::Http));
        assert_eq!(settings.check_website, "http://ip.example.com");
        assert_eq!(settings.sort_by, SortBy::Natural);
    }

    #[test]
    fn test_settings_rejects_invalid_values() {
        assert!(Settings::from_toml("max_connections = 0").is_err());
        assert!(Settings::from_toml("timeout = -1.0").is_err());
        assert!(Settings::from_toml("source_timeout = 0").is_err());
    }

    #[test]
    fn test_settings_builder() {
        let settings = Settings::new()
            .with_check_website("http://example.com", CheckWebsiteType::Unknown)
            .with_timeout(Duration::from_secs(30))
            .with_max_connections(20)
            .with_sources(ProxyType::Socks5, vec!["a.txt".to_string()]);

        assert_eq!(settings.check_website, "http://example.com");
        assert_eq!(settings.check_website_type, CheckWebsiteType::Unknown);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.semaphore.available_permits(), 20);
        assert_eq!(settings.total_sources(), 1);
    }

    #[test]
    fn test_check_website_headers() {
        assert_eq!(
            CheckWebsiteType::HttpbinIp.headers(),
            &[("Accept", "application/json")]
        );
        assert!(CheckWebsiteType::Unknown.headers().is_empty());
    }
}
