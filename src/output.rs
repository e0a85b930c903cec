//! Writing checked proxies to text and JSON files

use crate::error::Result;
use crate::proxy::geo::{GeoLocation, GeoLocator};
use crate::proxy::models::{Proxy, ProxyType};
use crate::settings::Settings;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One proxy as written to the JSON files
#[derive(Debug, Serialize)]
struct ProxyRecord<'a> {
    protocol: &'static str,
    username: Option<&'a str>,
    password: Option<&'a str>,
    host: &'a str,
    port: u16,
    exit_ip: Option<String>,
    timeout: Option<f64>,
    geolocation: Option<GeoLocation>,
}

impl<'a> ProxyRecord<'a> {
    fn new(proxy: &'a Proxy, geo: Option<&GeoLocator>) -> Self {
        let geolocation = match (geo, proxy.exit_ip()) {
            (Some(geo), Some(ip)) => geo.lookup(ip).unwrap_or_else(|err| {
                debug!(%ip, "geolocation lookup failed: {}", err);
                None
            }),
            _ => None,
        };

        Self {
            protocol: proxy.protocol().scheme(),
            username: proxy.username(),
            password: proxy.password(),
            host: proxy.host(),
            port: proxy.port(),
            exit_ip: proxy.exit_ip().map(|ip| ip.to_string()),
            timeout: proxy.timeout().map(round2),
            geolocation,
        }
    }
}

/// Round to two decimal places
fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// Where and what to write
#[derive(Debug, Clone)]
pub struct OutputOptions<'a> {
    pub path: &'a Path,
    pub txt: bool,
    pub json: bool,
    /// Protocols that get their own text file, even when empty
    pub protocols: Vec<ProxyType>,
}

impl<'a> OutputOptions<'a> {
    /// Output section of `settings`, with a text file per enabled protocol
    pub fn from_settings(settings: &'a Settings) -> Self {
        Self {
            path: &settings.output.path,
            txt: settings.output.txt,
            json: settings.output.json,
            protocols: settings.sources.keys().copied().collect(),
        }
    }
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> Result<()> {
    let content = lines.collect::<Vec<_>>().join("\n");
    fs::write(path, content)?;
    Ok(())
}

/// Write `proxies` in their current order
///
/// Text output goes to `proxies/all.txt` (with scheme) and
/// `proxies/<scheme>.txt` (without). JSON output goes to `proxies.json`
/// and `proxies_pretty.json`. Returns the paths written.
pub fn write_results(
    proxies: &[Proxy],
    options: &OutputOptions<'_>,
    geo: Option<&GeoLocator>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(options.path)?;
    let mut written = Vec::new();

    if options.txt {
        let dir = options.path.join("proxies");
        fs::create_dir_all(&dir)?;

        let all = dir.join("all.txt");
        write_lines(&all, proxies.iter().map(|p| p.as_str(true)))?;
        written.push(all);

        for protocol in &options.protocols {
            let path = dir.join(format!("{}.txt", protocol.scheme()));
            let lines = proxies
                .iter()
                .filter(|p| p.protocol() == *protocol)
                .map(|p| p.as_str(false));
            write_lines(&path, lines)?;
            written.push(path);
        }
    }

    if options.json {
        let records: Vec<ProxyRecord<'_>> =
            proxies.iter().map(|p| ProxyRecord::new(p, geo)).collect();

        let compact = options.path.join("proxies.json");
        fs::write(&compact, serde_json::to_vec(&records)?)?;
        written.push(compact);

        let pretty = options.path.join("proxies_pretty.json");
        fs::write(&pretty, serde_json::to_vec_pretty(&records)?)?;
        written.push(pretty);
    }

    info!(
        proxies = proxies.len(),
        files = written.len(),
        path = %options.path.display(),
        "results written"
    );
    Ok(written)
}
