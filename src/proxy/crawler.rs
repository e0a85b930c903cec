//! Proxy crawler module for fetching proxy lists from sources
//!
//! This module provides functionality for:
//! - Fetching raw text from URL and file sources
//! - Extracting proxies from that text with [`ProxyParser`]
//! - Scraping every configured source concurrently into a [`ProxyStorage`]

use crate::error::Result;
use crate::http::{HttpClient, HttpRequest};
use crate::progress::{LaneId, ProgressSink};
use crate::proxy::models::ProxyType;
use crate::proxy::parser::ProxyParser;
use crate::storage::ProxyStorage;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The source could not be fetched
    Failed,
    /// The source was fetched but contained no proxies
    Empty,
    /// `found` proxies were parsed, `added` of them were new to the storage
    Found { found: usize, added: usize },
}

/// Totals over one scrape run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub failed: usize,
    pub empty: usize,
    pub succeeded: usize,
    pub found: usize,
    pub added: usize,
}

impl ScrapeSummary {
    fn record(&mut self, outcome: CrawlOutcome) {
        match outcome {
            CrawlOutcome::Failed => self.failed += 1,
            CrawlOutcome::Empty => self.empty += 1,
            CrawlOutcome::Found { found, added } => {
                self.succeeded += 1;
                self.found += found;
                self.added += added;
            }
        }
    }

    pub fn sources(&self) -> usize {
        self.failed + self.empty + self.succeeded
    }
}

/// Whether `source` should be fetched over HTTP rather than read from disk
pub fn is_http_url(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn decode(bytes: Vec<u8>, source: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug!(source, "source is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    }
}

/// Proxy crawler for fetching proxies from configured sources
#[derive(Clone)]
pub struct ProxyCrawler {
    client: Arc<dyn HttpClient>,
}

impl ProxyCrawler {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Fetch the raw text of one source
    ///
    /// URLs are fetched with `timeout` and must answer 2xx; anything else is
    /// read as a local file. Invalid UTF-8 is replaced, not rejected.
    pub async fn fetch_source(&self, source: &str, timeout: Duration) -> Result<String> {
        let bytes = if is_http_url(source) {
            let request = HttpRequest::get(source.trim(), timeout);
            self.client.get(request).await?.error_for_status()?.body
        } else {
            tokio::fs::read(source).await?
        };
        Ok(decode(bytes, source))
    }

    /// Fetch and parse one source into `storage`
    ///
    /// Never fails: fetch errors are logged and reported as
    /// [`CrawlOutcome::Failed`].
    pub async fn scrape_source(
        &self,
        protocol: ProxyType,
        source: &str,
        timeout: Duration,
        storage: &ProxyStorage,
    ) -> CrawlOutcome {
        let text = match self.fetch_source(source, timeout).await {
            Ok(text) => text,
            Err(err) => {
                warn!("{} | {}: {}", source, err.kind(), err);
                return CrawlOutcome::Failed;
            }
        };

        let Some(matches) = ProxyParser::parse(&text, protocol) else {
            warn!("{} | No proxies found", source);
            return CrawlOutcome::Empty;
        };

        let mut found = 0;
        let mut added = 0;
        for proxy in matches {
            found += 1;
            if storage.add(proxy) {
                added += 1;
            }
        }
        debug!(source, found, added, "scraped source");
        CrawlOutcome::Found { found, added }
    }

    /// Scrape every source of every protocol concurrently
    ///
    /// Each source advances its protocol's lane by one when it finishes,
    /// whatever the outcome. A failing source never affects the others.
    pub async fn scrape_all(
        &self,
        sources: &BTreeMap<ProxyType, Vec<String>>,
        timeout: Duration,
        storage: &ProxyStorage,
        progress: &dyn ProgressSink,
    ) -> ScrapeSummary {
        let lanes: BTreeMap<ProxyType, LaneId> = sources
            .iter()
            .map(|(protocol, list)| {
                let label = format!("Scraper {}", protocol.name());
                (*protocol, progress.create_lane(list.len(), &label))
            })
            .collect();

        let units = sources.iter().flat_map(|(protocol, list)| {
            let protocol = *protocol;
            let lane = lanes[&protocol];
            list.iter().map(move |source| async move {
                let outcome = self.scrape_source(protocol, source, timeout, storage).await;
                progress.advance(lane, 1);
                outcome
            })
        });

        let mut summary = ScrapeSummary::default();
        for outcome in join_all(units).await {
            summary.record(outcome);
        }

        info!(
            sources = summary.sources(),
            failed = summary.failed,
            empty = summary.empty,
            found = summary.found,
            unique = storage.len(),
            "scraping finished"
        );
        summary
    }
}
