//! Proxy checker module for checking proxy liveness and latency

use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpRequest};
use crate::progress::{LaneId, ProgressSink};
use crate::proxy::models::{Proxy, ProxyType};
use crate::proxy::parser::parse_ipv4;
use crate::settings::{CheckWebsiteType, Settings};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Body returned by httpbin-style check endpoints
#[derive(Debug, Deserialize)]
struct OriginResponse {
    origin: String,
}

/// Proxy checker for validating proxies through a shared client
#[derive(Clone)]
pub struct ProxyChecker {
    client: Arc<dyn HttpClient>,
    settings: Arc<Settings>,
}

impl ProxyChecker {
    pub fn new(client: Arc<dyn HttpClient>, settings: Arc<Settings>) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Check a single proxy
    ///
    /// On success the measured latency and exit address are stored on
    /// `proxy`. On failure `proxy` is left untouched. The latency covers the
    /// whole exchange including the body read, since the client buffers it.
    pub async fn check_proxy(&self, proxy: &mut Proxy) -> Result<()> {
        let settings = &self.settings;
        let proxy_uri = proxy.proxy_uri();
        let request = HttpRequest::get(&settings.check_website, settings.timeout)
            .via(&proxy_uri)
            .with_headers(settings.check_website_type.headers());

        let (response, elapsed) = {
            let _permit = settings
                .semaphore
                .acquire()
                .await
                .map_err(|_| Error::LimiterClosed)?;
            let start = Instant::now();
            let response = self.client.get(request).await;
            (response, start.elapsed())
        };

        let response = response?.error_for_status()?;
        let exit_ip = Self::exit_ip(settings.check_website_type, &response.body)?;
        proxy.record_check(elapsed.as_secs_f64(), exit_ip);
        Ok(())
    }

    fn exit_ip(kind: CheckWebsiteType, body: &[u8]) -> Result<Option<Ipv4Addr>> {
        match kind {
            CheckWebsiteType::HttpbinIp => {
                let body: OriginResponse = serde_json::from_slice(body)?;
                parse_ipv4(&body.origin).map(Some)
            }
            CheckWebsiteType::PlainIp => parse_ipv4(&String::from_utf8_lossy(body)).map(Some),
            CheckWebsiteType::Unknown => Ok(None),
        }
    }

    /// Check every proxy concurrently and keep the ones that passed
    ///
    /// Concurrency is bounded only by the settings' limiter. Failures are
    /// logged and dropped; each finished check advances its protocol's lane.
    pub async fn check_all(&self, proxies: Vec<Proxy>, progress: &dyn ProgressSink) -> Vec<Proxy> {
        let mut totals: BTreeMap<ProxyType, usize> = BTreeMap::new();
        for proxy in &proxies {
            *totals.entry(proxy.protocol()).or_default() += 1;
        }
        let lanes: BTreeMap<ProxyType, LaneId> = totals
            .iter()
            .map(|(protocol, total)| {
                let label = format!("Checker {}", protocol.name());
                (*protocol, progress.create_lane(*total, &label))
            })
            .collect();

        let total = proxies.len();
        let checks = proxies.into_iter().map(|mut proxy| {
            let lane = lanes[&proxy.protocol()];
            async move {
                let result = self.check_proxy(&mut proxy).await;
                progress.advance(lane, 1);
                match result {
                    Ok(()) => Some(proxy),
                    Err(err) => {
                        debug!("{} | {}: {}", proxy, err.kind(), err);
                        None
                    }
                }
            }
        });

        let working: Vec<Proxy> = join_all(checks).await.into_iter().flatten().collect();
        info!(total, working = working.len(), "checking finished");
        working
    }
}
