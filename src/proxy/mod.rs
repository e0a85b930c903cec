//! Proxy discovery and validation
//!
//! This module provides functionality for:
//! - Parsing proxies out of free-form text
//! - Scraping proxy lists from URLs and local files
//! - Checking proxies through a shared client under a connection cap
//! - Sorting checked proxies and geolocating their exit addresses

pub mod checker;
pub mod crawler;
pub mod geo;
pub mod models;
pub mod parser;
pub mod sort;

pub use checker::ProxyChecker;
pub use crawler::{CrawlOutcome, ProxyCrawler, ScrapeSummary};
pub use geo::{GeoLocation, GeoLocator};
pub use models::{Proxy, ProxyType, UnknownProxyType};
pub use parser::{parse_ipv4, ProxyMatches, ProxyParser};
pub use sort::{natural_sort_key, protocol_sort_key, sort_proxies, timeout_sort_key, NaturalKey, SortBy};
