//! Proxy Scraper Checker
//!
//! Scrapes proxy lists from many sources, checks every proxy concurrently
//! under a connection cap, and writes the working ones sorted by speed,
//! protocol or address.

pub mod error;
pub mod http;
pub mod logging;
pub mod output;
pub mod progress;
pub mod proxy;
pub mod settings;
pub mod storage;
pub mod tui;

pub use error::{Error, Result};
pub use proxy::*;
pub use settings::{CheckWebsiteType, Settings};
pub use storage::ProxyStorage;
