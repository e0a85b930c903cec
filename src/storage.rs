//! In-memory collector for discovered proxies

use crate::proxy::models::{Proxy, ProxyType};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Deduplicating proxy store shared by all scrape tasks
///
/// Keyed by the proxy identity (protocol, host, port, credentials). Inserting
/// an equal proxy again is a no-op.
#[derive(Debug, Default)]
pub struct ProxyStorage {
    proxies: Mutex<HashSet<Proxy>>,
}

impl ProxyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `proxy`, returning `false` if an equal proxy was already stored
    pub fn add(&self, proxy: Proxy) -> bool {
        self.lock().insert(proxy)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, proxy: &Proxy) -> bool {
        self.lock().contains(proxy)
    }

    /// Copy of every stored proxy, in no particular order
    pub fn snapshot(&self) -> Vec<Proxy> {
        self.lock().iter().cloned().collect()
    }

    /// Stored proxies grouped by protocol
    pub fn grouped(&self) -> BTreeMap<ProxyType, Vec<Proxy>> {
        let mut groups: BTreeMap<ProxyType, Vec<Proxy>> = BTreeMap::new();
        for proxy in self.lock().iter() {
            groups.entry(proxy.protocol()).or_default().push(proxy.clone());
        }
        groups
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Proxy>> {
        // The set is never left half-updated, so a poisoned lock is still usable.
        self.proxies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
