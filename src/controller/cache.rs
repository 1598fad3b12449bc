//! Request-scoped cache of fetched controller state.
//!
//! One cache lives for one run and is handed to the reader and executor by
//! `&mut`. Entries expire after a TTL and a fabric's entries are dropped on
//! every mutating call against it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::trace;

use crate::model::Vrf;

use super::types::SwitchInventory;

/// Default entry lifetime in seconds.
pub const DEFAULT_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    stored_at: DateTime<Utc>,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that went to the controller.
    pub misses: u64,
}

/// Cache of VRF lists and switch inventories, keyed by fabric.
#[derive(Debug, Clone)]
pub struct StateCache {
    ttl: Duration,
    vrfs: HashMap<String, CacheEntry<Vec<Vrf>>>,
    inventories: HashMap<String, CacheEntry<SwitchInventory>>,
    stats: CacheStats,
}

impl StateCache {
    /// Creates an empty cache whose entries live `ttl_secs` seconds.
    ///
    /// Negative values mean no caching; values past the representable
    /// range are clamped to the longest lifetime.
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::try_seconds(ttl_secs.max(0)).unwrap_or(Duration::MAX),
            vrfs: HashMap::new(),
            inventories: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Returns the fabric's VRF list if cached and fresh.
    pub fn vrfs(&mut self, fabric: &str) -> Option<Vec<Vrf>> {
        let hit = fresh(&self.vrfs, fabric, self.ttl).cloned();
        self.record(fabric, "vrfs", hit.is_some());
        hit
    }

    /// Stores the fabric's VRF list.
    pub fn store_vrfs(&mut self, fabric: &str, vrfs: Vec<Vrf>) {
        self.vrfs.insert(
            fabric.to_string(),
            CacheEntry {
                data: vrfs,
                stored_at: Utc::now(),
            },
        );
    }

    /// Returns the fabric's switch inventory if cached and fresh.
    pub fn inventory(&mut self, fabric: &str) -> Option<SwitchInventory> {
        let hit = fresh(&self.inventories, fabric, self.ttl).cloned();
        self.record(fabric, "inventory", hit.is_some());
        hit
    }

    /// Stores the fabric's switch inventory.
    pub fn store_inventory(&mut self, fabric: &str, inventory: SwitchInventory) {
        self.inventories.insert(
            fabric.to_string(),
            CacheEntry {
                data: inventory,
                stored_at: Utc::now(),
            },
        );
    }

    /// Drops everything cached for a fabric.
    pub fn invalidate(&mut self, fabric: &str) {
        trace!("Invalidating cached state of fabric {fabric}");
        self.vrfs.remove(fabric);
        self.inventories.remove(fabric);
    }

    /// Returns the hit and miss counters.
    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    fn record(&mut self, fabric: &str, what: &str, hit: bool) {
        if hit {
            trace!("Cache hit: {what} of {fabric}");
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

fn fresh<'a, T>(map: &'a HashMap<String, CacheEntry<T>>, fabric: &str, ttl: Duration) -> Option<&'a T> {
    map.get(fabric)
        .filter(|entry| Utc::now() - entry.stored_at < ttl)
        .map(|entry| &entry.data)
}
