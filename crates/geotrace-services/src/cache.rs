//! Address to resolved geolocation, bounded by LRU eviction.
//!
//! Records are immutable once resolved, so a hit is always preferred over a
//! fresh lookup. The cache is capped; when full the least recently used
//! record is evicted and that address is simply resolved again later.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use geotrace_core::GeoRecord;

pub const DEFAULT_CAPACITY: usize = 65_536;

#[derive(Clone)]
pub struct ResolutionCache {
    records: Arc<Mutex<LruCache<String, GeoRecord>>>,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ResolutionCache {
    /// Create a cache holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            records: Arc::new(Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn get(&self, address: &str) -> Option<GeoRecord> {
        self.records.lock().get(address).cloned()
    }

    /// Store a record. Re-storing an address replaces the previous record.
    pub fn put(&self, address: impl Into<String>, record: GeoRecord) {
        let address = address.into();
        if let Some((evicted, _)) = self.records.lock().push(address.clone(), record) {
            if evicted != address {
                tracing::trace!(ip = %evicted, "geo record evicted");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.records.lock().cap().get()
    }

    /// Remove every record. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut records = self.records.lock();
        let cleared = records.len();
        records.clear();
        cleared
    }
}
