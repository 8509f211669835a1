//! Pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Default)]
struct Counters {
    observations: AtomicU64,
    events_published: AtomicU64,
    dropped: AtomicU64,
    bogus: AtomicU64,
    throttled: AtomicU64,
    provider_errors: AtomicU64,
    cache_hits: AtomicU64,
    lookups_resolved: AtomicU64,
}

/// Shared, lock-free counters. Cloning shares the same counters.
#[derive(Clone, Default)]
pub struct PipelineStats {
    inner: Arc<Counters>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub observations: u64,
    pub events_published: u64,
    pub dropped: u64,
    pub bogus: u64,
    pub throttled: u64,
    pub provider_errors: u64,
    pub cache_hits: u64,
    pub lookups_resolved: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn observation(&self) {
        self.inner.observations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn published(&self) {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn bogus(&self) {
        self.inner.bogus.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn throttled(&self) {
        self.inner.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn provider_error(&self) {
        self.inner.provider_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn resolved(&self) {
        self.inner.lookups_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = &self.inner;
        StatsSnapshot {
            observations: c.observations.load(Ordering::Relaxed),
            events_published: c.events_published.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            bogus: c.bogus.load(Ordering::Relaxed),
            throttled: c.throttled.load(Ordering::Relaxed),
            provider_errors: c.provider_errors.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
            lookups_resolved: c.lookups_resolved.load(Ordering::Relaxed),
        }
    }

    /// Log a one-line summary if anything has happened yet. Returns whether
    /// a line was written.
    pub fn log_snapshot(&self, subscribers: usize) -> bool {
        let s = self.snapshot();
        if s.observations == 0 {
            return false;
        }
        tracing::info!(
            subscribers,
            observations = s.observations,
            published = s.events_published,
            dropped = s.dropped,
            bogus = s.bogus,
            throttled = s.throttled,
            provider_errors = s.provider_errors,
            cache_hits = s.cache_hits,
            resolved = s.lookups_resolved,
            "pipeline stats"
        );
        true
    }
}
