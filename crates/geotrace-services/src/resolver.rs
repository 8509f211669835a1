//! Single-address resolution: filter, cache, cooldown, then provider.
//!
//! Every failure is absorbed here and reported as [`Unresolved`]; callers
//! only need to know whether a record came back.

use std::sync::Arc;

use geotrace_core::{now_ms, GeoRecord};

use crate::cache::ResolutionCache;
use crate::cooldown::CooldownGate;
use crate::filter::is_routable;
use crate::provider::GeoProvider;
use crate::stats::PipelineStats;

/// Why an address produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// Private, loopback, multicast, reserved or malformed. Never looked up.
    Bogus,
    /// Looked up too recently. May resolve on a later observation.
    Throttled,
    /// Lookup failed, timed out or returned unusable data. Not cached.
    ProviderError,
}

pub struct GeoResolver {
    provider: Arc<dyn GeoProvider>,
    cache: ResolutionCache,
    cooldown: CooldownGate,
    stats: PipelineStats,
}

impl GeoResolver {
    pub fn new(provider: Arc<dyn GeoProvider>, cache: ResolutionCache, cooldown: CooldownGate) -> Self {
        Self {
            provider,
            cache,
            cooldown,
            stats: PipelineStats::new(),
        }
    }

    /// Record outcomes into an existing set of counters.
    pub fn with_stats(mut self, stats: PipelineStats) -> Self {
        self.stats = stats;
        self
    }

    pub async fn resolve(&self, address: &str) -> Result<GeoRecord, Unresolved> {
        if !is_routable(address) {
            tracing::debug!(ip = address, "geo lookup skipped: private/multicast/bogus");
            self.stats.bogus();
            return Err(Unresolved::Bogus);
        }

        if let Some(record) = self.cache.get(address) {
            self.stats.cache_hit();
            return Ok(record);
        }

        if !self.cooldown.try_acquire(address, now_ms()) {
            tracing::trace!(ip = address, "geo lookup throttled");
            self.stats.throttled();
            return Err(Unresolved::Throttled);
        }

        match self.provider.lookup(address).await {
            Ok(record) => {
                tracing::debug!(ip = address, city = %record.city, country = %record.country, "geo lookup resolved");
                self.cache.put(address, record.clone());
                self.stats.resolved();
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(ip = address, error = %e, "geo lookup failed");
                self.stats.provider_error();
                Err(Unresolved::ProviderError)
            }
        }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }
}
