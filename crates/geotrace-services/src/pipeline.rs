//! Enrichment pipeline — observation in, enriched event out.
//!
//! Both endpoints of an observation are resolved as separate tasks and
//! joined. Only when both come back resolved is an event built and handed
//! to the hub; anything else is dropped silently.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, Semaphore};

use geotrace_core::{now_ms, EnrichedEvent, GeoRecord, Observation};

use crate::hub::BroadcastHub;
use crate::resolver::{GeoResolver, Unresolved};
use crate::stats::PipelineStats;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

#[derive(Clone)]
pub struct EnrichmentPipeline {
    resolver: Arc<GeoResolver>,
    hub: BroadcastHub,
    stats: PipelineStats,
    in_flight: Arc<Semaphore>,
    max_in_flight: u32,
}

impl EnrichmentPipeline {
    pub fn new(resolver: Arc<GeoResolver>, hub: BroadcastHub, max_in_flight: usize) -> Self {
        let stats = resolver.stats().clone();
        let max_in_flight = max_in_flight.clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize)) as u32;
        Self {
            resolver,
            hub,
            stats,
            in_flight: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    /// Enrich one observation and publish it. Returns the published event.
    pub async fn handle(&self, observation: Observation) -> Option<EnrichedEvent> {
        self.stats.observation();

        let (src, dst) = if observation.source == observation.destination {
            // One lookup; a second concurrent one would only hit the cooldown
            let geo = self.spawn_resolve(observation.source).await;
            (geo.clone(), geo)
        } else {
            tokio::join!(
                self.spawn_resolve(observation.source),
                self.spawn_resolve(observation.destination),
            )
        };

        let (Ok(src), Ok(dst)) = (src, dst) else {
            self.stats.dropped();
            return None;
        };

        let event = EnrichedEvent {
            src,
            dst,
            timestamp: now_ms(),
        };
        let delivered = self.hub.publish(event.clone());
        self.stats.published();
        tracing::trace!(
            src = %event.src.address,
            dst = %event.dst.address,
            delivered,
            "event published"
        );
        Some(event)
    }

    /// Resolve on its own task so each endpoint is scheduled independently.
    async fn spawn_resolve(&self, address: String) -> Result<GeoRecord, Unresolved> {
        let resolver = self.resolver.clone();
        match tokio::spawn(async move { resolver.resolve(&address).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "resolve task failed");
                Err(Unresolved::ProviderError)
            }
        }
    }

    /// Consume observations until the channel closes or shutdown fires.
    ///
    /// Each observation runs on its own task; at most `max_in_flight` run at
    /// once and the reader waits for a free slot beyond that. Observations
    /// already taken off the channel are finished before `run` returns.
    pub async fn run(
        self,
        mut observations: mpsc::Receiver<Observation>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("enrichment pipeline shutting down");
                    break;
                }

                next = observations.recv() => {
                    let Some(observation) = next else {
                        tracing::info!("observation source closed, pipeline exiting");
                        break;
                    };
                    let permit = self.in_flight.clone().acquire_owned().await?;
                    let pipeline = self.clone();
                    tokio::spawn(async move {
                        pipeline.handle(observation).await;
                        drop(permit);
                    });
                }
            }
        }

        // Every permit back means every spawned observation has finished
        let _drained = self.in_flight.acquire_many(self.max_in_flight).await?;
        Ok(())
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    pub fn resolver(&self) -> &Arc<GeoResolver> {
        &self.resolver
    }
}
