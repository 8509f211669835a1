//! geotraced — live packet geolocation daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};

use geotrace_core::{now_ms, GeotraceConfig, Observation};
use geotrace_services::{
    BroadcastHub, CooldownGate, EnrichmentPipeline, GeoResolver, HttpGeoProvider, PipelineStats,
    ResolutionCache,
};

mod capture;

/// Observations buffered between the capture reader and the pipeline.
const OBSERVATION_QUEUE: usize = 1024;

/// Upper bound on waiting for in-flight observations at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = GeotraceConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = GeotraceConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        GeotraceConfig::default()
    });

    if let Some(interface) = std::env::args().nth(1) {
        config.capture.interface = interface;
    }
    tracing::info!(
        interface = %config.capture.interface,
        source = ?config.capture.source,
        port = config.network.port,
        "geotraced starting"
    );

    // Shared state
    let provider = Arc::new(
        HttpGeoProvider::new(config.provider.base_url.clone(), config.provider.timeout())
            .context("failed to build geo provider client")?,
    );
    let cache = ResolutionCache::new(config.resolver.cache_capacity);
    let cooldown = CooldownGate::new(config.resolver.cooldown());
    let stats = PipelineStats::new();
    let resolver = Arc::new(
        GeoResolver::new(provider, cache.clone(), cooldown.clone()).with_stats(stats.clone()),
    );
    let hub = BroadcastHub::new(config.hub.subscriber_queue);
    let pipeline = EnrichmentPipeline::new(resolver, hub.clone(), config.pipeline.max_in_flight);
    tracing::info!(
        provider = %config.provider.base_url,
        cooldown_ms = config.resolver.cooldown_ms,
        cache_capacity = cache.capacity(),
        "resolver ready"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let (observation_tx, observation_rx) = mpsc::channel::<Observation>(OBSERVATION_QUEUE);

    let capture_task = {
        let capture_config = config.capture.clone();
        tokio::spawn(async move {
            if let Err(e) = capture::capture_loop(capture_config, observation_tx).await {
                tracing::error!(error = %e, "capture failed");
            }
        })
    };

    let mut pipeline_task = tokio::spawn(pipeline.run(observation_rx, shutdown_tx.subscribe()));

    let api_task = {
        let state = geotrace_api::ApiState {
            hub: hub.clone(),
            cache: cache.clone(),
            cooldown: cooldown.clone(),
            stats: stats.clone(),
        };
        let bind_addr = config.network.bind_addr.clone();
        let port = config.network.port;
        tokio::spawn(async move { geotrace_api::serve(state, &bind_addr, port).await })
    };

    let prune_task = {
        let cooldown = cooldown.clone();
        let period = config.resolver.prune_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let pruned = cooldown.prune(now_ms());
                if pruned > 0 {
                    tracing::debug!(pruned, remaining = cooldown.len(), "cooldown pruned");
                }
            }
        })
    };

    let stats_printer = {
        let stats = stats.clone();
        let hub = hub.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                stats.log_snapshot(hub.len());
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    let pipeline_done = tokio::select! {
        _ = shutdown_rx.recv()  => { tracing::info!("shutting down"); false }
        r = &mut pipeline_task  => { tracing::info!("pipeline exited: {:?}", r); true }
        r = api_task            => { tracing::error!("api server exited: {:?}", r); false }
        r = prune_task          => { tracing::error!("cooldown pruner exited: {:?}", r); false }
        r = stats_printer       => { tracing::error!("stats printer exited: {:?}", r); false }
    };

    capture_task.abort();
    if !pipeline_done {
        // The pipeline finishes observations it already took before exiting
        match tokio::time::timeout(SHUTDOWN_GRACE, pipeline_task).await {
            Ok(r) => tracing::info!("pipeline drained: {:?}", r),
            Err(_) => tracing::warn!("pipeline did not drain in time"),
        }
    }
    stats.log_snapshot(hub.len());

    Ok(())
}
