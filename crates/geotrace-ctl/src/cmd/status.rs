//! Daemon status and cache commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    subscribers: usize,
    cache_entries: usize,
    cooldown_entries: usize,
    stats: Stats,
}

#[derive(Deserialize)]
struct Stats {
    observations: u64,
    events_published: u64,
    dropped: u64,
    bogus: u64,
    throttled: u64,
    provider_errors: u64,
    cache_hits: u64,
    lookups_resolved: u64,
}

#[derive(Deserialize)]
struct CacheInfo {
    entries: usize,
    capacity: usize,
}

#[derive(Deserialize)]
struct ClearResponse {
    cleared: usize,
}

// ── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;
    let s = &resp.stats;

    println!("═══════════════════════════════════════");
    println!("  Geotrace Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Subscribers      : {}", resp.subscribers);
    println!("  Cached records   : {}", resp.cache_entries);
    println!("  Cooldown entries : {}", resp.cooldown_entries);
    println!();
    println!("  Observations     : {}", s.observations);
    println!("  Events published : {}", s.events_published);
    println!("  Dropped          : {}", s.dropped);
    println!("  ┌─ bogus           {}", s.bogus);
    println!("  │  throttled       {}", s.throttled);
    println!("  └─ provider errors {}", s.provider_errors);
    println!("  Cache hits       : {}", s.cache_hits);
    println!("  Lookups resolved : {}", s.lookups_resolved);

    Ok(())
}

pub async fn cmd_cache(port: u16) -> Result<()> {
    let resp: CacheInfo = get_json(&format!("{}/cache", base_url(port))).await?;
    println!("Cached records : {} / {}", resp.entries, resp.capacity);
    Ok(())
}

pub async fn cmd_cache_clear(port: u16) -> Result<()> {
    let resp: ClearResponse = post_json(&format!("{}/cache/clear", base_url(port))).await?;
    println!("✓ Cleared {} cached records", resp.cleared);
    Ok(())
}
