//! /status, /cache, /cache/clear handlers.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use geotrace_services::StatsSnapshot;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub subscribers: usize,
    pub cache_entries: usize,
    pub cooldown_entries: usize,
    pub stats: StatsSnapshot,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        subscribers: state.hub.len(),
        cache_entries: state.cache.len(),
        cooldown_entries: state.cooldown.len(),
        stats: state.stats.snapshot(),
    })
}

// ── /cache ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CacheInfo {
    pub entries: usize,
    pub capacity: usize,
}

pub async fn handle_cache(State(state): State<ApiState>) -> Json<CacheInfo> {
    Json(CacheInfo {
        entries: state.cache.len(),
        capacity: state.cache.capacity(),
    })
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

pub async fn handle_cache_clear(State(state): State<ApiState>) -> Json<ClearResponse> {
    let cleared = state.cache.clear();
    tracing::info!(cleared, "cache cleared via API");
    Json(ClearResponse { cleared })
}
