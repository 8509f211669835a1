//! HTTP and WebSocket handlers: the live event stream plus daemon state as JSON.

pub mod status;
pub mod subscribe;

use geotrace_services::{BroadcastHub, CooldownGate, PipelineStats, ResolutionCache};

#[derive(Clone)]
pub struct ApiState {
    pub hub: BroadcastHub,
    pub cache: ResolutionCache,
    pub cooldown: CooldownGate,
    pub stats: PipelineStats,
}

// Re-export handler functions for use in router setup.
pub use status::{handle_cache, handle_cache_clear, handle_status};
pub use subscribe::handle_subscribe;
