//! geotrace-core — shared configuration and domain types.
//! All other geotrace crates depend on this one.

pub mod config;
pub mod event;

pub use config::GeotraceConfig;
pub use event::{now_ms, EnrichedEvent, GeoRecord, Observation, ServerMessage};
