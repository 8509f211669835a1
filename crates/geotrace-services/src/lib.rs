//! geotrace-services — address filtering, resolution, enrichment and fan-out.

pub mod cache;
pub mod cooldown;
pub mod filter;
pub mod hub;
pub mod pipeline;
pub mod provider;
pub mod resolver;
pub mod stats;


pub use cache::ResolutionCache;
pub use cooldown::CooldownGate;
pub use filter::is_routable;
pub use hub::{BroadcastHub, Subscription, SubscriberId};
pub use pipeline::EnrichmentPipeline;
pub use provider::{GeoProvider, HttpGeoProvider, LookupError};
pub use resolver::{GeoResolver, Unresolved};
pub use stats::{PipelineStats, StatsSnapshot};
