//! Domain types that flow through the pipeline and the subscriber wire format.
//!
//! Wire frame sent to every subscriber, one per enriched event:
//!
//! ```json
//! {"type":"packet",
//!  "src":{"ip":"8.8.8.8","lat":37.4,"lon":-122.1,"city":"Mountain View","country":"United States"},
//!  "dst":{"ip":"1.1.1.1","lat":-33.9,"lon":151.2,"city":"Sydney","country":"Australia"},
//!  "timestamp":1718000000000}
//! ```

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Geolocation of one address. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    pub city: String,
    pub country: String,
}

/// One address pair seen by the capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub source: String,
    pub destination: String,
    pub observed_at: u64,
}

impl Observation {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            observed_at: now_ms(),
        }
    }

    /// Parse a `src<TAB>dst` capture line.
    ///
    /// Returns None when either field is missing or blank. Field contents are
    /// not validated here; bogus addresses are rejected by the resolver.
    pub fn from_capture_line(line: &str) -> Option<Self> {
        let mut fields = line.trim().split('\t');
        let source = fields.next()?.trim();
        let destination = fields.next()?.trim();
        if source.is_empty() || destination.is_empty() {
            return None;
        }
        Some(Self::new(source, destination))
    }
}

/// An observation with both endpoints resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    pub src: GeoRecord,
    pub dst: GeoRecord,
    /// Epoch milliseconds at which the event was built.
    pub timestamp: u64,
}

/// Frames sent from the daemon to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Packet(EnrichedEvent),
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
