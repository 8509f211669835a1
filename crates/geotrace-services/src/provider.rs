//! External geolocation lookups.
//!
//! The HTTP provider issues `GET {base_url}/{address}` and expects an
//! ip-api style JSON object:
//!
//! ```json
//! {"status":"success","lat":37.4,"lon":-122.1,"city":"Mountain View","country":"United States"}
//! {"status":"fail","message":"reserved range"}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use geotrace_core::GeoRecord;

/// Sentinel the provider puts in `status` on a successful lookup.
pub const SUCCESS_STATUS: &str = "success";

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("lookup timed out")]
    Timeout,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("empty response body")]
    EmptyBody,
    #[error("response is not a JSON object")]
    NotJson,
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("provider reported failure: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Transport(e)
        }
    }
}

/// Resolves one address to a geolocation record.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, address: &str) -> Result<GeoRecord, LookupError>;
}

#[derive(Deserialize)]
struct ProviderPayload {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
}

/// Turn a provider response body into a record for `address`.
pub fn parse_payload(address: &str, body: &str) -> Result<GeoRecord, LookupError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(LookupError::EmptyBody);
    }
    if !body.starts_with('{') {
        return Err(LookupError::NotJson);
    }

    let payload: ProviderPayload = serde_json::from_str(body)?;
    if payload.status != SUCCESS_STATUS {
        return Err(LookupError::Failed(
            payload.message.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    Ok(GeoRecord {
        address: address.to_string(),
        latitude: payload.lat.ok_or(LookupError::MissingField("lat"))?,
        longitude: payload.lon.ok_or(LookupError::MissingField("lon"))?,
        city: payload.city,
        country: payload.country,
    })
}

/// Provider backed by an HTTP JSON endpoint.
pub struct HttpGeoProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoProvider {
    /// Every request is bounded by `timeout`; expiry is reported as
    /// [`LookupError::Timeout`].
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LookupError::Transport)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, address: &str) -> String {
        format!("{}/{}", self.base_url, address)
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    async fn lookup(&self, address: &str) -> Result<GeoRecord, LookupError> {
        let resp = self.client.get(self.url(address)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_payload(address, &body)
    }
}
