//! Configuration system for geotrace.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $GEOTRACE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/geotrace/config.toml
//!   3. ~/.config/geotrace/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeotraceConfig {
    pub network: NetworkConfig,
    pub provider: ProviderConfig,
    pub resolver: ResolverConfig,
    pub pipeline: PipelineConfig,
    pub hub: HubConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the WebSocket/API listener binds to.
    pub bind_addr: String,
    /// Port for subscribers and the status API.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Lookup URL prefix. The address is appended as the last path segment.
    pub base_url: String,
    /// Per-lookup timeout.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum gap between two external lookups of the same address.
    pub cooldown_ms: u64,
    /// Max resolved records kept in memory. Least recently used is evicted.
    pub cache_capacity: usize,
    /// How often expired cooldown entries are pruned.
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max observations being resolved at once. Extra observations wait.
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Outbound frames buffered per subscriber before it is dropped.
    pub subscriber_queue: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// Spawn tshark and read its field output.
    Tshark,
    /// Read `src<TAB>dst` lines from standard input.
    Stdin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureSource,
    /// Interface passed to tshark with `-i`.
    pub interface: String,
    /// tshark binary name or path.
    pub command: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ip-api.com/json".to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 3_000,
            cache_capacity: 65_536,
            prune_interval_secs: 60,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { max_in_flight: 256 }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_queue: 64,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::Tshark,
            interface: "en0".to_string(),
            command: "tshark".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ResolverConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn prune_interval(&self) -> Duration {
        // 0 would spin the prune loop
        Duration::from_secs(self.prune_interval_secs.max(1))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("geotrace")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl GeotraceConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            GeotraceConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config document. Missing sections and keys take defaults.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("GEOTRACE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&GeotraceConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply GEOTRACE_* overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GEOTRACE_NETWORK__BIND_ADDR") {
            self.network.bind_addr = v;
        }
        if let Some(p) = lookup("GEOTRACE_NETWORK__PORT").and_then(|v| v.parse().ok()) {
            self.network.port = p;
        }
        if let Some(v) = lookup("GEOTRACE_PROVIDER__BASE_URL") {
            self.provider.base_url = v;
        }
        if let Some(t) = lookup("GEOTRACE_PROVIDER__TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.provider.timeout_ms = t;
        }
        if let Some(c) = lookup("GEOTRACE_RESOLVER__COOLDOWN_MS").and_then(|v| v.parse().ok()) {
            self.resolver.cooldown_ms = c;
        }
        if let Some(v) = lookup("GEOTRACE_CAPTURE__SOURCE") {
            match v.as_str() {
                "tshark" => self.capture.source = CaptureSource::Tshark,
                "stdin" => self.capture.source = CaptureSource::Stdin,
                _ => {}
            }
        }
        if let Some(v) = lookup("GEOTRACE_CAPTURE__INTERFACE") {
            self.capture.interface = v;
        }
    }
}
