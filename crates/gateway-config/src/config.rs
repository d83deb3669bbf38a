//! Configuration management for the gateway.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default whole-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default sleep between dispatch cycles in milliseconds.
pub const DEFAULT_DISPATCH_IDLE_MS: u64 = 100;

/// Default sleep before retrying after a transient failure, in milliseconds.
pub const DEFAULT_ERROR_BACKOFF_MS: u64 = 5_000;

/// Configuration error type.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file missing or unreadable.
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// The path that was attempted.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON or is missing required fields.
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A URL field failed validation.
    #[error("invalid {field}: {message}")]
    InvalidUrl {
        /// Name of the offending config field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Main gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Sensor identity and sampling parameters.
    pub sensor: SensorConfig,
    /// OAuth token service.
    pub uaa: UaaConfig,
    /// Time-series ingestion service.
    pub timeseries: TimeseriesConfig,
    /// Asset service.
    pub asset: AssetConfig,
    /// Whole-request timeout for every network call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Sleep between dispatch cycles, in milliseconds.
    #[serde(default = "default_dispatch_idle_ms")]
    pub dispatch_idle_ms: u64,
    /// Sleep before retrying after a transient failure, in milliseconds.
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

/// Sensor identity and sampling parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// OAuth client id, also used as the sensor tag on emitted records.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Sampling behavior.
    #[serde(default)]
    pub sampler: SamplerConfig,
}

/// OAuth token service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct UaaConfig {
    /// Base URL of the token service; `/oauth/token` is appended.
    pub url: String,
}

/// Time-series ingestion service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeseriesConfig {
    /// WebSocket URL of the ingest endpoint (ws:// or wss://).
    pub ingest_url: String,
    /// Tenant/zone identifier sent as a connection header.
    pub zone_id: String,
}

/// Asset service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    /// Base URL of the asset service; the collection name is appended.
    pub base_url: String,
    /// Tenant/zone identifier sent on every request.
    pub zone_id: String,
    /// Collection the records are posted to.
    pub collection: String,
}

/// Sampling parameters for the simulated sensor.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerConfig {
    /// Probability of a tick producing a time-series-only sample.
    pub p: f64,
    /// Probability of a tick additionally producing an asset event.
    pub m: f64,
    /// Milliseconds between ticks.
    pub interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            p: 0.05,
            m: 0.01,
            interval_ms: 1_000,
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_dispatch_idle_ms() -> u64 {
    DEFAULT_DISPATCH_IDLE_MS
}

fn default_error_backoff_ms() -> u64 {
    DEFAULT_ERROR_BACKOFF_MS
}

impl Config {
    /// Load configuration from a JSON file, apply env overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Override configuration from environment variables.
    ///
    /// `GATEWAY_LOG_LEVEL` overrides the log level and
    /// `GATEWAY_CLIENT_SECRET` the client secret, so the secret can be kept
    /// out of the config file.
    fn load_from_env(&mut self) {
        if let Ok(level) = std::env::var("GATEWAY_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(secret) = std::env::var("GATEWAY_CLIENT_SECRET") {
            self.sensor.client_secret = secret;
        }
    }

    /// Validate URL fields.
    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.uaa.url).map_err(|e| ConfigError::InvalidUrl {
            field: "uaa.url",
            message: e.to_string(),
        })?;
        Url::parse(&self.asset.base_url).map_err(|e| ConfigError::InvalidUrl {
            field: "asset.base_url",
            message: e.to_string(),
        })?;
        let ingest = Url::parse(&self.timeseries.ingest_url).map_err(|e| ConfigError::InvalidUrl {
            field: "timeseries.ingest_url",
            message: e.to_string(),
        })?;
        if ingest.scheme() != "ws" && ingest.scheme() != "wss" {
            return Err(ConfigError::InvalidUrl {
                field: "timeseries.ingest_url",
                message: format!("expected a ws:// or wss:// URL, got {}", ingest.scheme()),
            });
        }
        Ok(())
    }

    /// Whole-request timeout for every network call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Sleep between dispatch cycles.
    pub fn dispatch_idle(&self) -> Duration {
        Duration::from_millis(self.dispatch_idle_ms)
    }

    /// Sleep before retrying after a transient failure.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r#"{
            "sensor": {
                "client_id": "sensor-1",
                "client_secret": "s3cret"
            },
            "uaa": { "url": "https://uaa.example.com" },
            "timeseries": {
                "ingest_url": "wss://ingest.example.com/v1/stream",
                "zone_id": "zone-ts"
            },
            "asset": {
                "base_url": "https://asset.example.com/v1/",
                "zone_id": "zone-asset",
                "collection": "sensor_events"
            }
        }"#
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: Config = serde_json::from_str(minimal_json()).unwrap();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.dispatch_idle_ms, DEFAULT_DISPATCH_IDLE_MS);
        assert_eq!(config.error_backoff_ms, DEFAULT_ERROR_BACKOFF_MS);
        assert_eq!(config.sensor.sampler.interval_ms, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let json = r#"{
            "log_level": "debug",
            "sensor": {
                "client_id": "sensor-1",
                "client_secret": "s3cret",
                "sampler": { "p": 0.2, "m": 0.1, "interval_ms": 250 }
            },
            "uaa": { "url": "https://uaa.example.com" },
            "timeseries": {
                "ingest_url": "wss://ingest.example.com/v1/stream",
                "zone_id": "zone-ts"
            },
            "asset": {
                "base_url": "https://asset.example.com/v1/",
                "zone_id": "zone-asset",
                "collection": "sensor_events"
            },
            "request_timeout_ms": 2000,
            "dispatch_idle_ms": 50,
            "error_backoff_ms": 1000
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout(), Duration::from_millis(2000));
        assert_eq!(config.dispatch_idle(), Duration::from_millis(50));
        assert_eq!(config.error_backoff(), Duration::from_millis(1000));
        assert_eq!(config.sensor.sampler.p, 0.2);
    }

    #[test]
    fn rejects_non_websocket_ingest_url() {
        let mut config: Config = serde_json::from_str(minimal_json()).unwrap();
        config.timeseries.ingest_url = "https://ingest.example.com".to_string();
        match config.validate() {
            Err(ConfigError::InvalidUrl { field, .. }) => {
                assert_eq!(field, "timeseries.ingest_url");
            }
            other => panic!("expected InvalidUrl, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_uaa_url() {
        let mut config: Config = serde_json::from_str(minimal_json()).unwrap();
        config.uaa.url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { field: "uaa.url", .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Config::load(Path::new("/nonexistent/gateway.json")).unwrap_err();
        match err {
            ConfigError::Read { path, .. } => assert!(path.contains("gateway.json")),
            other => panic!("expected Read, got {other:?}"),
        }
    }
}
