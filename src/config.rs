//! Engine and collector configuration.
//!
//! The launcher owns these options; the engine only validates them. Invalid
//! values (port 0, sub-1ms sampling interval) are rejected outright rather
//! than silently accepted.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVariable(String),
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Options the launcher passes to the collector feeding this engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Port the collector listens on for the instrumented process.
    pub listen_port: u16,
    /// Stack sampling interval, in milliseconds.
    pub sample_interval_ms: u64,
    /// Whether samples include native-code frames.
    pub include_native: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            listen_port: 3000,
            sample_interval_ms: 10,
            include_native: false,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_port == 0 {
            return Err(ConfigError::InvalidValue(
                "listen_port must be at least 1".to_string(),
            ));
        }
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "sample_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Environment-driven runtime configuration for a host process embedding
/// the engine.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_path: String,
    pub collector: CollectorConfig,
    pub rust_log: String,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = env::var("PROFSTORE_DB").unwrap_or_else(|_| "profile.db".to_string());
        if db_path.is_empty() {
            return Err(ConfigError::InvalidValue(
                "PROFSTORE_DB cannot be empty".to_string(),
            ));
        }

        let listen_port = match env::var("PROFSTORE_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                ConfigError::InvalidValue(format!("PROFSTORE_PORT is not a valid port: {raw}"))
            })?,
            Err(_) => CollectorConfig::default().listen_port,
        };

        let sample_interval_ms = match env::var("PROFSTORE_SAMPLE_INTERVAL_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(format!(
                    "PROFSTORE_SAMPLE_INTERVAL_MS is not a valid interval: {raw}"
                ))
            })?,
            Err(_) => CollectorConfig::default().sample_interval_ms,
        };

        let include_native = env::var("PROFSTORE_INCLUDE_NATIVE")
            .map(|raw| raw.eq_ignore_ascii_case("true") || raw == "1")
            .unwrap_or(false);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let collector = CollectorConfig {
            listen_port,
            sample_interval_ms,
            include_native,
        };
        collector.validate()?;

        Ok(Self {
            db_path,
            collector,
            rust_log,
        })
    }
}
