//! # Configuration
//!
//! Settings are layered, later layers win:
//! 1. Built-in defaults
//! 2. `featgauge.toml` (only when `--config` is given)
//! 3. Environment (`FEATGAUGE_RATE_LIMIT`)
//! 4. CLI flags
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 9090
//!
//! [store]
//! backend = "redb"
//! path = "/var/lib/featgauge/reports.redb"
//!
//! [controller]
//! queue_capacity = 1024
//! retry_base_ms = 100
//! retry_max_ms = 30000
//!
//! [metrics]
//! gauge_name = "kubernetes_nmstate_features_applied"
//!
//! [security]
//! rate_limit = 100
//! ```
//!
//! The API key is never read from the file, only from `FEATGAUGE_API_KEY`.

use clap::ValueEnum;
use featgauge_core::GaugeError;
use featgauge_core::primitives::DEFAULT_GAUGE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `security.rate_limit`.
pub const RATE_LIMIT_ENV: &str = "FEATGAUGE_RATE_LIMIT";

// =============================================================================
// SECTIONS
// =============================================================================

/// Report store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Disk-backed redb database.
    #[default]
    Redb,
    /// Volatile in-memory map. Reports are lost on restart.
    Memory,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Redb,
            path: PathBuf::from("featgauge.redb"),
        }
    }
}

/// `[controller]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Capacity of the watch event queue.
    pub queue_capacity: usize,
    /// First retry delay after a failed reconcile.
    pub retry_base_ms: u64,
    /// Upper bound for the retry delay.
    pub retry_max_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            retry_base_ms: 100,
            retry_max_ms: 30_000,
        }
    }
}

/// `[metrics]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub gauge_name: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            gauge_name: DEFAULT_GAUGE_NAME.to_string(),
        }
    }
}

/// `[security]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Requests per second across the whole API. 0 disables limiting.
    pub rate_limit: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { rate_limit: 100 }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub controller: ControllerConfig,
    pub metrics: MetricsConfig,
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration: defaults, then the file at `path` if given,
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, GaugeError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    GaugeError::ConfigError(format!("cannot read '{}': {}", path.display(), e))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, GaugeError> {
        toml::from_str(text).map_err(|e| GaugeError::ConfigError(e.to_string()))
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(limit) = std::env::var(RATE_LIMIT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.security.rate_limit = limit;
        }
    }

    /// Reject settings the controller cannot run with.
    pub fn validate(&self) -> Result<(), GaugeError> {
        if self.controller.queue_capacity == 0 {
            return Err(GaugeError::ConfigError(
                "controller.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.controller.retry_base_ms == 0 {
            return Err(GaugeError::ConfigError(
                "controller.retry_base_ms must be at least 1".to_string(),
            ));
        }
        if self.controller.retry_max_ms < self.controller.retry_base_ms {
            return Err(GaugeError::ConfigError(
                "controller.retry_max_ms must not be below retry_base_ms".to_string(),
            ));
        }
        if self.metrics.gauge_name.is_empty() {
            return Err(GaugeError::ConfigError(
                "metrics.gauge_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` to bind the HTTP server to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "127.0.0.1:9090");
        assert_eq!(config.store.backend, Backend::Redb);
        assert_eq!(config.metrics.gauge_name, DEFAULT_GAUGE_NAME);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 8181

            [store]
            backend = "memory"
            "#,
        )
        .expect("parse");

        assert_eq!(config.server.port, 8181);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.controller, ControllerConfig::default());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result = Config::from_toml_str("[store]\nbackend = \"etcd\"\n");
        assert!(matches!(result, Err(GaugeError::ConfigError(_))));
    }

    #[test]
    fn retry_bounds_are_validated() {
        let mut config = Config::default();
        config.controller.retry_base_ms = 500;
        config.controller.retry_max_ms = 100;
        assert!(config.validate().is_err());

        config.controller.retry_base_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("featgauge.toml");
        std::fs::write(&path, "[metrics]\ngauge_name = \"cluster_features\"\n").expect("write");

        let config = Config::load(Some(&path)).expect("load");

        assert_eq!(config.metrics.gauge_name, "cluster_features");
    }

    #[test]
    fn load_missing_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/featgauge.toml")));
        assert!(matches!(result, Err(GaugeError::ConfigError(_))));
    }
}
