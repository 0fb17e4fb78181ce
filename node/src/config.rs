//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ripple_network::RetryPolicy;
use ripple_protocol::DEFAULT_PORT;
use ripple_types::ServerAddress;

use crate::NodeError;

/// Configuration for a ripple node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This server's own address, as peers name it in datagrams.
    #[serde(default = "default_server_address")]
    pub server_address: String,

    /// Interface to bind the UDP socket to.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// UDP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Data directory for ledger storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Delay before the first retransmission.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the retransmission delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Transmission attempts for peer traffic.
    #[serde(default = "default_low_importance_retries")]
    pub low_importance_retries: u32,

    /// Transmission attempts for client replies.
    #[serde(default = "default_high_importance_retries")]
    pub high_importance_retries: u32,

    /// How long an untouched path search survives.
    #[serde(default = "default_path_timeout_secs")]
    pub path_timeout_secs: u64,

    /// How often expired paths are swept.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Shutdown signals after which the process exits without draining.
    #[serde(default = "default_force_exit_signals")]
    pub force_exit_signals: u32,

    /// LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Whether to serve Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// HTTP port for `/metrics` (if enabled).
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_server_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ripple_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    16_000
}

fn default_low_importance_retries() -> u32 {
    5
}

fn default_high_importance_retries() -> u32 {
    12
}

fn default_path_timeout_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    5
}

fn default_force_exit_signals() -> u32 {
    9
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_metrics_port() -> u16 {
    9102
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// The configured server address as a wire name.
    pub fn server_address(&self) -> Result<ServerAddress, NodeError> {
        ServerAddress::new(self.server_address.as_str())
            .map_err(|e| NodeError::Config(format!("server_address: {e}")))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            low_importance_attempts: self.low_importance_retries,
            high_importance_attempts: self.high_importance_retries,
        }
    }

    pub fn path_timeout(&self) -> Duration {
        Duration::from_secs(self.path_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            server_address: default_server_address(),
            bind_host: default_bind_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            low_importance_retries: default_low_importance_retries(),
            high_importance_retries: default_high_importance_retries(),
            path_timeout_secs: default_path_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            force_exit_signals: default_force_exit_signals(),
            lmdb_map_size: default_lmdb_map_size(),
            enable_metrics: false,
            metrics_port: default_metrics_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.port, config.port);
        assert_eq!(parsed.path_timeout_secs, config.path_timeout_secs);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.port, 2012);
        assert_eq!(config.low_importance_retries, 5);
        assert_eq!(config.high_importance_retries, 12);
        assert_eq!(config.force_exit_signals, 9);
        assert_eq!(config.log_format, "human");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            server_address = "bank.example:4000"
            max_backoff_ms = 8000
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.server_address().unwrap().as_str(), "bank.example:4000");
        assert_eq!(config.retry_policy().max_backoff, Duration::from_secs(8));
        assert_eq!(config.log_format, "human"); // default
    }

    #[test]
    fn oversized_server_address_is_a_config_error() {
        let config = NodeConfig {
            server_address: "x".repeat(40),
            ..NodeConfig::default()
        };
        assert!(matches!(config.server_address(), Err(NodeError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ripple.toml");
        std::fs::write(&path, "port = 4000\nenable_metrics = true\n").unwrap();
        let config = NodeConfig::from_toml_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 4000);
        assert!(config.enable_metrics);
        assert_eq!(config.metrics_port, 9102);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/ripple.toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }
}
