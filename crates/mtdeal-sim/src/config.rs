//! Simulator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use mtdeal_broker::MockBrokerConfig;
use mtdeal_engine::ProcessorConfig;

use crate::error::{AppError, AppResult};

/// Top-level simulator configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulated broker behavior.
    #[serde(default)]
    pub broker: BrokerSettings,
    /// Worker pool and retry tuning, passed through to the processor.
    #[serde(default)]
    pub processor: ProcessorConfig,
    /// Simulated client population.
    #[serde(default)]
    pub clients: ClientSettings,
}

/// Mock MT5 server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Probability of a transient connection failure per dealer call.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
    /// Lower bound of the simulated per-call latency.
    #[serde(default = "default_min_latency_ms")]
    pub min_latency_ms: u64,
    /// Upper bound of the simulated per-call latency.
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_login")]
    pub login: u64,
    #[serde(default = "default_password")]
    pub password: String,
}

fn default_failure_rate() -> f64 {
    0.05
}

fn default_min_latency_ms() -> u64 {
    10
}

fn default_max_latency_ms() -> u64 {
    100
}

fn default_server() -> String {
    "mt5.demo.local".to_string()
}

fn default_login() -> u64 {
    12345
}

fn default_password() -> String {
    "demo_password".to_string()
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            failure_rate: default_failure_rate(),
            min_latency_ms: default_min_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
            server: default_server(),
            login: default_login(),
            password: default_password(),
        }
    }
}

impl From<BrokerSettings> for MockBrokerConfig {
    fn from(settings: BrokerSettings) -> Self {
        Self {
            failure_rate: settings.failure_rate,
            min_latency_ms: settings.min_latency_ms,
            max_latency_ms: settings.max_latency_ms,
        }
    }
}

/// Simulated client population settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Number of concurrent client threads.
    #[serde(default = "default_client_count")]
    pub count: usize,
    /// Requests each client submits.
    #[serde(default = "default_requests_each")]
    pub requests_each: usize,
    /// Lower bound of the delay between a client's submissions.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Upper bound of the delay between a client's submissions.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Whether clients occasionally submit deliberately bad requests.
    #[serde(default = "default_send_bad_requests")]
    pub send_bad_requests: bool,
    /// Client id prefix; ids are `{prefix}{n}`.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

fn default_client_count() -> usize {
    5
}

fn default_requests_each() -> usize {
    10
}

fn default_min_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    200
}

fn default_send_bad_requests() -> bool {
    true
}

fn default_id_prefix() -> String {
    "Client-".to_string()
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            count: default_client_count(),
            requests_each: default_requests_each(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            send_bad_requests: default_send_bad_requests(),
            id_prefix: default_id_prefix(),
        }
    }
}

impl SimConfig {
    /// High-frequency burst preset: more clients, more workers, minimal
    /// inter-request delay.
    #[must_use]
    pub fn burst() -> Self {
        Self {
            broker: BrokerSettings::default(),
            processor: ProcessorConfig {
                num_workers: 8,
                max_retries: 2,
                retry_base_ms: 50,
            },
            clients: ClientSettings {
                count: 10,
                requests_each: 20,
                min_delay_ms: 1,
                max_delay_ms: 10,
                send_bad_requests: true,
                id_prefix: "Burst-".to_string(),
            },
        }
    }

    /// Load from `path`, falling back to `fallback` with a warning when
    /// the file does not exist.
    pub fn load(path: &str, fallback: SimConfig) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            warn!(path, "config file not found, using built-in preset");
            Ok(fallback)
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.processor.validate()?;
        Ok(config)
    }
}
