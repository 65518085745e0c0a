//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the simulator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Control-plane HTTP API.
    pub admin: AdminConfig,

    /// Defaults for `start` when the caller leaves a field out.
    pub simulation: SimulationConfig,

    /// Behaviour of every simulated backend.
    pub backend: BackendConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Simulation defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_backends: usize,

    /// round_robin, least_connections, ip_hash or random.
    pub algorithm: String,

    /// Health monitor poll interval and backend self-health tick, in milliseconds.
    pub health_check_interval_ms: u64,

    /// Percent chance (0-100) a backend reports DOWN on each tick.
    pub fail_rate: u8,

    /// Host the backends bind on.
    pub bind_host: String,

    /// Backend `i` binds `base_port + i`; 0 picks ephemeral ports.
    pub base_port: u16,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_backends: 3,
            algorithm: "round_robin".to_string(),
            health_check_interval_ms: 2000,
            fail_rate: 0,
            bind_host: "127.0.0.1".to_string(),
            base_port: 8000,
        }
    }
}

/// Simulated backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Lower bound of the simulated processing time.
    pub processing_min_ms: u64,

    /// Upper bound of the simulated processing time.
    pub processing_max_ms: u64,

    /// Concurrent background tasks per backend; the rest queue.
    pub max_workers: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            processing_min_ms: 500,
            processing_max_ms: 1500,
            max_workers: 10,
        }
    }
}

/// Timeout configuration for outbound calls and shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Dispatcher → backend `/process`.
    pub forward_secs: u64,

    /// Health monitor → backend `/health`.
    pub probe_secs: u64,

    /// Bound on joining each background task during stop.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            forward_secs: 5,
            probe_secs: 2,
            shutdown_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
