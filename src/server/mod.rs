//! Simulated backend servers.
//!
//! # Data Flow
//! ```text
//! POST /process
//!     → handlers.rs (connection +1, 202 ack)
//!     → background task (worker permit, sleep, result envelope, connection -1)
//!
//! self-health loop (simulated.rs)
//!     → reported status, served on GET /health
//! ```
//!
//! # Design Decisions
//! - Acceptance is asynchronous; the caller only ever sees the ack
//! - Worker cap queues excess work instead of rejecting it
//! - Connection count is released by a guard, so every exit path decrements

use std::time::Duration;
use thiserror::Error;

use crate::config::schema::BackendConfig;

pub mod handlers;
pub mod simulated;

pub use simulated::SimulatedBackend;

/// Per-backend runtime settings.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Tick of the self-health loop.
    pub status_interval: Duration,
    pub processing_min: Duration,
    pub processing_max: Duration,
    /// Concurrent background tasks per backend.
    pub max_workers: usize,
}

impl BackendSettings {
    pub fn from_config(config: &BackendConfig, status_interval: Duration) -> Self {
        Self {
            status_interval,
            processing_min: Duration::from_millis(config.processing_min_ms),
            processing_max: Duration::from_millis(config.processing_max_ms),
            max_workers: config.max_workers,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self::from_config(&BackendConfig::default(), Duration::from_secs(2))
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("port {port} is unavailable: {source}")]
    PortUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}
