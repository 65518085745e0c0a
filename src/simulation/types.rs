use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::SimulatorConfig;
use crate::health::state::HealthStatus;
use crate::load_balancer::{Algorithm, DispatchError, UnknownAlgorithm};
use crate::server::ServerError;
use crate::simulation::stats::MetricsSnapshot;

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct StartParams {
    pub num_backends: usize,
    pub algorithm: String,
    pub health_check_interval: Duration,
    pub fail_rate: u8,
}

impl StartParams {
    pub fn from_defaults(config: &SimulatorConfig) -> Self {
        Self {
            num_backends: config.simulation.num_backends,
            algorithm: config.simulation.algorithm.clone(),
            health_check_interval: Duration::from_millis(config.simulation.health_check_interval_ms),
            fail_rate: config.simulation.fail_rate,
        }
    }
}

/// One request from the control plane; missing fields get defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub client_id: Option<String>,
    pub client_ip: Option<String>,
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSnapshot {
    pub id: String,
    pub address: SocketAddr,
    /// Observed by the health monitor; what routing uses.
    pub status: HealthStatus,
    /// What the backend itself last rolled.
    pub reported_status: HealthStatus,
    pub active_connections: usize,
    pub fail_rate: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub backends: Vec<BackendSnapshot>,
    pub algorithm: Algorithm,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("simulation already running")]
    AlreadyRunning,

    #[error("no simulation running")]
    NotRunning,

    #[error(transparent)]
    InvalidAlgorithm(#[from] UnknownAlgorithm),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("backend {server_id} failed to start: {source}")]
    Backend {
        server_id: String,
        #[source]
        source: ServerError,
    },

    #[error("backend {server_id} did not become reachable within {waited:?}")]
    BackendUnreachable { server_id: String, waited: Duration },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
