//! Request/response envelopes and dispatch errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::load_balancer::UnknownAlgorithm;

/// One client request entering the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub client_id: String,
    /// Client address or other identifier; drives `ip_hash`.
    pub client_addr: String,
    pub payload: String,
}

impl DispatchRequest {
    pub fn new(
        client_id: impl Into<String>,
        client_addr: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_addr: client_addr.into(),
            payload: payload.into(),
        }
    }
}

/// Body POSTed to a backend's `/process`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub client_id: String,
    pub payload: String,
}

/// Immediate acknowledgment returned by `/process` (202).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessAck {
    pub server_id: String,
    pub message: String,
    pub active_connections: usize,
}

/// What the dispatcher hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResponse {
    /// Backend that accepted the request.
    pub server_id: String,
    pub client_id: String,
    pub message: String,
    /// Seconds from dispatch start to acknowledgment, retry included.
    pub processing_time: f64,
    /// Connection count snapshot taken by the backend on accept.
    pub active_connections: usize,
    /// True when the request was served by the alternate backend.
    pub redirected: bool,
}

/// Errors surfaced by [`Dispatcher`](crate::load_balancer::Dispatcher).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The eligible set was empty at selection time.
    #[error("no healthy backend available for client {client_id}")]
    NoHealthyBackend { client_id: String },

    /// Forwarding failed and the single retry did not succeed.
    #[error("delivery to server {server_id} failed for client {client_id}: {reason}")]
    DeliveryFailed {
        client_id: String,
        server_id: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidAlgorithm(#[from] UnknownAlgorithm),
}
