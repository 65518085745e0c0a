//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server (identity + address)
//! - Track active connections (for Least Connections LB)
//! - Hold the reported (true) and observed health status, one writer each
//! - Carry the failure-injection rate of the simulated server

use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::health::state::HealthStatus;

/// A single backend server, shared between the dispatcher, the health
/// monitor and the simulated server that owns it.
#[derive(Debug)]
pub struct Backend {
    /// Stable identifier ("S0", "S1", ...).
    pub id: String,
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Percent chance (0-100) of self-reporting DOWN on each status tick.
    fail_rate: u8,
    /// Number of accepted requests still being processed.
    active_connections: AtomicUsize,
    /// Written only by the backend's own self-health loop.
    reported_status: AtomicU8,
    /// Written only by the health monitor.
    observed_status: AtomicU8,
}

impl Backend {
    /// Create a new backend. Both status fields start out healthy.
    pub fn new(id: impl Into<String>, addr: SocketAddr, fail_rate: u8) -> Self {
        Self {
            id: id.into(),
            addr,
            fail_rate: fail_rate.min(100),
            active_connections: AtomicUsize::new(0),
            reported_status: AtomicU8::new(HealthStatus::Healthy as u8),
            observed_status: AtomicU8::new(HealthStatus::Healthy as u8),
        }
    }

    /// Absolute URL of a path on this backend.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub fn fail_rate(&self) -> u8 {
        self.fail_rate
    }

    /// Get the current number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Increment active connection count, returning the new value.
    pub fn inc_connections(&self) -> usize {
        self.active_connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Decrement active connection count. Never wraps below zero; returns
    /// false if the count was already zero.
    pub fn dec_connections(&self) -> bool {
        match self
            .active_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(server_id = %self.id, "Connection count released below zero");
                false
            }
        }
    }

    /// Count one accepted request until the returned guard is dropped.
    pub fn connection_guard(self: &Arc<Self>) -> BackendConnectionGuard {
        self.inc_connections();
        BackendConnectionGuard {
            backend: self.clone(),
        }
    }

    // --- Health Logic ---

    /// Status the backend reports about itself on `/health`.
    pub fn reported_status(&self) -> HealthStatus {
        HealthStatus::from(self.reported_status.load(Ordering::Relaxed))
    }

    pub fn set_reported_status(&self, status: HealthStatus) {
        self.reported_status.store(status as u8, Ordering::Relaxed);
    }

    /// Status last observed by the health monitor.
    pub fn observed_status(&self) -> HealthStatus {
        HealthStatus::from(self.observed_status.load(Ordering::Relaxed))
    }

    pub fn set_observed_status(&self, status: HealthStatus) {
        self.observed_status.store(status as u8, Ordering::Relaxed);
    }

    /// Return true if the backend is eligible for selection.
    pub fn is_healthy(&self) -> bool {
        self.observed_status().is_healthy()
    }
}

/// A RAII guard that manages the active connection count.
///
/// The decrement happens on drop, so it also runs if the processing task
/// unwinds.
#[derive(Debug)]
pub struct BackendConnectionGuard {
    pub backend: Arc<Backend>,
}

impl Deref for BackendConnectionGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for BackendConnectionGuard {
    fn drop(&mut self) {
        self.backend.dec_connections();
    }
}
