//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, fail rate ≤ 100, ports fit)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SimulatorConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::config::schema::SimulatorConfig;
use crate::load_balancer::Algorithm;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &SimulatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let sim = &config.simulation;

    if config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("admin.bind_address", "not a socket address"));
    }

    if sim.num_backends == 0 {
        errors.push(ValidationError::new("simulation.num_backends", "must be at least 1"));
    }
    if let Err(e) = sim.algorithm.parse::<Algorithm>() {
        errors.push(ValidationError::new("simulation.algorithm", e.to_string()));
    }
    if sim.health_check_interval_ms == 0 {
        errors.push(ValidationError::new("simulation.health_check_interval_ms", "must be greater than 0"));
    }
    if sim.fail_rate > 100 {
        errors.push(ValidationError::new("simulation.fail_rate", "must be between 0 and 100"));
    }
    if sim.bind_host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::new("simulation.bind_host", "not an IP address"));
    }
    if sim.base_port != 0 && sim.base_port as usize + sim.num_backends > u16::MAX as usize + 1 {
        errors.push(ValidationError::new(
            "simulation.base_port",
            format!("{} backends do not fit above port {}", sim.num_backends, sim.base_port),
        ));
    }

    let backend = &config.backend;
    if backend.processing_min_ms > backend.processing_max_ms {
        errors.push(ValidationError::new(
            "backend.processing_min_ms",
            "must not exceed backend.processing_max_ms",
        ));
    }
    if backend.max_workers == 0 {
        errors.push(ValidationError::new("backend.max_workers", "must be at least 1"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.forward_secs", timeouts.forward_secs),
        ("timeouts.probe_secs", timeouts.probe_secs),
        ("timeouts.shutdown_grace_secs", timeouts.shutdown_grace_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
