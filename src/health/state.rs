//! Backend health state.
//!
//! # States
//! - Healthy: backend receives traffic
//! - Down: backend excluded from load balancing
//!
//! # Writers
//! ```text
//! reported status: self-health loop of the simulated backend (true status)
//! observed status: health monitor (what the dispatcher filters on)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health status as reported on `/health` and observed by the monitor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy = 1,
    Down = 2,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Down => "down",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

impl From<u8> for HealthStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthStatus::Healthy,
            _ => HealthStatus::Down,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), "\"healthy\"");
        let down: HealthStatus = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(down, HealthStatus::Down);
        assert!(serde_json::from_str::<HealthStatus>("\"degraded\"").is_err());
    }

    #[test]
    fn test_unknown_byte_is_down() {
        assert_eq!(HealthStatus::from(0), HealthStatus::Down);
        assert_eq!(HealthStatus::from(HealthStatus::Healthy as u8), HealthStatus::Healthy);
    }
}
