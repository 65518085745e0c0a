//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Self-health (server/simulated.rs):
//!     Periodic timer → roll against fail_rate → reported status
//!
//! Active health checks (active.rs):
//!     Periodic timer
//!     → GET /health on each backend (2s timeout)
//!     → observed status (payload status, or DOWN on any failure)
//! ```
//!
//! # Design Decisions
//! - Observed status may lag the reported one by up to one interval
//! - Probe failures are never fatal; they only degrade to DOWN
//! - One monitor task per simulation, not per backend

pub mod active;
pub mod state;

pub use active::{HealthMonitor, HealthReport, MonitorHandle};
pub use state::HealthStatus;
