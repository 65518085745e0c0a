//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / health monitor / simulated servers produce:
//!     → events.rs (human-readable log stream, broadcast)
//!     → metrics.rs (counters, gauges, histograms)
//!     → tracing (structured log lines, logging.rs sets it up)
//!
//! Consumers:
//!     → /api/logs websocket, stdout, Prometheus scrape
//! ```

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EventLog, LogEvent};
