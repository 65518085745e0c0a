//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     bind backends → wait until each answers /health → start health monitor
//!
//! Shutdown (shutdown.rs):
//!     stop() → trigger → loops exit at their next select → joined with grace
//!
//! Signals (signals.rs):
//!     SIGINT → stop admin server → stop running simulation
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: health monitor, then backends (listener, loops, drain)
//! - Shutdown has timeout: tasks still running after the grace are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
