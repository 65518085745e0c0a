//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce forward/probe deadline)
//!     → On failure: dispatcher retries exactly once on another backend
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - A single retry bounds the work per request (no retry storms)

pub mod timeouts;

pub use timeouts::{deadline, CallError};
