//! HTTP plumbing shared by the dispatcher, the health monitor and the
//! simulated backends.
//!
//! # Data Flow
//! ```text
//! Dispatcher / HealthMonitor
//!     → client.rs (JSON over hyper-util, hard deadline)
//!     → request.rs (x-request-id on every hop)
//!     → backend router
//! ```

pub mod client;
pub mod request;

pub use client::JsonClient;
pub use request::X_REQUEST_ID;
