//! Load balancer simulator library.

// Control plane
pub mod admin;
pub mod config;
pub mod simulation;

// Traffic management
pub mod health;
pub mod load_balancer;
pub mod server;

// Cross-cutting concerns
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::SimulatorConfig;
pub use lifecycle::Shutdown;
pub use simulation::Simulation;
