//! Least-connections strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Picks the eligible backend with the fewest in-flight requests. Ties go to
/// the earliest backend in pool order.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, eligible: &[Arc<Backend>], _client: &str) -> Option<Arc<Backend>> {
        // min_by_key keeps the first of equal keys.
        eligible.iter().min_by_key(|b| b.active_connections()).cloned()
    }
}
