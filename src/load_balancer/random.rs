//! Uniform random load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

#[derive(Debug, Default)]
pub struct RandomChoice;

impl RandomChoice {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for RandomChoice {
    fn next_server(&self, eligible: &[Arc<Backend>], _client: &str) -> Option<Arc<Backend>> {
        if eligible.is_empty() {
            return None;
        }
        eligible.get(fastrand::usize(..eligible.len())).cloned()
    }
}
