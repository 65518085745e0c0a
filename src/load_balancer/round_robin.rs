//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores a monotonic counter; each selection consumes exactly one value,
/// so concurrent callers never observe the same index twice.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selections made so far.
    #[cfg(test)]
    fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, eligible: &[Arc<Backend>], _client: &str) -> Option<Arc<Backend>> {
        if eligible.is_empty() {
            return None;
        }

        // The index drifts when the eligible set changes size; not corrected.
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        eligible.get(count % eligible.len()).cloned()
    }
}
