//! IP hash load balancing strategy (sticky routing).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Maps a client identifier onto the eligible set.
///
/// Dotted-quad identifiers hash to their 32-bit numeric value, anything else
/// goes through the standard hasher. The same identifier against the same
/// eligible set always lands on the same backend.
#[derive(Debug, Default)]
pub struct IpHash;

impl IpHash {
    pub fn new() -> Self {
        Self
    }
}

/// Hash value of a client identifier.
pub fn client_hash(client: &str) -> u64 {
    if let Some(value) = quad_value(client) {
        return value;
    }
    let mut hasher = DefaultHasher::new();
    client.hash(&mut hasher);
    hasher.finish()
}

/// `a.b.c.d` -> a*256^3 + b*256^2 + c*256 + d, for exactly four integer parts.
fn quad_value(client: &str) -> Option<u64> {
    let parts: Vec<&str> = client.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut value: u64 = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let n: u64 = part.parse().ok()?;
        let weight = 256u64.pow(3 - i as u32);
        value = value.wrapping_add(n.wrapping_mul(weight));
    }
    Some(value)
}

impl LoadBalancer for IpHash {
    fn next_server(&self, eligible: &[Arc<Backend>], client: &str) -> Option<Arc<Backend>> {
        if eligible.is_empty() {
            return None;
        }
        let index = (client_hash(client) % eligible.len() as u64) as usize;
        eligible.get(index).cloned()
    }
}
