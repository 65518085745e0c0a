//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! submit_request(client_id, client_addr, payload)
//!     → dispatcher.rs (eligible set = observed HEALTHY minus excluded)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through backends)
//!         - least_conn.rs (pick backend with fewest connections)
//!         - ip_hash.rs (sticky by client identifier)
//!         - random.rs (uniform choice)
//!     → forward to backend /process (bounded timeout)
//!     → on delivery failure: select once more excluding the failed backend
//! ```
//!
//! # Design Decisions
//! - Algorithm is a closed enum, rejected at configuration time if unknown
//! - Strategies are stateless except round-robin's counter
//! - Backends are shared records; the dispatcher only reads their status

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod backend;
pub mod dispatcher;
pub mod ip_hash;
pub mod least_conn;
pub mod random;
pub mod round_robin;
pub mod types;

pub use backend::Backend;
pub use dispatcher::Dispatcher;
pub use types::{DispatchError, DispatchRequest, DispatchResponse};

/// A selection strategy over an already-filtered eligible set.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick one backend for `client`, or `None` if `eligible` is empty.
    fn next_server(&self, eligible: &[Arc<Backend>], client: &str) -> Option<Arc<Backend>>;
}

/// Supported routing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    RoundRobin,
    LeastConnections,
    IpHash,
    Random,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::RoundRobin,
        Algorithm::LeastConnections,
        Algorithm::IpHash,
        Algorithm::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round_robin",
            Algorithm::LeastConnections => "least_connections",
            Algorithm::IpHash => "ip_hash",
            Algorithm::Random => "random",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an algorithm name is not one of [`Algorithm::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown load-balancing algorithm '{0}' (expected round_robin, least_connections, ip_hash or random)")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}
