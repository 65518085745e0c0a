//! Live log event stream.
//!
//! # Responsibilities
//! - One textual event per selection, delivery failure/redirect, health
//!   probe and server start/stop
//! - Fan out to any number of live subscribers (dashboards, tests)
//! - Mirror every event into `tracing`
//!
//! # Design Decisions
//! - Emission never blocks and never fails; lagging subscribers lose events
//! - Wording is for humans; the variant is the stable part

use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::broadcast;

use crate::health::state::HealthStatus;
use crate::load_balancer::Algorithm;

const EVENT_BUFFER: usize = 1024;

/// A single event on the log stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEvent {
    Selected {
        algorithm: Algorithm,
        client_id: String,
        client_addr: String,
        server_id: String,
        active_connections: usize,
    },
    NoHealthyBackend {
        client_id: String,
    },
    DeliveryFailed {
        client_id: String,
        server_id: String,
        error: String,
    },
    Redirected {
        client_id: String,
        from: String,
        to: String,
    },
    RedirectFailed {
        client_id: String,
    },
    Responded {
        client_id: String,
        server_id: String,
        message: String,
        processing_time: f64,
    },
    HealthProbe {
        server_id: String,
        status: HealthStatus,
    },
    ServerStarted {
        server_id: String,
        addr: SocketAddr,
    },
    ServerStopped {
        server_id: String,
    },
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Selected { algorithm, client_id, client_addr, server_id, active_connections } => write!(
                f,
                "{} -> Client {} (IP: {}) assigned to Server {} [Active: {}]",
                algorithm.as_str().to_uppercase(),
                client_id,
                client_addr,
                server_id,
                active_connections
            ),
            LogEvent::NoHealthyBackend { client_id } => {
                write!(f, "No healthy server available for Client {}", client_id)
            }
            LogEvent::DeliveryFailed { client_id, server_id, error } => {
                write!(f, "Delivery of Client {} to Server {} failed: {}", client_id, server_id, error)
            }
            LogEvent::Redirected { client_id, from, to } => {
                write!(f, "Redirecting Client {} from Server {} to Server {}", client_id, from, to)
            }
            LogEvent::RedirectFailed { client_id } => {
                write!(f, "No healthy server available to redirect Client {}", client_id)
            }
            LogEvent::Responded { client_id, server_id, message, processing_time } => write!(
                f,
                "Client {} Response from Server {}: {} [Time: {:.3}s]",
                client_id, server_id, message, processing_time
            ),
            LogEvent::HealthProbe { server_id, status } => write!(
                f,
                "Health Check: Server {} is {}",
                server_id,
                status.as_str().to_uppercase()
            ),
            LogEvent::ServerStarted { server_id, addr } => write!(f, "Server {} started on {}", server_id, addr),
            LogEvent::ServerStopped { server_id } => write!(f, "Server {} stopped", server_id),
        }
    }
}

/// Cloneable handle to the event stream.
#[derive(Debug, Clone)]
pub struct EventLog {
    tx: broadcast::Sender<LogEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: LogEvent) {
        match &event {
            LogEvent::NoHealthyBackend { .. }
            | LogEvent::DeliveryFailed { .. }
            | LogEvent::RedirectFailed { .. } => tracing::warn!(event = %event, "lb event"),
            LogEvent::HealthProbe { .. } => tracing::debug!(event = %event, "lb event"),
            _ => tracing::info!(event = %event, "lb event"),
        }
        // No receivers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_line() {
        let event = LogEvent::Selected {
            algorithm: Algorithm::RoundRobin,
            client_id: "C1".into(),
            client_addr: "10.0.0.1".into(),
            server_id: "S0".into(),
            active_connections: 2,
        };
        assert_eq!(
            event.to_string(),
            "ROUND_ROBIN -> Client C1 (IP: 10.0.0.1) assigned to Server S0 [Active: 2]"
        );
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let log = EventLog::new();
        log.emit(LogEvent::ServerStopped { server_id: "S9".into() });

        let mut rx = log.subscribe();
        log.emit(LogEvent::HealthProbe { server_id: "S0".into(), status: HealthStatus::Down });
        let got = rx.recv().await.unwrap();
        assert_eq!(got.to_string(), "Health Check: Server S0 is DOWN");
    }
}
