//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use lb_simulator::config::SimulatorConfig;
use lb_simulator::simulation::{Simulation, StartParams, StatusSnapshot, SubmitRequest};

/// Ephemeral ports, short intervals and a processing window long enough to
/// observe requests in flight.
pub fn test_config() -> SimulatorConfig {
    let mut config = SimulatorConfig::default();
    config.simulation.base_port = 0;
    config.simulation.health_check_interval_ms = 100;
    config.backend.processing_min_ms = 300;
    config.backend.processing_max_ms = 400;
    config.timeouts.forward_secs = 2;
    config.timeouts.probe_secs = 1;
    config.timeouts.shutdown_grace_secs = 2;
    config
}

pub fn params(num_backends: usize, algorithm: &str, fail_rate: u8) -> StartParams {
    StartParams {
        num_backends,
        algorithm: algorithm.to_string(),
        health_check_interval: Duration::from_millis(100),
        fail_rate,
    }
}

/// Start a simulation on ephemeral ports.
pub async fn start_simulation(num_backends: usize, algorithm: &str, fail_rate: u8) -> Arc<Simulation> {
    let sim = Arc::new(Simulation::new(test_config()));
    sim.start(params(num_backends, algorithm, fail_rate))
        .await
        .expect("simulation should start");
    sim
}

pub fn request(client_id: &str) -> SubmitRequest {
    SubmitRequest {
        client_id: Some(client_id.to_string()),
        ..Default::default()
    }
}

pub fn localhost() -> std::net::IpAddr {
    Ipv4Addr::LOCALHOST.into()
}

/// An address nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll `check` until it holds or `within` runs out.
pub async fn eventually<F, Fut>(within: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check().await
}

/// Wait until every backend is back to zero active connections.
pub async fn drained(sim: &Simulation) -> bool {
    eventually(Duration::from_secs(3), || async {
        let status: StatusSnapshot = sim.status().await.unwrap();
        status.backends.iter().all(|b| b.active_connections == 0)
    })
    .await
}

/// Serve the admin API on an ephemeral port for the rest of the test.
pub async fn start_admin(sim: Arc<Simulation>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = lb_simulator::admin::serve(listener, sim, std::future::pending()).await;
    });
    addr
}
