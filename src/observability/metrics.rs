//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): dispatches by algorithm and outcome
//! - `lb_redirects_total` (counter): single-retry redirects
//! - `lb_request_duration_seconds` (histogram): dispatch latency
//! - `lb_backend_health` (gauge): observed status, 1=healthy, 0=down
//! - `lb_backend_active_connections` (gauge): in-flight requests per backend
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Prometheus exporter only when enabled in config

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_dispatch(algorithm: &str, outcome: &'static str, start: Instant) {
    counter!("lb_requests_total", "algorithm" => algorithm.to_string(), "outcome" => outcome).increment(1);
    histogram!("lb_request_duration_seconds", "algorithm" => algorithm.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_redirect() {
    counter!("lb_redirects_total").increment(1);
}

pub fn record_backend_health(server_id: &str, healthy: bool) {
    gauge!("lb_backend_health", "backend" => server_id.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_active_connections(server_id: &str, active: usize) {
    gauge!("lb_backend_active_connections", "backend" => server_id.to_string()).set(active as f64);
}
