//! HTTP surface of a simulated backend.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::health::HealthReport;
use crate::load_balancer::backend::{Backend, BackendConnectionGuard};
use crate::load_balancer::types::{ProcessAck, ProcessRequest};

/// Shared state of one simulated backend's handlers.
#[derive(Clone)]
pub struct ServerState {
    pub backend: Arc<Backend>,
    pub workers: Arc<Semaphore>,
    pub processing_min: Duration,
    pub processing_max: Duration,
}

/// Result envelope built once background processing finishes.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProcessResult {
    Done {
        server_id: String,
        client_id: String,
        message: String,
        processing_time: f64,
        active_connections: usize,
    },
    Failed {
        server_id: String,
        error: String,
    },
}

/// `GET /health`: snapshot, no mutation.
pub async fn health(State(state): State<ServerState>) -> Json<HealthReport> {
    tracing::debug!(server_id = %state.backend.id, "Health check");
    Json(HealthReport {
        status: state.backend.reported_status(),
        server_id: state.backend.id.clone(),
        active_connections: state.backend.active_connections(),
    })
}

/// `POST /process`: count the connection, acknowledge at once, work in the background.
pub async fn process(State(state): State<ServerState>, body: Bytes) -> (StatusCode, Json<ProcessAck>) {
    let guard = state.backend.connection_guard();
    let active = state.backend.active_connections();
    let started = Instant::now();

    tracing::debug!(server_id = %state.backend.id, active, "Accepted request");

    let worker_state = state.clone();
    tokio::spawn(async move {
        let result = run_to_completion(&worker_state, guard, body, started).await;
        match &result {
            ProcessResult::Done { client_id, processing_time, .. } => tracing::info!(
                server_id = %worker_state.backend.id,
                client_id = %client_id,
                processing_time,
                "Processed request"
            ),
            ProcessResult::Failed { error, .. } => tracing::error!(
                server_id = %worker_state.backend.id,
                error = %error,
                "Error processing request"
            ),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(ProcessAck {
            server_id: state.backend.id.clone(),
            message: "Request accepted for processing".to_string(),
            active_connections: active,
        }),
    )
}

/// Background half of `/process`. The guard is released when this returns,
/// whatever the outcome.
async fn run_to_completion(
    state: &ServerState,
    guard: BackendConnectionGuard,
    body: Bytes,
    started: Instant,
) -> ProcessResult {
    let server_id = guard.id.clone();

    let _permit = match state.workers.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return ProcessResult::Failed {
                server_id,
                error: "worker pool closed".to_string(),
            }
        }
    };

    let delay = simulated_delay(state.processing_min, state.processing_max);
    tokio::time::sleep(delay).await;

    match serde_json::from_slice::<ProcessRequest>(&body) {
        Ok(request) => ProcessResult::Done {
            message: format!("Request processed by server {}", server_id),
            server_id,
            client_id: request.client_id,
            processing_time: (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0,
            active_connections: guard.active_connections(),
        },
        Err(e) => ProcessResult::Failed {
            server_id,
            error: e.to_string(),
        },
    }
}

/// Uniform draw in `[min, max]`.
pub fn simulated_delay(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}
