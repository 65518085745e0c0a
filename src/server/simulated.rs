//! Simulated backend lifecycle.
//!
//! # Responsibilities
//! - Bind the listener (fail fast with `PortUnavailable`)
//! - Serve `/health` and `/process`
//! - Run the self-health loop that rolls against `fail_rate`
//! - Stop: close listener, join loops, let in-flight work drain

use axum::{routing::{get, post}, Router};
use rand::Rng;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tower_http::trace::TraceLayer;

use crate::health::state::HealthStatus;
use crate::http::request::with_request_id;
use crate::lifecycle::Shutdown;
use crate::load_balancer::Backend;
use crate::observability::{EventLog, LogEvent};
use crate::server::handlers::{self, ServerState};
use crate::server::{BackendSettings, ServerError};

/// A running simulated backend.
pub struct SimulatedBackend {
    backend: Arc<Backend>,
    shutdown: Shutdown,
    workers: Arc<Semaphore>,
    max_workers: usize,
    server_task: JoinHandle<()>,
    status_task: JoinHandle<()>,
    events: EventLog,
}

impl SimulatedBackend {
    /// Bind `addr` and start serving. Port 0 picks an ephemeral port.
    pub async fn start(
        id: impl Into<String>,
        addr: SocketAddr,
        fail_rate: u8,
        settings: &BackendSettings,
        events: EventLog,
    ) -> Result<Self, ServerError> {
        let id = id.into();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::PortUnavailable { port: addr.port(), source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::PortUnavailable { port: addr.port(), source })?;

        tracing::info!(
            server_id = %id,
            address = %local_addr,
            fail_rate,
            "Starting simulated backend"
        );

        let backend = Arc::new(Backend::new(id, local_addr, fail_rate));
        let max_workers = settings.max_workers.max(1);
        let workers = Arc::new(Semaphore::new(max_workers));
        let shutdown = Shutdown::new();

        let status_task = tokio::spawn(run_status_loop(
            backend.clone(),
            settings.status_interval,
            shutdown.subscribe(),
        ));

        let state = ServerState {
            backend: backend.clone(),
            workers: workers.clone(),
            processing_min: settings.processing_min,
            processing_max: settings.processing_max,
        };
        let router = with_request_id(
            Router::new()
                .route("/health", get(handlers::health))
                .route("/process", post(handlers::process))
                .with_state(state),
        )
        .layer(TraceLayer::new_for_http());

        let signal = shutdown.signalled();
        let server_id = backend.id.clone();
        let server_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(signal).await {
                tracing::error!(server_id = %server_id, error = %e, "Backend listener failed");
            }
        });

        events.emit(LogEvent::ServerStarted {
            server_id: backend.id.clone(),
            addr: local_addr,
        });

        Ok(Self {
            backend,
            shutdown,
            workers,
            max_workers,
            server_task,
            status_task,
            events,
        })
    }

    /// The shared record the dispatcher and health monitor use.
    pub fn backend(&self) -> Arc<Backend> {
        self.backend.clone()
    }

    /// Close the listener, join both loops, and wait for in-flight work, each
    /// bounded by `grace`. Work still running after that keeps going in the
    /// background and still releases its connection.
    pub async fn stop(self, grace: Duration) {
        tracing::info!(server_id = %self.backend.id, "Stopping simulated backend");
        self.shutdown.trigger();

        join_or_abort(&self.backend.id, "listener", self.server_task, grace).await;
        join_or_abort(&self.backend.id, "status loop", self.status_task, grace).await;

        // Every worker permit back means nothing queued or in flight.
        match time::timeout(grace, self.workers.acquire_many(self.max_workers as u32)).await {
            Ok(Ok(_all)) => {}
            Ok(Err(_)) => {}
            Err(_) => tracing::warn!(
                server_id = %self.backend.id,
                active_connections = self.backend.active_connections(),
                "In-flight requests still draining after grace period"
            ),
        }

        self.events.emit(LogEvent::ServerStopped {
            server_id: self.backend.id.clone(),
        });
    }
}

async fn join_or_abort(server_id: &str, what: &str, task: JoinHandle<()>, grace: Duration) {
    let abort = task.abort_handle();
    if time::timeout(grace, task).await.is_err() {
        tracing::warn!(server_id = %server_id, task = what, "Task did not stop in time, aborting");
        abort.abort();
    }
}

/// Self-health loop: each tick rolls 1..=100 against the fail rate.
async fn run_status_loop(backend: Arc<Backend>, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                let status = roll_status(backend.fail_rate());
                if status != backend.reported_status() {
                    tracing::info!(server_id = %backend.id, status = %status, "Reported status changed");
                }
                backend.set_reported_status(status);
            }
        }
    }
}

/// DOWN with probability `fail_rate`%.
pub fn roll_status(fail_rate: u8) -> HealthStatus {
    let roll: u8 = rand::thread_rng().gen_range(1..=100);
    if roll <= fail_rate {
        HealthStatus::Down
    } else {
        HealthStatus::Healthy
    }
}
