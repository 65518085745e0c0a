//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend's `/health`
//! - Write the observed status the dispatcher filters on
//! - Emit one log event per backend per tick

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::health::state::HealthStatus;
use crate::http::client::JsonClient;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{Backend, Dispatcher};
use crate::observability::{metrics, EventLog, LogEvent};
use crate::resilience::CallError;

/// Payload of a backend's `/health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub server_id: String,
    pub active_connections: usize,
}

pub struct HealthMonitor {
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    timeout: Duration,
    client: JsonClient,
    events: EventLog,
}

impl HealthMonitor {
    pub fn new(dispatcher: Arc<Dispatcher>, interval: Duration, timeout: Duration, events: EventLog) -> Self {
        Self {
            dispatcher,
            interval,
            timeout,
            client: JsonClient::new(),
            events,
        }
    }

    /// Spawn the monitor loop. The first tick fires immediately.
    pub fn spawn(self) -> MonitorHandle {
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let task = tokio::spawn(self.run(rx));
        MonitorHandle { shutdown, task }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, timeout = ?self.timeout, "Health monitor starting");

        let mut ticker = time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // An in-flight tick always completes; a pending shutdown wins over the next one.
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_all().await;
                }
            }
        }
    }

    /// Probe every backend once, in pool order.
    pub async fn check_all(&self) {
        for backend in self.dispatcher.backends() {
            let status = self.probe(&backend).await;
            backend.set_observed_status(status);

            metrics::record_backend_health(&backend.id, status.is_healthy());
            self.events.emit(LogEvent::HealthProbe {
                server_id: backend.id.clone(),
                status,
            });
        }
    }

    async fn probe(&self, backend: &Backend) -> HealthStatus {
        match self.client.get_json::<HealthReport>(&backend.url("/health"), self.timeout).await {
            Ok(report) => {
                metrics::record_active_connections(&backend.id, report.active_connections);
                report.status
            }
            Err(CallError::Timeout(limit)) => {
                tracing::warn!(server_id = %backend.id, timeout = ?limit, "Health check failed: timeout");
                HealthStatus::Down
            }
            Err(e) => {
                tracing::warn!(server_id = %backend.id, error = %e, "Health check failed");
                HealthStatus::Down
            }
        }
    }
}

/// Handle to a running monitor loop.
pub struct MonitorHandle {
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal the loop and join it within `grace`. Returns false if the loop
    /// had to be aborted.
    pub async fn stop(self, grace: Duration) -> bool {
        self.shutdown.trigger();
        let abort = self.task.abort_handle();
        match time::timeout(grace, self.task).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(grace = ?grace, "Health monitor did not stop in time, aborting");
                abort.abort();
                false
            }
        }
    }
}
