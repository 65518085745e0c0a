//! Simulation context.
//!
//! # Responsibilities
//! - Own everything one run needs: backends, dispatcher, health monitor
//! - Enforce the run state machine (idle ↔ running)
//! - Fill request defaults and keep request statistics
//!
//! # Data Flow
//! ```text
//! start(params)
//!     → bind S0..Sn-1 → wait for /health → Dispatcher → HealthMonitor
//! submit_request(req)
//!     → defaults → Dispatcher::process → RequestStats
//! stop()
//!     → HealthMonitor::stop → SimulatedBackend::stop (all, concurrently)
//! ```
//!
//! # Design Decisions
//! - One explicit context object; no process-wide state
//! - Lifecycle calls serialize on one lock; requests only clone the dispatcher
//!   handle out of it and run concurrently

pub mod stats;
pub mod types;

use futures_util::future::join_all;
use rand::Rng;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

use crate::config::schema::SimulatorConfig;
use crate::health::{HealthMonitor, MonitorHandle};
use crate::http::client::JsonClient;
use crate::lifecycle::startup::wait_until_ready;
use crate::load_balancer::{Algorithm, Backend, DispatchRequest, DispatchResponse, Dispatcher};
use crate::observability::{EventLog, LogEvent};
use crate::server::{BackendSettings, SimulatedBackend};

pub use stats::{MetricsSnapshot, RequestStats};
pub use types::{BackendSnapshot, SimulationError, StartParams, StatusSnapshot, SubmitRequest};

const DEFAULT_PAYLOAD: &str = "Test request";
const READY_WITHIN: Duration = Duration::from_secs(5);

/// Everything owned by one active run.
struct Run {
    dispatcher: Arc<Dispatcher>,
    backends: Vec<SimulatedBackend>,
    monitor: MonitorHandle,
}

pub struct Simulation {
    config: SimulatorConfig,
    events: EventLog,
    stats: RequestStats,
    run: Mutex<Option<Run>>,
}

impl Simulation {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            events: EventLog::new(),
            stats: RequestStats::new(),
            run: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Subscribe to the live log event stream.
    pub fn events(&self) -> broadcast::Receiver<LogEvent> {
        self.events.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.run.lock().await.is_some()
    }

    /// Provision backends and start routing and health checking.
    pub async fn start(&self, params: StartParams) -> Result<(), SimulationError> {
        let mut run = self.run.lock().await;
        if run.is_some() {
            return Err(SimulationError::AlreadyRunning);
        }

        let algorithm = self.check_params(&params)?;
        let host: IpAddr = self
            .config
            .simulation
            .bind_host
            .parse()
            .map_err(|_| SimulationError::InvalidParameter {
                name: "bind_host",
                reason: format!("{:?} is not an IP address", self.config.simulation.bind_host),
            })?;

        tracing::info!(
            num_backends = params.num_backends,
            algorithm = %algorithm,
            health_check_interval = ?params.health_check_interval,
            fail_rate = params.fail_rate,
            "Starting simulation"
        );

        let backends = self.start_backends(host, &params).await?;
        let pool: Vec<Arc<Backend>> = backends.iter().map(SimulatedBackend::backend).collect();

        let timeouts = &self.config.timeouts;
        let dispatcher = Arc::new(Dispatcher::new(
            pool,
            algorithm,
            Duration::from_secs(timeouts.forward_secs),
            self.events.clone(),
        ));
        let monitor = HealthMonitor::new(
            dispatcher.clone(),
            params.health_check_interval,
            Duration::from_secs(timeouts.probe_secs),
            self.events.clone(),
        )
        .spawn();

        self.stats.reset();
        *run = Some(Run {
            dispatcher,
            backends,
            monitor,
        });

        tracing::info!("Simulation started");
        Ok(())
    }

    fn check_params(&self, params: &StartParams) -> Result<Algorithm, SimulationError> {
        if params.num_backends == 0 {
            return Err(SimulationError::InvalidParameter {
                name: "num_backends",
                reason: "must be at least 1".into(),
            });
        }
        if params.fail_rate > 100 {
            return Err(SimulationError::InvalidParameter {
                name: "fail_rate",
                reason: format!("{} is not a percentage", params.fail_rate),
            });
        }
        if params.health_check_interval.is_zero() {
            return Err(SimulationError::InvalidParameter {
                name: "health_check_interval",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(params.algorithm.parse()?)
    }

    /// Bind every backend, then wait for all of them to answer. Any failure
    /// stops the ones already running.
    async fn start_backends(&self, host: IpAddr, params: &StartParams) -> Result<Vec<SimulatedBackend>, SimulationError> {
        let base_port = self.config.simulation.base_port;
        let settings = BackendSettings::from_config(&self.config.backend, params.health_check_interval);
        let mut started = Vec::with_capacity(params.num_backends);

        for i in 0..params.num_backends {
            let server_id = format!("S{i}");
            let port = if base_port == 0 {
                Some(0)
            } else {
                u16::try_from(i).ok().and_then(|i| base_port.checked_add(i))
            };
            let Some(port) = port else {
                self.stop_backends(started).await;
                return Err(SimulationError::InvalidParameter {
                    name: "num_backends",
                    reason: format!("{} backends do not fit above port {}", params.num_backends, base_port),
                });
            };

            let addr = SocketAddr::new(host, port);
            match SimulatedBackend::start(server_id.clone(), addr, params.fail_rate, &settings, self.events.clone()).await
            {
                Ok(backend) => started.push(backend),
                Err(source) => {
                    tracing::error!(server_id = %server_id, error = %source, "Backend failed to start");
                    self.stop_backends(started).await;
                    return Err(SimulationError::Backend { server_id, source });
                }
            }
        }

        let client = JsonClient::new();
        let probe_timeout = Duration::from_secs(self.config.timeouts.probe_secs);
        let mut unreachable = None;
        for backend in started.iter().map(SimulatedBackend::backend) {
            if !wait_until_ready(&client, &backend.url("/health"), probe_timeout, READY_WITHIN).await {
                unreachable = Some(backend.id.clone());
                break;
            }
        }

        match unreachable {
            None => Ok(started),
            Some(server_id) => {
                self.stop_backends(started).await;
                Err(SimulationError::BackendUnreachable {
                    server_id,
                    waited: READY_WITHIN,
                })
            }
        }
    }

    async fn stop_backends(&self, backends: Vec<SimulatedBackend>) {
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        join_all(backends.into_iter().map(|b| b.stop(grace))).await;
    }

    /// Stop health checking, then every backend.
    pub async fn stop(&self) -> Result<(), SimulationError> {
        let mut run = self.run.lock().await;
        let Run { backends, monitor, .. } = run.take().ok_or(SimulationError::NotRunning)?;

        tracing::info!(backends = backends.len(), "Stopping simulation");
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        monitor.stop(grace).await;
        self.stop_backends(backends).await;

        tracing::info!("Simulation stopped");
        Ok(())
    }

    /// Route one request through the active dispatcher. `caller` stands in
    /// for a missing `client_ip`.
    pub async fn submit_request(
        &self,
        request: SubmitRequest,
        caller: IpAddr,
    ) -> Result<DispatchResponse, SimulationError> {
        let dispatcher = self.dispatcher().await?;

        let request = DispatchRequest {
            client_id: request
                .client_id
                .unwrap_or_else(|| format!("C{}", rand::thread_rng().gen_range(1000..=9999))),
            client_addr: request.client_ip.unwrap_or_else(|| caller.to_string()),
            payload: request.payload.unwrap_or_else(|| DEFAULT_PAYLOAD.to_string()),
        };

        match dispatcher.process(&request).await {
            Ok(response) => {
                self.stats.record(Some(Duration::from_secs_f64(response.processing_time)));
                Ok(response)
            }
            Err(e) => {
                self.stats.record(None);
                Err(e.into())
            }
        }
    }

    /// Read-only snapshot of the current run.
    pub async fn status(&self) -> Result<StatusSnapshot, SimulationError> {
        let dispatcher = self.dispatcher().await?;

        let backends: Vec<BackendSnapshot> = dispatcher
            .backends()
            .iter()
            .map(|b| BackendSnapshot {
                id: b.id.clone(),
                address: b.addr,
                status: b.observed_status(),
                reported_status: b.reported_status(),
                active_connections: b.active_connections(),
                fail_rate: b.fail_rate(),
            })
            .collect();
        let active_servers = backends.iter().filter(|b| b.status.is_healthy()).count();

        Ok(StatusSnapshot {
            backends,
            algorithm: dispatcher.algorithm(),
            metrics: self.stats.snapshot(active_servers),
        })
    }

    async fn dispatcher(&self) -> Result<Arc<Dispatcher>, SimulationError> {
        self.run
            .lock()
            .await
            .as_ref()
            .map(|run| run.dispatcher.clone())
            .ok_or(SimulationError::NotRunning)
    }
}
