//! Request dispatcher.
//!
//! # Responsibilities
//! - Own the backend pool and the active algorithm (swapped atomically)
//! - Compute the eligible set and select a backend
//! - Forward the request under a hard timeout
//! - On delivery failure, retry exactly once on a different backend
//!
//! # Design Decisions
//! - No background task: `process` runs in the caller's context
//! - Delivery failure is distinct from observed DOWN (health may lag)
//! - Every selection and outcome is emitted before returning

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::http::client::JsonClient;
use crate::http::request::new_request_id;
use crate::load_balancer::{
    backend::Backend,
    ip_hash::IpHash,
    least_conn::LeastConnections,
    random::RandomChoice,
    round_robin::RoundRobin,
    types::{DispatchError, DispatchRequest, DispatchResponse, ProcessAck, ProcessRequest},
    Algorithm, LoadBalancer,
};
use crate::observability::{metrics, EventLog, LogEvent};
use crate::resilience::CallError;

/// Pool and algorithm, replaced together by [`Dispatcher::configure`].
#[derive(Debug)]
struct Routing {
    backends: Vec<Arc<Backend>>,
    algorithm: Algorithm,
}

pub struct Dispatcher {
    routing: ArcSwap<Routing>,
    /// Survives `configure`, so the counter stays monotonic.
    round_robin: RoundRobin,
    least_conn: LeastConnections,
    ip_hash: IpHash,
    random: RandomChoice,
    client: JsonClient,
    forward_timeout: Duration,
    events: EventLog,
}

impl Dispatcher {
    pub fn new(
        backends: Vec<Arc<Backend>>,
        algorithm: Algorithm,
        forward_timeout: Duration,
        events: EventLog,
    ) -> Self {
        Self {
            routing: ArcSwap::from_pointee(Routing { backends, algorithm }),
            round_robin: RoundRobin::new(),
            least_conn: LeastConnections::new(),
            ip_hash: IpHash::new(),
            random: RandomChoice::new(),
            client: JsonClient::new(),
            forward_timeout,
            events,
        }
    }

    /// Replace pool and algorithm in one step. Unknown names are rejected and
    /// leave the current configuration untouched.
    pub fn configure(&self, backends: Vec<Arc<Backend>>, algorithm: &str) -> Result<(), DispatchError> {
        let algorithm: Algorithm = algorithm.parse()?;
        tracing::info!(algorithm = %algorithm, backends = backends.len(), "Dispatcher reconfigured");
        self.routing.store(Arc::new(Routing { backends, algorithm }));
        Ok(())
    }

    pub fn algorithm(&self) -> Algorithm {
        self.routing.load().algorithm
    }

    /// Snapshot of the pool in insertion order (for health checking).
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.routing.load().backends.clone()
    }

    /// Select a backend for `client`, skipping DOWN backends and `exclude`.
    pub fn select(&self, client: &str, exclude: Option<&Backend>) -> Option<Arc<Backend>> {
        let routing = self.routing.load();
        let eligible: Vec<Arc<Backend>> = routing
            .backends
            .iter()
            .filter(|b| b.is_healthy())
            .filter(|b| exclude.map_or(true, |ex| ex.id != b.id))
            .cloned()
            .collect();

        self.strategy(routing.algorithm).next_server(&eligible, client)
    }

    fn strategy(&self, algorithm: Algorithm) -> &dyn LoadBalancer {
        match algorithm {
            Algorithm::RoundRobin => &self.round_robin,
            Algorithm::LeastConnections => &self.least_conn,
            Algorithm::IpHash => &self.ip_hash,
            Algorithm::Random => &self.random,
        }
    }

    /// Route one request: select, forward, and retry once on delivery failure.
    pub async fn process(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let start = Instant::now();
        let algorithm = self.algorithm();

        let primary = match self.select(&request.client_addr, None) {
            Some(b) => b,
            None => {
                self.events.emit(LogEvent::NoHealthyBackend {
                    client_id: request.client_id.clone(),
                });
                metrics::record_dispatch(algorithm.as_str(), "no_healthy_backend", start);
                return Err(DispatchError::NoHealthyBackend {
                    client_id: request.client_id.clone(),
                });
            }
        };
        self.emit_selected(algorithm, request, &primary);

        let error = match self.forward(&primary, request).await {
            Ok(ack) => return Ok(self.respond(request, ack, start, false, algorithm)),
            Err(e) => e,
        };
        self.emit_delivery_failed(request, &primary, &error);

        let Some(alternate) = self.select(&request.client_addr, Some(&primary)) else {
            self.events.emit(LogEvent::RedirectFailed {
                client_id: request.client_id.clone(),
            });
            metrics::record_dispatch(algorithm.as_str(), "delivery_failed", start);
            return Err(DispatchError::DeliveryFailed {
                client_id: request.client_id.clone(),
                server_id: primary.id.clone(),
                reason: error.to_string(),
            });
        };

        self.events.emit(LogEvent::Redirected {
            client_id: request.client_id.clone(),
            from: primary.id.clone(),
            to: alternate.id.clone(),
        });
        metrics::record_redirect();

        match self.forward(&alternate, request).await {
            Ok(ack) => Ok(self.respond(request, ack, start, true, algorithm)),
            Err(error) => {
                self.emit_delivery_failed(request, &alternate, &error);
                metrics::record_dispatch(algorithm.as_str(), "delivery_failed", start);
                Err(DispatchError::DeliveryFailed {
                    client_id: request.client_id.clone(),
                    server_id: alternate.id.clone(),
                    reason: error.to_string(),
                })
            }
        }
    }

    async fn forward(&self, backend: &Backend, request: &DispatchRequest) -> Result<ProcessAck, CallError> {
        let body = ProcessRequest {
            client_id: request.client_id.clone(),
            payload: request.payload.clone(),
        };
        let request_id = new_request_id();
        tracing::debug!(
            request_id = %request_id,
            server_id = %backend.id,
            addr = %backend.addr,
            "Forwarding request"
        );
        self.client
            .post_json(&backend.url("/process"), &body, &request_id, self.forward_timeout)
            .await
    }

    fn respond(
        &self,
        request: &DispatchRequest,
        ack: ProcessAck,
        start: Instant,
        redirected: bool,
        algorithm: Algorithm,
    ) -> DispatchResponse {
        let processing_time = start.elapsed().as_secs_f64();
        self.events.emit(LogEvent::Responded {
            client_id: request.client_id.clone(),
            server_id: ack.server_id.clone(),
            message: ack.message.clone(),
            processing_time,
        });
        metrics::record_dispatch(algorithm.as_str(), if redirected { "redirected" } else { "ok" }, start);

        DispatchResponse {
            server_id: ack.server_id,
            client_id: request.client_id.clone(),
            message: ack.message,
            processing_time,
            active_connections: ack.active_connections,
            redirected,
        }
    }

    fn emit_selected(&self, algorithm: Algorithm, request: &DispatchRequest, backend: &Backend) {
        self.events.emit(LogEvent::Selected {
            algorithm,
            client_id: request.client_id.clone(),
            client_addr: request.client_addr.clone(),
            server_id: backend.id.clone(),
            active_connections: backend.active_connections(),
        });
    }

    fn emit_delivery_failed(&self, request: &DispatchRequest, backend: &Backend, error: &CallError) {
        self.events.emit(LogEvent::DeliveryFailed {
            client_id: request.client_id.clone(),
            server_id: backend.id.clone(),
            error: error.to_string(),
        });
    }
}
