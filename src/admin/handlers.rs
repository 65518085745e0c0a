use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::load_balancer::{DispatchError, DispatchResponse};
use crate::observability::LogEvent;
use crate::simulation::{Simulation, SimulationError, StartParams, StatusSnapshot, SubmitRequest};

/// Body of `POST /api/start`. Every field falls back to the configured default.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StartBody {
    pub num_servers: Option<usize>,
    pub algorithm: Option<String>,
    /// Seconds.
    pub health_check_interval: Option<f64>,
    pub fail_rate: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self { message: message.into() })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Maps simulation errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub SimulationError);

impl From<SimulationError> for ApiError {
    fn from(e: SimulationError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SimulationError::AlreadyRunning
            | SimulationError::NotRunning
            | SimulationError::InvalidAlgorithm(_)
            | SimulationError::InvalidParameter { .. }
            | SimulationError::Dispatch(DispatchError::InvalidAlgorithm(_)) => StatusCode::BAD_REQUEST,
            SimulationError::Dispatch(DispatchError::DeliveryFailed { .. }) => StatusCode::BAD_GATEWAY,
            SimulationError::Dispatch(DispatchError::NoHealthyBackend { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            SimulationError::Backend { .. } | SimulationError::BackendUnreachable { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = status.as_u16(), "Admin request failed");
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "Admin request rejected");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

pub async fn start(
    State(sim): State<Arc<Simulation>>,
    body: Option<Json<StartBody>>,
) -> Result<Json<MessageBody>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let mut params = StartParams::from_defaults(sim.config());

    if let Some(n) = body.num_servers {
        params.num_backends = n;
    }
    if let Some(algorithm) = body.algorithm {
        params.algorithm = algorithm;
    }
    if let Some(secs) = body.health_check_interval {
        params.health_check_interval =
            Duration::try_from_secs_f64(secs).map_err(|e| SimulationError::InvalidParameter {
                name: "health_check_interval",
                reason: e.to_string(),
            })?;
    }
    if let Some(rate) = body.fail_rate {
        params.fail_rate = rate;
    }

    sim.start(params).await?;
    Ok(MessageBody::new("Simulation started successfully"))
}

pub async fn stop(State(sim): State<Arc<Simulation>>) -> Result<Json<MessageBody>, ApiError> {
    sim.stop().await?;
    Ok(MessageBody::new("Simulation stopped successfully"))
}

pub async fn send_request(
    State(sim): State<Arc<Simulation>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Option<Json<SubmitRequest>>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let response = sim.submit_request(request, peer.ip()).await?;
    Ok(Json(response))
}

pub async fn status(State(sim): State<Arc<Simulation>>) -> Result<Json<StatusSnapshot>, ApiError> {
    Ok(Json(sim.status().await?))
}

/// Upgrade to a WebSocket that streams every log event as `{"message": line}`.
pub async fn logs(ws: WebSocketUpgrade, State(sim): State<Arc<Simulation>>) -> impl IntoResponse {
    let events = sim.events();
    ws.on_upgrade(move |socket| stream_logs(socket, events))
}

async fn stream_logs(mut socket: WebSocket, mut events: broadcast::Receiver<LogEvent>) {
    tracing::debug!("Log stream client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Log stream receive error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            event = events.recv() => match event {
                Ok(event) => {
                    let line = serde_json::json!({ "message": event.to_string() }).to_string();
                    if socket.send(Message::Text(line.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Log stream client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!("Log stream client disconnected");
}
