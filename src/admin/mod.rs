//! Control-plane HTTP API.
//!
//! # Responsibilities
//! - Expose start/stop/send_request/status over JSON
//! - Stream the log event feed over a WebSocket
//! - Map simulation errors onto HTTP statuses
//!
//! # Design Decisions
//! - Stateless handlers; all state lives in the shared `Simulation`
//! - Only request routes carry a timeout; start/stop and the log stream run
//!   as long as they need

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::http::request::with_request_id;
use crate::simulation::Simulation;

#[allow(deprecated)]
pub fn setup_admin_router(sim: Arc<Simulation>) -> Router {
    // Primary forward plus one retry, with slack.
    let request_timeout = Duration::from_secs(sim.config().timeouts.forward_secs * 2 + 1);

    let requests = Router::new()
        .route("/api/send_request", post(handlers::send_request))
        .route("/api/status", get(handlers::status))
        .layer(TimeoutLayer::new(request_timeout));

    let router = Router::new()
        .route("/api/start", post(handlers::start))
        .route("/api/stop", post(handlers::stop))
        .route("/api/logs", get(handlers::logs))
        .merge(requests)
        .with_state(sim);

    with_request_id(router).layer(TraceLayer::new_for_http())
}

/// Serve the admin API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, sim: Arc<Simulation>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    let app = setup_admin_router(sim).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
