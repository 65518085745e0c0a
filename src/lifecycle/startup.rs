//! Startup readiness.
//!
//! # Responsibilities
//! - Poll a freshly bound backend until its health endpoint answers
//!
//! # Design Decisions
//! - Fail fast: a backend that never answers is a startup error
//! - Any well-formed health report counts as ready, DOWN included

use std::time::Duration;
use tokio::time::{self, Instant};

use crate::health::HealthReport;
use crate::http::client::JsonClient;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Poll `url` until it returns a health report or `within` elapses.
pub async fn wait_until_ready(client: &JsonClient, url: &str, probe_timeout: Duration, within: Duration) -> bool {
    let deadline = Instant::now() + within;
    loop {
        match client.get_json::<HealthReport>(url, probe_timeout).await {
            Ok(report) => {
                tracing::debug!(server_id = %report.server_id, "Backend ready");
                return true;
            }
            Err(e) if Instant::now() >= deadline => {
                tracing::warn!(url = %url, error = %e, "Backend never became ready");
                return false;
            }
            Err(_) => time::sleep(POLL_INTERVAL).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gives_up_on_closed_port() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let ready = wait_until_ready(
            &JsonClient::new(),
            &format!("http://{addr}/health"),
            Duration::from_millis(50),
            Duration::from_millis(150),
        )
        .await;
        assert!(!ready);
    }
}
