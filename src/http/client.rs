//! JSON-over-HTTP client used for forwarding and health probes.

use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::http::request::X_REQUEST_ID;
use crate::resilience::{deadline, CallError};

/// Largest response body accepted from a backend.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct JsonClient {
    inner: Client<HttpConnector, Body>,
}

impl JsonClient {
    pub fn new() -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(HttpConnector::new());
        Self { inner }
    }

    /// `GET url`, decoded as `T`, all within `limit`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, limit: Duration) -> Result<T, CallError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(header::USER_AGENT, "lb-simulator-health-check")
            .body(Body::empty())
            .map_err(|e| CallError::Transport(e.to_string()))?;
        self.send(request, limit).await
    }

    /// `POST url` with a JSON body, decoded as `T`, all within `limit`.
    pub async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        request_id: &str,
        limit: Duration,
    ) -> Result<T, CallError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| CallError::Malformed(e.to_string()))?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(X_REQUEST_ID, request_id)
            .body(Body::from(bytes))
            .map_err(|e| CallError::Transport(e.to_string()))?;
        self.send(request, limit).await
    }

    async fn send<T: DeserializeOwned>(&self, request: Request<Body>, limit: Duration) -> Result<T, CallError> {
        deadline(limit, async {
            let response = self
                .inner
                .request(request)
                .await
                .map_err(|e| CallError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CallError::Status(status.as_u16()));
            }

            let body = Body::new(response.into_body());
            let bytes = axum::body::to_bytes(body, MAX_RESPONSE_BYTES)
                .await
                .map_err(|e| CallError::Malformed(e.to_string()))?;
            serde_json::from_slice(&bytes).map_err(|e| CallError::Malformed(e.to_string()))
        })
        .await
    }
}

impl Default for JsonClient {
    fn default() -> Self {
        Self::new()
    }
}
