//! Request ID handling.
//!
//! # Responsibilities
//! - Generate a unique request ID for every inbound request (UUID v4)
//! - Echo it back on the response
//! - Carry the dispatcher's ID on forwarded requests
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - An ID supplied by the caller is kept, not replaced

use axum::http::HeaderName;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Fresh request ID for an outbound call.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Attach set + propagate request-ID layers to a router.
pub fn with_request_id<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let header = HeaderName::from_static(X_REQUEST_ID);
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(header.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(header)),
    )
}
