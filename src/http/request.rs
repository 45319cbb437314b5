//! Request type seen by handlers.
//!
//! # Responsibilities
//! - Fix the request body representation for the synchronous core
//! - Expose the request ID assigned by the server adapter
//!
//! # Design Decisions
//! - Bodies are buffered to `Bytes` before dispatch so handlers never block
//!   on the network
//! - Request ID added as early as possible for tracing

use axum::body::Bytes;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Fully buffered HTTP request.
pub type Request = axum::http::Request<Bytes>;

/// Access to the correlation ID set by the request-id layer.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl<B> RequestIdExt for axum::http::Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers()
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
    }
}
