//! Buffered response writer.
//!
//! # Responsibilities
//! - Collect status, headers and body written by handlers
//! - Let the error renderer replace a partial response
//! - Convert into an `http::Response` for the server adapter
//!
//! # Design Decisions
//! - The status defaults to 200 on first body write, like a streaming writer
//! - Nothing reaches the client until dispatch returns, so a failed handler
//!   never leaves a half-written response behind

use std::fmt;

use axum::body::Bytes;
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status to be sent; 200 unless set.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Append to the body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes.as_ref());
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Drop the body for a `HEAD` response. `Content-Length` keeps the size
    /// the body had unless the handler already set one.
    pub fn strip_body(&mut self) {
        if !self.headers.contains_key(CONTENT_LENGTH) {
            self.headers
                .insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        self.body.clear();
    }

    /// Discard status and body, keeping headers set so far except
    /// `Content-Length`.
    pub fn reset(&mut self) {
        self.status = None;
        self.body.clear();
        self.headers.remove(CONTENT_LENGTH);
    }

    pub fn into_response(self) -> Response<Bytes> {
        let status = self.status();
        let mut response = Response::new(Bytes::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl fmt::Write for ResponseWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s);
        Ok(())
    }
}
