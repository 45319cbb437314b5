//! Redirects expressed as handler failures.

use axum::http::StatusCode;
use thiserror::Error;

/// Ends dispatch with a 3xx status and a `Location` header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status} to {location:?}")]
pub struct Redirect {
    status: StatusCode,
    location: String,
}

impl Redirect {
    /// Redirect with an explicit status; anything other than a redirection
    /// status is replaced by 307.
    pub fn new(status: StatusCode, location: impl Into<String>) -> Self {
        let status = if status.is_redirection() && status != StatusCode::NOT_MODIFIED {
            status
        } else {
            StatusCode::TEMPORARY_REDIRECT
        };
        Self {
            status,
            location: location.into(),
        }
    }

    /// 301
    pub fn moved_permanently(location: impl Into<String>) -> Self {
        Self::new(StatusCode::MOVED_PERMANENTLY, location)
    }

    /// 302
    pub fn found(location: impl Into<String>) -> Self {
        Self::new(StatusCode::FOUND, location)
    }

    /// 303
    pub fn see_other(location: impl Into<String>) -> Self {
        Self::new(StatusCode::SEE_OTHER, location)
    }

    /// 307
    pub fn temporary(location: impl Into<String>) -> Self {
        Self::new(StatusCode::TEMPORARY_REDIRECT, location)
    }

    /// 308, method and body preserved.
    pub fn permanent(location: impl Into<String>) -> Self {
        Self::new(StatusCode::PERMANENT_REDIRECT, location)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}
