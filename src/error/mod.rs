//! Error and panic bridge.
//!
//! # Data Flow
//! ```text
//! handler returns Err(Error)  ─┐
//! handler panics              ─┼→ recover.rs (catch_unwind boundary, stack snapshot)
//!                              │      → Outcome: Served | Failed | Redirect | Panicked
//!                              └→ render.rs (status, Location/Allow, text or JSON body)
//! ```
//!
//! # Design Decisions
//! - Failures are values (`Result<(), Error>`); unwinding is only caught at
//!   recovery boundaries
//! - A panic carrying one of these error values keeps its status
//! - Rendering never panics

pub mod recover;
pub mod redirect;
pub mod render;

use std::fmt;

use axum::http::header::{ALLOW, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use thiserror::Error as ThisError;

pub use recover::{recover, Frame, PanicError};
pub use redirect::Redirect;
pub use render::{negotiate, render_error, Format, RenderOptions};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a handler can fail.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Redirect(#[from] Redirect),

    #[error(transparent)]
    MethodNotAllowed(#[from] MethodNotAllowed),

    #[error(transparent)]
    Panic(#[from] PanicError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Http(err) => err.status(),
            Error::Redirect(redirect) => redirect.status(),
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found() -> Self {
        HttpError::new(StatusCode::NOT_FOUND).into()
    }

    /// 404 raised by a router whose table has no route for the path.
    pub(crate) fn route_miss() -> Self {
        let mut err = HttpError::not_found();
        err.route_miss = true;
        err.into()
    }

    /// Whether no route matched, as opposed to a handler answering 404.
    pub fn is_route_miss(&self) -> bool {
        matches!(self, Error::Http(err) if err.route_miss)
    }

    /// Headers the response must carry for this failure.
    pub fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            Error::Http(err) => headers.clone_from(err.headers()),
            Error::Redirect(redirect) => {
                if let Ok(value) = HeaderValue::from_str(redirect.location()) {
                    headers.insert(LOCATION, value);
                } else {
                    tracing::warn!(location = %redirect.location(), "redirect location is not a valid header value");
                }
            }
            Error::MethodNotAllowed(err) => {
                if let Ok(value) = HeaderValue::from_str(err.allow()) {
                    headers.insert(ALLOW, value);
                }
            }
            Error::Panic(_) => {}
        }
        headers
    }

    /// Messages of the source chain, outermost first.
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }
        causes
    }
}

impl From<BoxError> for Error {
    fn from(err: BoxError) -> Self {
        HttpError::internal(err).into()
    }
}

/// `"<reason> (Error N)"` for error statuses, the bare reason otherwise.
pub fn error_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        None => format!("Unknown Error {}", status.as_u16()),
        Some(reason) if status.as_u16() >= 400 => format!("{reason} (Error {})", status.as_u16()),
        Some(reason) => reason.to_string(),
    }
}

/// Application failure with a caller-chosen status.
pub struct HttpError {
    status: StatusCode,
    headers: HeaderMap,
    details: Vec<String>,
    source: Option<BoxError>,
    route_miss: bool,
}

impl HttpError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            details: Vec::new(),
            source: None,
            route_miss: false,
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).with_detail(detail)
    }

    /// 500 wrapping an underlying failure.
    pub fn internal(source: impl Into<BoxError>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_source(source)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&error_text(self.status))
    }
}

impl fmt::Debug for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpError")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("details", &self.details)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .finish()
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// Request method not served by a method table.
#[derive(Debug, Clone, ThisError)]
#[error("Method Not Allowed (Error 405): {method}")]
pub struct MethodNotAllowed {
    method: Method,
    allow: String,
}

impl MethodNotAllowed {
    pub fn new(method: Method, allow: impl Into<String>) -> Self {
        Self {
            method,
            allow: allow.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Value of the `Allow` header.
    pub fn allow(&self) -> &str {
        &self.allow
    }
}

/// Normalized result of one dispatch.
#[derive(Debug)]
pub enum Outcome {
    /// The handler wrote its own response.
    Served,
    Failed(Error),
    Redirect(Redirect),
    Panicked(PanicError),
}

impl From<Result<(), Error>> for Outcome {
    fn from(result: Result<(), Error>) -> Self {
        match result {
            Ok(()) => Outcome::Served,
            Err(Error::Redirect(redirect)) => Outcome::Redirect(redirect),
            Err(Error::Panic(panic)) => Outcome::Panicked(panic),
            Err(err) => Outcome::Failed(err),
        }
    }
}

impl Outcome {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Served => "served",
            Outcome::Failed(_) => "failed",
            Outcome::Redirect(_) => "redirect",
            Outcome::Panicked(_) => "panicked",
        }
    }

    /// The failure to render, if any.
    pub fn into_error(self) -> Option<Error> {
        match self {
            Outcome::Served => None,
            Outcome::Failed(err) => Some(err),
            Outcome::Redirect(redirect) => Some(Error::Redirect(redirect)),
            Outcome::Panicked(panic) => Some(Error::Panic(panic)),
        }
    }
}
