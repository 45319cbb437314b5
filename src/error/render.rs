//! Failure → response rendering.
//!
//! # Responsibilities
//! - Pick text or JSON from the request's `Accept` header
//! - Write status, merged error headers and a descriptive body
//!
//! # Design Decisions
//! - Error headers never override `Content-Type` or `X-Content-Type-Options`
//! - Serialization failure falls back to the text body; rendering never panics

use std::fmt::Write as _;

use axum::http::header::{ACCEPT, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{error_text, Error, Frame};
use crate::http::{Request, ResponseWriter};

/// Error body format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// What the renderer reveals about a failure.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub expose_stack: bool,
    pub expose_causes: bool,
    /// Used when `Accept` is absent or only has wildcards.
    pub default_format: Format,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            expose_stack: true,
            expose_causes: true,
            default_format: Format::Text,
        }
    }
}

/// Choose a body format from an `Accept` header value.
pub fn negotiate(accept: Option<&str>, default: Format) -> Format {
    let Some(accept) = accept else {
        return default;
    };

    let mut best: Option<(Format, f32)> = None;
    for item in accept.split(',') {
        let mut parts = item.split(';');
        let media = parts.next().unwrap_or_default().trim();
        let quality = parts
            .filter_map(|param| param.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if quality <= 0.0 {
            continue;
        }

        let format = match media {
            "application/json" | "application/*" => Format::Json,
            "text/plain" | "text/*" => Format::Text,
            "*/*" => default,
            _ => continue,
        };
        if best.map_or(true, |(_, q)| quality > q) {
            best = Some((format, quality));
        }
    }

    best.map_or(default, |(format, _)| format)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDescriptor<'a> {
    status_code: u16,
    status_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fatal: Option<&'a str>,
    #[serde(rename = "error", skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    stack: &'a [Frame],
}

impl<'a> ErrorDescriptor<'a> {
    fn new(err: &'a Error, options: &RenderOptions) -> Self {
        let status = err.status();
        let (fatal, stack): (Option<&str>, &[Frame]) = match err {
            Error::Panic(panic) => (Some(panic.message()), panic.stack()),
            _ => (None, &[]),
        };

        let mut errors = Vec::new();
        if let Error::Http(http) = err {
            errors.extend(http.details().iter().cloned());
        }
        if options.expose_causes {
            errors.extend(err.causes());
        }

        Self {
            status_code: status.as_u16(),
            status_message: error_text(status),
            fatal,
            errors,
            stack: if options.expose_stack { stack } else { &[] },
        }
    }

    fn to_text(&self) -> String {
        let mut text = self.status_message.clone();
        text.push('\n');

        if let Some(fatal) = self.fatal {
            let _ = write!(text, "\npanic: {fatal}\n");
        }
        if !self.errors.is_empty() {
            text.push('\n');
            for (index, error) in self.errors.iter().enumerate() {
                let _ = writeln!(text, "{index}. {error}");
            }
        }
        if !self.stack.is_empty() {
            text.push('\n');
            for frame in self.stack {
                let _ = writeln!(text, "{frame}");
            }
        }
        text
    }
}

/// Replace whatever the handler wrote with a rendering of `err`.
pub fn render_error(err: &Error, req: &Request, res: &mut ResponseWriter, options: &RenderOptions) {
    res.reset();

    for (name, value) in err.response_headers().iter() {
        if name == CONTENT_TYPE || name == X_CONTENT_TYPE_OPTIONS {
            continue;
        }
        res.headers_mut().append(name.clone(), value.clone());
    }

    let status = err.status();
    if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        res.set_status(status);
        return;
    }

    res.set_status(status);
    res.set_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    let descriptor = ErrorDescriptor::new(err, options);
    let accept = req.headers().get(ACCEPT).and_then(|value| value.to_str().ok());

    if negotiate(accept, options.default_format) == Format::Json {
        match serde_json::to_vec_pretty(&descriptor) {
            Ok(body) => {
                res.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res.write(body);
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize error body, falling back to text");
            }
        }
    }

    res.set_header(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    res.write(descriptor.to_text());
}
