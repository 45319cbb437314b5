//! Panic recovery boundary.
//!
//! # Responsibilities
//! - Run a dispatch under `catch_unwind`
//! - Hand typed errors carried by a panic (`Error`, `HttpError`, `Redirect`,
//!   `MethodNotAllowed`) back unchanged
//! - Snapshot the stack of any other panic for rendering
//!
//! # Design Decisions
//! - One process-wide panic hook, installed on first use; it only records a
//!   backtrace while the panicking thread is inside a boundary and defers to
//!   the previous hook otherwise
//! - Frames of the unwinding machinery are trimmed from the snapshot

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use serde::Serialize;

use crate::error::{BoxError, Error, HttpError, MethodNotAllowed, Redirect};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Vec<Frame>>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Run `f`, converting a panic into an `Error`.
pub fn recover<F>(f: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error>,
{
    install_hook();

    let result = {
        let _boundary = Boundary::enter();
        panic::catch_unwind(AssertUnwindSafe(f))
    };

    match result {
        Ok(result) => result,
        Err(payload) => {
            let stack = CAPTURED.with(|captured| captured.borrow_mut().take());
            Err(from_payload(payload, stack.unwrap_or_default()))
        }
    }
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if DEPTH.with(Cell::get) > 0 {
                let frames = trim_frames(parse_frames(&Backtrace::force_capture().to_string()));
                CAPTURED.with(|captured| *captured.borrow_mut() = Some(frames));
            } else {
                previous(info);
            }
        }));
    });
}

struct Boundary;

impl Boundary {
    fn enter() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Boundary
    }
}

impl Drop for Boundary {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

fn from_payload(payload: Box<dyn Any + Send>, stack: Vec<Frame>) -> Error {
    let payload = match payload.downcast::<Error>() {
        Ok(err) => return *err,
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<HttpError>() {
        Ok(err) => return Error::Http(*err),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<Redirect>() {
        Ok(redirect) => return Error::Redirect(*redirect),
        Err(payload) => payload,
    };
    let payload = match payload.downcast::<MethodNotAllowed>() {
        Ok(err) => return Error::MethodNotAllowed(*err),
        Err(payload) => payload,
    };
    Error::Panic(PanicError::new(payload, stack))
}

/// One frame of a recovered panic's stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}\n\t{location}", self.function),
            None => f.write_str(&self.function),
        }
    }
}

/// Parse the `Display` form of a `std::backtrace::Backtrace`.
fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                frame.location.get_or_insert_with(|| location.to_string());
            }
        } else if let Some((index, function)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push(Frame {
                    function: function.to_string(),
                    location: None,
                });
            }
        }
    }

    frames
}

/// Drop the capture/unwind frames above the panic site and the recovery
/// boundary with everything below it.
fn trim_frames(frames: Vec<Frame>) -> Vec<Frame> {
    let start = frames
        .iter()
        .position(|frame| !is_panic_machinery(&frame.function))
        .unwrap_or(frames.len());
    let end = frames[start..]
        .iter()
        .position(|frame| is_boundary(&frame.function))
        .map_or(frames.len(), |offset| start + offset);

    frames[start..end].to_vec()
}

fn is_panic_machinery(function: &str) -> bool {
    const PREFIXES: [&str; 8] = [
        "std::",
        "core::",
        "alloc::",
        "<std::",
        "<core::",
        "<alloc::",
        "rust_begin_unwind",
        "__rust",
    ];
    PREFIXES.iter().any(|prefix| function.starts_with(prefix))
        || function.contains("recover::install_hook")
}

fn is_boundary(function: &str) -> bool {
    function.contains("panicking::try")
        || function.contains("panicking::catch_unwind")
        || function.contains("panic::catch_unwind")
        || function.contains("error::recover::recover")
}

/// A panic that carried no router error value. Renders as 500.
pub struct PanicError {
    message: String,
    payload: Option<Box<dyn Any + Send>>,
    cause: Option<BoxError>,
    stack: Vec<Frame>,
}

impl PanicError {
    fn new(payload: Box<dyn Any + Send>, stack: Vec<Frame>) -> Self {
        let payload = match payload.downcast::<BoxError>() {
            Ok(cause) => {
                return Self {
                    message: cause.to_string(),
                    payload: None,
                    cause: Some(*cause),
                    stack,
                }
            }
            Err(payload) => payload,
        };

        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        Self {
            message,
            payload: Some(payload),
            cause: None,
            stack,
        }
    }

    /// Panic message, or the cause's message for error payloads.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The original panic value, unless it was a boxed error.
    pub fn payload(&self) -> Option<&(dyn Any + Send)> {
        self.payload.as_deref()
    }

    /// The boxed error the panic carried, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync)> {
        self.cause.as_deref()
    }

    pub fn stack(&self) -> &[Frame] {
        &self.stack
    }
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

impl fmt::Debug for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanicError")
            .field("message", &self.message)
            .field("frames", &self.stack.len())
            .finish()
    }
}

impl std::error::Error for PanicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_ok_passes_through() {
        assert!(recover(|| Ok(())).is_ok());
        let err = recover(|| Err(Error::not_found())).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_panic_with_http_error_keeps_status() {
        let err = recover(|| std::panic::panic_any(HttpError::new(StatusCode::CONFLICT))).unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_panic_with_redirect() {
        let err = recover(|| std::panic::panic_any(Redirect::see_other("/login"))).unwrap_err();
        assert_eq!(err.status(), StatusCode::SEE_OTHER);
    }

    #[test]
    fn test_panic_with_method_not_allowed() {
        let err = recover(|| {
            std::panic::panic_any(MethodNotAllowed::new(Method::PUT, "GET, HEAD, OPTIONS"))
        })
        .unwrap_err();
        let Error::MethodNotAllowed(err) = err else {
            panic!("expected a 405 error");
        };
        assert_eq!(*err.method(), Method::PUT);
        assert_eq!(err.allow(), "GET, HEAD, OPTIONS");
    }

    #[test]
    fn test_panic_with_message() {
        let err = recover(|| panic!("boom {}", 7)).unwrap_err();
        let Error::Panic(panic) = err else {
            panic!("expected a panic error");
        };
        assert_eq!(panic.message(), "boom 7");
        assert!(panic.cause().is_none());
        assert!(panic.payload().is_some());
        assert_eq!(panic.to_string(), "panic: boom 7");
    }

    #[test]
    fn test_panic_with_boxed_error() {
        let err = recover(|| {
            let cause: BoxError = "disk full".into();
            std::panic::panic_any(cause)
        })
        .unwrap_err();
        let Error::Panic(panic) = err else {
            panic!("expected a panic error");
        };
        assert_eq!(panic.message(), "disk full");
        assert_eq!(panic.cause().map(|c| c.to_string()), Some("disk full".into()));
    }

    #[test]
    fn test_nested_boundaries() {
        let err = recover(|| {
            let inner = recover(|| panic!("inner"));
            assert!(inner.is_err());
            Err(Error::not_found())
        })
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_stack_excludes_machinery() {
        let err = recover(|| panic!("trace me")).unwrap_err();
        let Error::Panic(panic) = err else {
            panic!("expected a panic error");
        };
        for frame in panic.stack() {
            assert!(!frame.function.starts_with("std::panicking"), "{frame}");
            assert!(!frame.function.contains("rust_begin_unwind"), "{frame}");
            assert!(!frame.function.contains("install_hook"), "{frame}");
        }
    }

    #[test]
    fn test_parse_and_trim_frames() {
        let text = "\
   0: std::backtrace::Backtrace::force_capture
             at /rustc/library/std/src/backtrace.rs:312:9
   1: pathmux::error::recover::install_hook::{{closure}}
   2: std::panicking::rust_panic_with_hook
   3: app::handlers::create_user
             at ./src/handlers.rs:10:5
   4: pathmux::handler::middleware::logger::{{closure}}
   5: std::panicking::try
   6: main
";
        let frames = trim_frames(parse_frames(text));
        assert_eq!(
            frames,
            vec![
                Frame {
                    function: "app::handlers::create_user".into(),
                    location: Some("./src/handlers.rs:10:5".into()),
                },
                Frame {
                    function: "pathmux::handler::middleware::logger::{{closure}}".into(),
                    location: None,
                },
            ]
        );
    }
}
