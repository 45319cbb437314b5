//! Handlers, middleware and route nodes.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Handler / Middleware values
//!     → node.rs (Raw: target + middleware chain)
//!     → method.rs (per-method entries, catch-all)
//!
//! Compile (once, from RouteBuilder::build):
//!     node.rs folds the chain around its target
//!     → one Handler per node
//! ```
//!
//! # Design Decisions
//! - Handlers are tagged values: fallible closures, writer-only closures,
//!   or any `Serve` implementation (a compiled router mounts this way)
//! - First-registered middleware is outermost

pub mod method;
pub mod middleware;
pub mod node;

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::context::RoutingContext;
use crate::error::{Error, HttpError};
use crate::http::{Request, ResponseWriter};

pub use method::MethodHandler;
pub use middleware::{compile_chain, Middleware};
pub use node::{CompiledNode, Node, NodeKind};

pub type HandlerResult = Result<(), Error>;

/// Anything that can answer a routed request.
pub trait Serve: Send + Sync {
    fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult;
}

type WriterFn = dyn Fn(&Request, &RoutingContext, &mut ResponseWriter) + Send + Sync;

/// A request handler.
#[derive(Clone)]
pub enum Handler {
    /// Reports failures through its result.
    Fallible(Arc<dyn Serve>),
    /// Only writes to the response; always succeeds.
    Writer(Arc<WriterFn>),
}

struct FnHandler<F>(F);

impl<F> Serve for FnHandler<F>
where
    F: Fn(&Request, &RoutingContext, &mut ResponseWriter) -> HandlerResult + Send + Sync,
{
    fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        (self.0)(req, cx, res)
    }
}

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request, &RoutingContext, &mut ResponseWriter) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Fallible(Arc::new(FnHandler(f)))
    }

    pub fn writer<F>(f: F) -> Self
    where
        F: Fn(&Request, &RoutingContext, &mut ResponseWriter) + Send + Sync + 'static,
    {
        Handler::Writer(Arc::new(f))
    }

    pub fn from_serve<S>(serve: S) -> Self
    where
        S: Serve + 'static,
    {
        Handler::Fallible(Arc::new(serve))
    }

    /// Handler that always fails with `status`.
    pub fn status(status: StatusCode) -> Self {
        Handler::new(move |_, _, _| Err(HttpError::new(status).into()))
    }

    pub fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        match self {
            Handler::Fallible(serve) => serve.try_serve(req, cx, res),
            Handler::Writer(write) => {
                write(req, cx, res);
                Ok(())
            }
        }
    }
}

impl Serve for Handler {
    fn try_serve(&self, req: &Request, cx: &RoutingContext, res: &mut ResponseWriter) -> HandlerResult {
        Handler::try_serve(self, req, cx, res)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Fallible(_) => f.write_str("Handler::Fallible"),
            Handler::Writer(_) => f.write_str("Handler::Writer"),
        }
    }
}
