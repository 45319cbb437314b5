//! Router façade.
//!
//! # Data Flow
//! ```text
//! RouteBuilder (mutable, one thread)
//!     handle / method / route / mount / with / use_middleware
//!     → build()
//! CompiledRouter (immutable, Arc, Send + Sync)
//!     serve(request)
//!     → recover → router middleware → resolve → step → node handler
//!     → render failures
//! ```
//!
//! # Design Decisions
//! - Registration and dispatch are separate types; there is no
//!   compile-on-first-request
//! - A compiled router is itself a `Serve`, so routers nest by mounting

mod builder;
mod compiled;

use thiserror::Error;

use crate::pattern::PatternError;

pub use builder::{Chain, RouteBuilder};
pub use compiled::CompiledRouter;

/// Registration rejected by a router.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("route {pattern:?} already holds a {existing}, can't register a {requested}")]
    Conflict {
        pattern: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("route {0:?} is not a mount point (expected a trailing \"/*\")")]
    NotMount(String),
}
