//! Nested HTTP path router.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     RouteBuilder::handle/method/route/with
//!         → pattern (DSL → literal key or regex)
//!         → handler::Node (raw: handlers + middleware)
//!     RouteBuilder::build
//!         → Node::compile (middleware folded, method tables frozen)
//!         → routing::Resolver (trie + ordered regex list)
//!         → CompiledRouter (immutable, shared via Arc)
//!
//! Request:
//!     CompiledRouter::serve
//!         → error::recover (panic boundary)
//!         → router middleware → Resolver::resolve
//!         → RoutingContext::step → node handler (→ nested router ...)
//!         → Outcome → error::render
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod observability;
pub mod pattern;
pub mod router;
pub mod routing;

pub use config::RouterConfig;
pub use context::{ParamValue, RouteParams, RoutingContext};
pub use error::{Error, HttpError, Outcome, PanicError, Redirect};
pub use handler::{Handler, HandlerResult, Middleware, Serve};
pub use http::{HttpServer, Request, ResponseWriter};
pub use pattern::{Pattern, PatternError};
pub use router::{CompiledRouter, RouteBuilder, RouteError};
