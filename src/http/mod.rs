//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum fallback, tower layers, body buffering)
//!     → request.rs (buffered request, request ID)
//!     → CompiledRouter::serve on the blocking pool
//!     → response.rs (collected status, headers, body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Request, RequestIdExt, X_REQUEST_ID};
pub use response::ResponseWriter;
pub use server::HttpServer;
