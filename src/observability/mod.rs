//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router dispatch and server adapter produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (request counters, latency histogram, panic counter)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the server layer into dispatch log events
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
