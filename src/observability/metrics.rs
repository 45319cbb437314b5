//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pathmux_requests_total` (counter): requests by method, status, outcome
//! - `pathmux_request_duration_seconds` (histogram): dispatch latency
//! - `pathmux_panics_total` (counter): handler panics caught at the boundary

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, started: Instant) {
    counter!(
        "pathmux_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("pathmux_request_duration_seconds", "method" => method.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_panic() {
    counter!("pathmux_panics_total").increment(1);
}
