//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define routing metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_selections_total` (counter): selections by routing mode and
//!   outcome (`matched`, `default`, `none`)
//! - `router_dispatch_duration_seconds` (histogram): time spent routing and
//!   handling one HTTP call, by status
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so the routing
//!   core can be used as a library without metrics
//! - Labels are static strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one route selection.
pub fn record_selection(mode: &'static str, outcome: &'static str) {
    metrics::counter!("router_selections_total", "mode" => mode, "outcome" => outcome)
        .increment(1);
}

/// Record one dispatched HTTP call.
pub fn record_dispatch(status: u16, start: Instant) {
    metrics::histogram!("router_dispatch_duration_seconds", "status" => status.to_string())
        .record(start.elapsed().as_secs_f64());
}
