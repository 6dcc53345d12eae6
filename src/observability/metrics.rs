//! Metrics collection and exposition.
//!
//! # Metrics
//! - `authcore_requests_total` (counter): requests by method, status
//! - `authcore_request_duration_seconds` (histogram): end-to-end latency
//! - `authcore_worker_slots_available` (gauge): free worker slots
//! - `authcore_worker_slot_wait_seconds` (histogram): time queued for a slot
//! - `authcore_lifecycle_events_total` (counter): transitions by state
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is opt-in

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    counter!(
        "authcore_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("authcore_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_slot_wait(waited: Duration) {
    histogram!("authcore_worker_slot_wait_seconds").record(waited.as_secs_f64());
}

pub fn record_slots_available(available: usize) {
    gauge!("authcore_worker_slots_available").set(available as f64);
}

pub fn record_lifecycle_event(state: &'static str) {
    counter!("authcore_lifecycle_events_total", "state" => state).increment(1);
}
