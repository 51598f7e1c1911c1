//! Metrics collection and exposition.
//!
//! # Metrics
//! - `echo_gate_connections_accepted_total` (counter): admitted connections
//! - `echo_gate_connections_rejected_total` (counter): refused, gate full
//! - `echo_gate_accept_errors_total` (counter): transient accept failures
//! - `echo_gate_active_connections` (gauge): slots currently held
//! - `echo_gate_bytes_echoed_total` (counter): bytes written back to clients
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus exporter, serving scrapes on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_accepted() {
    counter!("echo_gate_connections_accepted_total").increment(1);
}

pub fn record_rejected() {
    counter!("echo_gate_connections_rejected_total").increment(1);
}

pub fn record_accept_error() {
    counter!("echo_gate_accept_errors_total").increment(1);
}

pub fn set_active_connections(active: usize) {
    gauge!("echo_gate_active_connections").set(active as f64);
}

pub fn record_bytes_echoed(bytes: usize) {
    counter!("echo_gate_bytes_echoed_total").increment(bytes as u64);
}
