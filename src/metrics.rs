//! Prometheus metrics for the gate.
//!
//! Metrics are exposed via a dedicated HTTP listener when `METRICS_PORT` is set.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `gate_requests_total` - Gate decisions (labels: outcome, reason)
//! - `gate_host_refreshes_total` - Completed hostname resolution passes
//! - `gate_host_lookup_failures_total` - Hostnames that failed to resolve to IPv4
//!
//! ## Gauges
//! - `gate_resolved_hosts` - Addresses in the current host snapshot
//!
//! # Usage
//!
//! ```rust,ignore
//! use auth_gate::metrics::{init_metrics, record_decision};
//!
//! init_metrics("0.0.0.0:9090".parse()?)?;
//! record_decision("forward", "exception");
//! ```
//!
//! Recording without an installed exporter is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "gate_requests_total";
    pub const HOST_REFRESHES_TOTAL: &str = "gate_host_refreshes_total";
    pub const HOST_LOOKUP_FAILURES_TOTAL: &str = "gate_host_lookup_failures_total";
    pub const RESOLVED_HOSTS: &str = "gate_resolved_hosts";
}

/// Initialize the Prometheus metrics exporter.
///
/// # Errors
///
/// Returns a message if the exporter cannot be installed (e.g. the port is
/// taken or a recorder is already set).
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_TOTAL,
        "Total number of gate decisions by outcome and reason"
    );
    describe_counter!(
        names::HOST_REFRESHES_TOTAL,
        "Total number of exception host resolution passes"
    );
    describe_counter!(
        names::HOST_LOOKUP_FAILURES_TOTAL,
        "Total number of exception hosts that failed to resolve"
    );
    describe_gauge!(
        names::RESOLVED_HOSTS,
        "Number of addresses in the current exception host snapshot"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record one gate decision.
///
/// `outcome` is `forward` or `challenge`; `reason` is `exception`,
/// `basic_auth` or `none`.
pub fn record_decision(outcome: &'static str, reason: &'static str) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome, "reason" => reason).increment(1);
}

/// Record a completed host refresh and the resulting snapshot size.
pub fn record_host_refresh(resolved: usize) {
    counter!(names::HOST_REFRESHES_TOTAL).increment(1);
    gauge!(names::RESOLVED_HOSTS).set(resolved as f64);
}

pub fn record_host_lookup_failure() {
    counter!(names::HOST_LOOKUP_FAILURES_TOTAL).increment(1);
}
