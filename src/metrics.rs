//! Prometheus metrics for admission-control observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (default port 9090,
//! `METRICS_PORT=0` disables it).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `mirrorview_requests_admitted_total` - Requests admitted past the rate
//!   limiter (label: route)
//! - `mirrorview_requests_denied_total` - Requests denied by the admission
//!   layer (labels: route, reason = `rate_limited` | `payload_too_large` |
//!   `store_fault`)

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_ADMITTED_TOTAL: &str = "mirrorview_requests_admitted_total";
    pub const REQUESTS_DENIED_TOTAL: &str = "mirrorview_requests_denied_total";
}

/// Denial reason labels.
pub mod reasons {
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const STORE_FAULT: &str = "store_fault";
}

/// Initialize the Prometheus metrics exporter.
///
/// Sets up metric descriptions and starts the Prometheus HTTP listener on the
/// specified address.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_ADMITTED_TOTAL,
        "Total requests admitted past the rate limiter"
    );
    describe_counter!(
        names::REQUESTS_DENIED_TOTAL,
        "Total requests denied by the admission layer"
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

/// Record a request admitted past the rate limiter.
pub fn record_admitted(route: &str) {
    counter!(names::REQUESTS_ADMITTED_TOTAL, "route" => route.to_string()).increment(1);
}

/// Record a request denied by the rate limiter.
pub fn record_rate_limited(route: &str) {
    counter!(names::REQUESTS_DENIED_TOTAL, "route" => route.to_string(), "reason" => reasons::RATE_LIMITED)
        .increment(1);
}

/// Record a request denied by the body size guard.
pub fn record_payload_too_large(route: &str) {
    counter!(names::REQUESTS_DENIED_TOTAL, "route" => route.to_string(), "reason" => reasons::PAYLOAD_TOO_LARGE)
        .increment(1);
}

/// Record a fail-closed denial caused by a counter store fault.
pub fn record_store_fault(route: &str) {
    counter!(names::REQUESTS_DENIED_TOTAL, "route" => route.to_string(), "reason" => reasons::STORE_FAULT)
        .increment(1);
}
