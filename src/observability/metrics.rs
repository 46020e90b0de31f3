//! Metrics collection and exposition.
//!
//! # Metrics
//! - `blockweb_requests_total` (counter): completed requests by method, status
//! - `blockweb_unsupported_method_total` (counter): requests hung up on
//! - `blockweb_connections_total` (counter): accepted connections
//!
//! Updates are no-ops until a recorder is installed, so the parser can record
//! unconditionally.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "blockweb_requests_total";
pub const UNSUPPORTED_METHOD_TOTAL: &str = "blockweb_unsupported_method_total";
pub const CONNECTIONS_TOTAL: &str = "blockweb_connections_total";

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16) {
    ::metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_unsupported_method() {
    ::metrics::counter!(UNSUPPORTED_METHOD_TOTAL).increment(1);
}

pub fn record_connection() {
    ::metrics::counter!(CONNECTIONS_TOTAL).increment(1);
}
