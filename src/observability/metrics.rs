//! Metrics collection and exposition.
//!
//! # Metrics
//! - `devproxy_requests_total` (counter): requests by method, status, resource path
//! - `devproxy_request_duration_seconds` (histogram): end-to-end latency
//! - `devproxy_reloads_total` (counter): reload attempts by outcome
//! - `devproxy_handler_generation` (gauge): generation currently served

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one answered request.
pub fn record_request(method: &str, status: u16, resource_path: &str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    let resource_path = resource_path.to_string();

    metrics::counter!(
        "devproxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "resource_path" => resource_path.clone()
    )
    .increment(1);
    metrics::histogram!(
        "devproxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "resource_path" => resource_path
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a reload attempt; `generation` is only meaningful on success.
pub fn record_reload(success: bool, generation: u64) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("devproxy_reloads_total", "outcome" => outcome).increment(1);
    if success {
        metrics::gauge!("devproxy_handler_generation").set(generation as f64);
    }
}
