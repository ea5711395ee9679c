//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rate_limited_total` (counter): rejections by route
//! - `gateway_rate_limit_sweeps_total` (counter)
//! - `gateway_rate_limit_evicted_clients_total` (counter)
//! - `gateway_rate_limit_tracked_clients` (gauge)
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a request forwarded upstream.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_owned(),
        "status" => status.to_string(),
        "route" => route.to_owned()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_owned())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that matched no route.
pub fn record_unmatched(method: &str) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_owned(),
        "status" => "404",
        "route" => "none"
    )
    .increment(1);
}

/// Record a rate limit rejection.
pub fn record_rate_limited(route: &str) {
    counter!("gateway_rate_limited_total", "route" => route.to_owned()).increment(1);
}

/// Record a registry sweep.
pub fn record_sweep(evicted: usize, remaining: usize) {
    counter!("gateway_rate_limit_sweeps_total").increment(1);
    counter!("gateway_rate_limit_evicted_clients_total").increment(evicted as u64);
    record_tracked_clients(remaining);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("gateway_rate_limit_tracked_clients").set(count as f64);
}
