//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_fallbacks_total` (counter): fallback responses by route, reason
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half_open, 2=open
//! - `gateway_registry_lookups_total` (counter): lookups by service, outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Unmatched requests are labelled with route `none`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fallback(route: &str, reason: &'static str) {
    metrics::counter!(
        "gateway_fallbacks_total",
        "route" => route.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    metrics::gauge!("gateway_breaker_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}

pub fn record_registry_lookup(service: &str, outcome: &'static str) {
    metrics::counter!(
        "gateway_registry_lookups_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
