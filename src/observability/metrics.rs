//! Metrics registry and the names recorded across the control plane.
//!
//! # Metrics
//! - `http_requests_total` (counter): by method, matched route, status
//! - `http_request_duration_seconds` (histogram): by method, matched route
//! - `drain_rejections_total` (counter): requests refused while draining
//! - `auth_failures_total` (counter): unresolved identities, by outcome
//! - `auth_forbidden_total` (counter): resolved identities below the route's role
//! - `auth_cache_requests_total` (counter): cached introspection, by hit/miss
//! - `remote_read_requests_total` (counter): proxied queries, by upstream status

use std::sync::OnceLock;
use std::time::Instant;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the process-wide Prometheus recorder and return its handle.
///
/// Idempotent. When another recorder is already installed the returned
/// handle renders an empty registry instead of failing.
pub fn install_recorder() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(error = %e, "Metrics recorder already installed");
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_drain_rejection(route: &str) {
    metrics::counter!("drain_rejections_total", "route" => route.to_string()).increment(1);
}

pub fn record_auth_failure(outcome: &'static str) {
    metrics::counter!("auth_failures_total", "outcome" => outcome).increment(1);
}

pub fn record_forbidden() {
    metrics::counter!("auth_forbidden_total").increment(1);
}

pub fn record_auth_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("auth_cache_requests_total", "result" => result).increment(1);
}

pub fn record_remote_read(status: u16) {
    metrics::counter!("remote_read_requests_total", "status" => status.to_string()).increment(1);
}
