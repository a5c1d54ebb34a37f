//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_requests_total` (counter): requests by method and status
//! - `shield_request_duration_seconds` (histogram): end-to-end latency by method
//! - `shield_threats_blocked_total` (counter): blocked requests by category
//! - `shield_rate_limited_total` (counter): rate limit denials
//! - `shield_faults_total` (counter): translated faults by kind

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `addr`. Requires a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "shield_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("shield_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_threat(category: &'static str) {
    metrics::counter!("shield_threats_blocked_total", "category" => category).increment(1);
}

pub fn record_rate_limited() {
    metrics::counter!("shield_rate_limited_total").increment(1);
}

pub fn record_fault(kind: &'static str) {
    metrics::counter!("shield_faults_total", "kind" => kind).increment(1);
}

/// Middleware recording request count and latency.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}
