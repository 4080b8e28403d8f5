//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define balancer metrics (requests, attempts, breaker transitions, probes)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-backend and aggregate metrics
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by outcome, status
//! - `lb_request_duration_seconds` (histogram): latency by outcome
//! - `lb_attempts_total` (counter): attempts by backend, result
//! - `lb_breaker_transitions_total` (counter): transitions by backend, target state
//! - `lb_health_probes_total` (counter): probes by backend, result
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels for outcome, backend, status code
//! - Histogram buckets tuned for typical web latencies

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(LATENCY_BUCKETS)?
        .install()?;

    describe_counter!("lb_requests_total", "Client requests by outcome and status");
    describe_histogram!("lb_request_duration_seconds", "Client request latency in seconds");
    describe_counter!("lb_attempts_total", "Forward attempts by backend and result");
    describe_counter!(
        "lb_breaker_transitions_total",
        "Circuit breaker transitions by backend and target state"
    );
    describe_counter!("lb_health_probes_total", "Health probes by backend and result");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished client request.
pub fn record_request(outcome: &'static str, status: u16, start_time: Instant) {
    counter!(
        "lb_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("lb_request_duration_seconds", "outcome" => outcome)
        .record(start_time.elapsed().as_secs_f64());
}

/// Record one forward attempt against `backend`.
pub fn record_attempt(backend: &str, result: &'static str) {
    counter!(
        "lb_attempts_total",
        "backend" => backend.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Record a breaker moving into `state`.
pub fn record_breaker_transition(backend: &str, state: CircuitState) {
    counter!(
        "lb_breaker_transitions_total",
        "backend" => backend.to_string(),
        "state" => state.as_str()
    )
    .increment(1);
}

/// Record one health probe against `backend`.
pub fn record_probe(backend: &str, healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    counter!(
        "lb_health_probes_total",
        "backend" => backend.to_string(),
        "result" => result
    )
    .increment(1);
}
