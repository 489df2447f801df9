//! Metrics collection.
//!
//! # Responsibilities
//! - Define proxy metrics (latency, attempts, breaker trips)
//! - Record through the `metrics` facade; whichever recorder the host
//!   process installs receives them
//!
//! # Metrics
//! - `hsp_request_duration_seconds` (histogram): business method latency by method, error
//! - `hsp_proxy_attempts_total` (counter): outbound attempts by instance, outcome
//! - `hsp_proxy_breaker_open_total` (counter): circuit openings by instance
//!
//! # Design Decisions
//! - No exporter is installed here; without a recorder every call is a no-op
//! - Labels are low-cardinality: method names, instance addresses, fixed outcomes

use std::time::Instant;

/// Record the duration of one business method call.
pub fn record_request(method: &'static str, failed: bool, start_time: Instant) {
    let duration = start_time.elapsed().as_secs_f64();
    let error = if failed { "true" } else { "false" };

    ::metrics::histogram!("hsp_request_duration_seconds", "method" => method, "error" => error).record(duration);
}

/// Record one outbound attempt and how it ended.
pub fn record_attempt(instance: &str, outcome: &'static str) {
    ::metrics::counter!(
        "hsp_proxy_attempts_total",
        "instance" => instance.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a circuit opening.
pub fn record_breaker_open(instance: &str) {
    ::metrics::counter!("hsp_proxy_breaker_open_total", "instance" => instance.to_string()).increment(1);
}
