//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (qps > 0, attempts >= 1, durations > 0)
//! - Check every configured instance resolves to a URL
//! - Check bind addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::proxy::instance::parse_instances;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, addr) in [
        ("listener.bind_address", &config.listener.bind_address),
        ("listener.upstream_bind_address", &config.listener.upstream_bind_address),
    ] {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(field, format!("'{}' is not a socket address", addr)));
        }
    }

    let upstream = &config.upstream;
    if upstream.qps == 0 {
        errors.push(ValidationError::new("upstream.qps", "must be greater than 0"));
    }
    if upstream.request_timeout_ms == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_ms", "must be greater than 0"));
    }
    if !upstream.default_path.starts_with('/') {
        errors.push(ValidationError::new("upstream.default_path", "must start with '/'"));
    }
    for instance in parse_instances(&upstream.instances) {
        if let Err(e) = instance.resolve(&upstream.default_path) {
            errors.push(ValidationError::new("upstream.instances", e.to_string()));
        }
    }

    if config.breaker.cool_down_secs == 0 {
        errors.push(ValidationError::new("breaker.cool_down_secs", "must be greater than 0"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.max_elapsed_ms == 0 {
        errors.push(ValidationError::new("retries.max_elapsed_ms", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
