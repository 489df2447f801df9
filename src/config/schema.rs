//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the hotel supply proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (business and upstream-facing addresses).
    pub listener: ListenerConfig,

    /// Upstream instances the business endpoint proxies to.
    pub upstream: UpstreamConfig,

    /// Per-instance circuit breaker settings.
    pub breaker: BreakerConfig,

    /// Retry budget per proxied call.
    pub retries: RetryConfig,

    /// Inbound HTTP timeouts.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Business endpoint bind address (`/rate_breakdown`).
    pub bind_address: String,

    /// Upstream-facing endpoint bind address (`/ean/rate_breakdown`).
    pub upstream_bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8022".to_string(),
            upstream_bind_address: "0.0.0.0:8001".to_string(),
        }
    }
}

/// Upstream instance configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Comma-separated instance list, e.g. "a.test:9000, b.test:9000".
    /// Empty disables proxying.
    pub instances: String,

    /// Path used for instances configured without one.
    pub default_path: String,

    /// Calls per second allowed to each instance.
    pub qps: u32,

    /// Timeout for one outbound call in milliseconds.
    pub request_timeout_ms: u64,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            instances: String::new(),
            default_path: "/ean/rate_breakdown".to_string(),
            qps: 100,
            request_timeout_ms: 1000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BreakerConfig {
    /// The circuit opens once consecutive failures exceed this count.
    pub failure_threshold: u32,

    /// Time spent open before a trial request is allowed, in seconds.
    pub cool_down_secs: u64,
}

impl BreakerConfig {
    pub fn cool_down(&self) -> Duration {
        Duration::from_secs(self.cool_down_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down_secs: 60,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,

    /// No new attempt starts once this much time has passed, in milliseconds.
    pub max_elapsed_ms: u64,
}

impl RetryConfig {
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_elapsed_ms: 100,
        }
    }
}

/// Timeout configuration for the inbound servers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
