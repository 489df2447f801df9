//! Retry dispatcher.
//!
//! # Responsibilities
//! - Top-level entry point of the proxy chain
//! - Pick an instance per attempt through the balancer
//! - Enforce the retry budget: max attempts and max elapsed time
//! - Honor an optional caller deadline
//!
//! # Design Decisions
//! - No backoff sleep; the rate limiter is the only pacing
//! - Each attempt gets an even share of the remaining time budget, so a
//!   hung instance cannot use up the time left for the others
//! - Budget exhaustion wraps the last attempt's error
//! - NoInstances and non-retryable errors end the call immediately
//!
//! # Attempt Deadlines
//! ```text
//! share    = (max_elapsed - elapsed) / (max_attempts - attempts_made)
//! deadline = min(now + share, caller deadline)
//! ```
//! An attempt cut at its share fails with `Timeout` and the loop moves on;
//! one cut at the caller deadline ends the call with `DeadlineExceeded`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::load_balancer::Balancer;
use crate::observability::metrics;
use crate::proxy::error::{ProxyError, ProxyResult};
use crate::proxy::invoker::Invoker;

/// Retry budget for one logical call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, max_elapsed: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            max_elapsed,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.max_elapsed_ms))
    }
}

/// Dispatches a call through the balancer, retrying within the budget.
pub struct RetryDispatcher<Req, Resp> {
    balancer: Balancer<Req, Resp>,
    policy: RetryPolicy,
}

impl<Req, Resp> RetryDispatcher<Req, Resp>
where
    Req: Clone + Send + 'static,
    Resp: Send + 'static,
{
    pub fn new(balancer: Balancer<Req, Resp>, policy: RetryPolicy) -> Self {
        Self { balancer, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Call with only the retry budget as a limit.
    pub async fn call(&self, request: Req) -> ProxyResult<Resp> {
        self.dispatch(request, None).await
    }

    /// Call bounded by a caller deadline. When it passes, the outstanding
    /// attempt is abandoned and `DeadlineExceeded` is returned.
    pub async fn call_with_deadline(&self, request: Req, deadline: Instant) -> ProxyResult<Resp> {
        self.dispatch(request, Some(deadline)).await
    }

    async fn dispatch(&self, request: Req, deadline: Option<Instant>) -> ProxyResult<Resp> {
        let started = Instant::now();
        let budget_end = started + self.policy.max_elapsed;
        let mut attempts = 0u32;

        loop {
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                return Err(ProxyError::DeadlineExceeded);
            }
            let endpoint = self.balancer.pick()?;

            let attempts_left = self.policy.max_attempts.saturating_sub(attempts).max(1);
            let share = budget_end.saturating_duration_since(now) / attempts_left;
            let cut_at = match deadline {
                Some(deadline) => deadline.min(now + share),
                None => now + share,
            };
            attempts += 1;

            let error = match tokio::time::timeout_at(cut_at, endpoint.invoker.invoke(request.clone())).await {
                Ok(Ok(response)) => {
                    metrics::record_attempt(endpoint.instance.address(), "success");
                    if attempts > 1 {
                        tracing::debug!(instance = %endpoint.instance, attempts, "Call succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(Err(error)) => {
                    metrics::record_attempt(endpoint.instance.address(), "failure");
                    error
                }
                Err(_) if deadline.is_some_and(|d| d <= cut_at) => {
                    tracing::debug!(
                        instance = %endpoint.instance,
                        attempt = attempts,
                        "Caller deadline passed, abandoning attempt"
                    );
                    metrics::record_attempt(endpoint.instance.address(), "abandoned");
                    return Err(ProxyError::DeadlineExceeded);
                }
                Err(_) => {
                    metrics::record_attempt(endpoint.instance.address(), "timeout");
                    ProxyError::Timeout {
                        instance: endpoint.instance.address().to_string(),
                        after_ms: share.as_millis() as u64,
                    }
                }
            };

            if !error.is_retryable() {
                return Err(error);
            }

            let elapsed = started.elapsed();
            if attempts >= self.policy.max_attempts || elapsed >= self.policy.max_elapsed {
                tracing::debug!(
                    instance = %endpoint.instance,
                    attempts,
                    elapsed = ?elapsed,
                    error = %error,
                    "Retry budget exhausted"
                );
                return Err(ProxyError::Exhausted {
                    attempts,
                    last: Box::new(error),
                });
            }

            tracing::debug!(
                instance = %endpoint.instance,
                attempt = attempts,
                error = %error,
                "Attempt failed, retrying"
            );
        }
    }
}

#[async_trait]
impl<Req, Resp> Invoker<Req, Resp> for RetryDispatcher<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, request: Req) -> ProxyResult<Resp> {
        self.call(request).await
    }
}
