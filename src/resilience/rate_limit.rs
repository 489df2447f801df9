//! Per-instance token bucket throttle.
//!
//! The bucket holds at most `qps` tokens and refills at `qps` tokens per
//! second. A call takes one token; when none is left the caller waits until
//! its token has accrued instead of being rejected.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::proxy::error::ProxyResult;
use crate::proxy::invoker::Invoker;

/// A reservation-based token bucket.
///
/// Tokens may go negative: each reservation that finds the bucket empty
/// books the next token to accrue, so concurrent waiters are served in
/// arrival order.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(qps: u32) -> Self {
        let capacity = f64::from(qps.max(1));
        Self {
            tokens: capacity,
            capacity,
            refill_rate: capacity,
            last_update: Instant::now(),
        }
    }

    /// Take one token, returning how long the caller must wait for it.
    fn reserve(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_update = now;

        self.tokens -= 1.0;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.refill_rate)
        }
    }

    /// Give back a token whose caller stopped waiting for it.
    fn refund(&mut self) {
        self.tokens = (self.tokens + 1.0).min(self.capacity);
    }
}

/// A booked token; refunded if dropped before the wait completes.
struct Reservation<'a> {
    bucket: &'a Mutex<TokenBucket>,
    settled: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.bucket
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .refund();
        }
    }
}

/// Throttles calls to the wrapped invoker to `qps` per second.
pub struct RateLimiter<I> {
    inner: I,
    qps: u32,
    bucket: Mutex<TokenBucket>,
}

impl<I> RateLimiter<I> {
    pub fn new(inner: I, qps: u32) -> Self {
        Self {
            inner,
            qps,
            bucket: Mutex::new(TokenBucket::new(qps)),
        }
    }

    /// Wait until a token is available. Dropping the future mid-wait
    /// returns the token to the bucket.
    pub async fn acquire(&self) {
        let wait = self
            .bucket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reserve(Instant::now());

        if !wait.is_zero() {
            let mut reservation = Reservation {
                bucket: &self.bucket,
                settled: false,
            };
            tracing::trace!(wait = ?wait, qps = self.qps, "Rate limit reached, waiting for token");
            tokio::time::sleep(wait).await;
            reservation.settled = true;
        }
    }
}

#[async_trait]
impl<Req, Resp, I> Invoker<Req, Resp> for RateLimiter<I>
where
    I: Invoker<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, request: Req) -> ProxyResult<Resp> {
        self.acquire().await;
        self.inner.invoke(request).await
    }
}
