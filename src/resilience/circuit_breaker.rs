//! Circuit breaker for instance protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: instance assumed down, requests fail fast
//! - Half-Open: testing if instance recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures > failure_threshold
//! Open → Half-Open: after cool-down
//! Half-Open → Closed: trial request succeeds
//! Half-Open → Open: trial request fails
//! ```
//!
//! # Design Decisions
//! - Per-instance circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open (prevents hammering recovering instance)
//! - Outcomes are tagged with the generation they were admitted in; a call
//!   that finishes after the state moved on does not count

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::proxy::error::{ProxyError, ProxyResult};
use crate::proxy::invoker::Invoker;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn name(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct Machine {
    state: BreakerState,
    generation: u64,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            generation: 0,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }

    fn transition(&mut self, to: BreakerState, now: Instant) {
        self.state = to;
        self.generation += 1;
        self.consecutive_failures = 0;
        self.trial_in_flight = false;
        self.opened_at = (to == BreakerState::Open).then_some(now);
    }
}

/// Admission ticket for one call.
struct Permit {
    generation: u64,
    trial: bool,
}

/// Wraps an invoker and sheds load from it while it keeps failing.
pub struct CircuitBreaker<I> {
    inner: I,
    name: String,
    failure_threshold: u32,
    cool_down: Duration,
    machine: Mutex<Machine>,
}

impl<I> CircuitBreaker<I> {
    /// Create a breaker named after the instance it protects.
    pub fn new(name: impl Into<String>, inner: I, config: &BreakerConfig) -> Self {
        Self {
            inner,
            name: name.into(),
            failure_threshold: config.failure_threshold,
            cool_down: config.cool_down(),
            machine: Mutex::new(Machine::new()),
        }
    }

    /// Current state. An expired Open state is reported as Open until the
    /// next call moves it to Half-Open.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Machine> {
        self.machine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_acquire(&self) -> ProxyResult<Permit> {
        let mut machine = self.lock();
        let now = Instant::now();

        match machine.state {
            BreakerState::Closed => Ok(Permit {
                generation: machine.generation,
                trial: false,
            }),
            BreakerState::Open => {
                let cooled = machine
                    .opened_at
                    .map_or(true, |opened| now.saturating_duration_since(opened) >= self.cool_down);
                if !cooled {
                    return Err(self.open_error());
                }
                machine.transition(BreakerState::HalfOpen, now);
                machine.trial_in_flight = true;
                tracing::info!(instance = %self.name, "Circuit half-open, sending trial request");
                Ok(Permit {
                    generation: machine.generation,
                    trial: true,
                })
            }
            BreakerState::HalfOpen => {
                if machine.trial_in_flight {
                    return Err(self.open_error());
                }
                machine.trial_in_flight = true;
                Ok(Permit {
                    generation: machine.generation,
                    trial: true,
                })
            }
        }
    }

    fn record_success(&self, permit: &Permit) {
        let mut machine = self.lock();
        if machine.generation != permit.generation {
            return;
        }
        match machine.state {
            BreakerState::Closed => machine.consecutive_failures = 0,
            BreakerState::HalfOpen => {
                machine.transition(BreakerState::Closed, Instant::now());
                tracing::info!(instance = %self.name, "Circuit closed");
            }
            BreakerState::Open => {}
        }
    }

    fn record_failure(&self, permit: &Permit, error: &ProxyError) {
        let mut machine = self.lock();
        if machine.generation != permit.generation {
            return;
        }
        match machine.state {
            BreakerState::Closed => {
                machine.consecutive_failures += 1;
                if machine.consecutive_failures > self.failure_threshold {
                    let failures = machine.consecutive_failures;
                    machine.transition(BreakerState::Open, Instant::now());
                    tracing::warn!(
                        instance = %self.name,
                        failures,
                        cool_down = ?self.cool_down,
                        error = %error,
                        "Circuit opened"
                    );
                    metrics::record_breaker_open(&self.name);
                }
            }
            BreakerState::HalfOpen => {
                machine.transition(BreakerState::Open, Instant::now());
                tracing::warn!(instance = %self.name, error = %error, "Trial request failed, circuit re-opened");
                metrics::record_breaker_open(&self.name);
            }
            BreakerState::Open => {}
        }
    }

    /// Release a trial slot whose call was abandoned before completing.
    fn abandon(&self, permit: &Permit) {
        let mut machine = self.lock();
        if permit.trial && machine.generation == permit.generation {
            machine.trial_in_flight = false;
        }
    }

    fn open_error(&self) -> ProxyError {
        ProxyError::CircuitOpen {
            instance: self.name.clone(),
        }
    }
}

/// Frees a half-open trial slot if the call future is dropped mid-flight.
struct TrialGuard<'a, I> {
    breaker: &'a CircuitBreaker<I>,
    permit: Permit,
    settled: bool,
}

impl<I> Drop for TrialGuard<'_, I> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.abandon(&self.permit);
        }
    }
}

#[async_trait]
impl<Req, Resp, I> Invoker<Req, Resp> for CircuitBreaker<I>
where
    I: Invoker<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, request: Req) -> ProxyResult<Resp> {
        let mut guard = TrialGuard {
            breaker: self,
            permit: self.try_acquire()?,
            settled: false,
        };

        let result = self.inner.invoke(request).await;
        match &result {
            Ok(_) => self.record_success(&guard.permit),
            Err(e) => self.record_failure(&guard.permit, e),
        }
        guard.settled = true;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::invoker::invoker_fn;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    fn config(threshold: u32, cool_down_secs: u64) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: threshold,
            cool_down_secs,
        }
    }

    /// Breaker around an invoker whose health is switchable, plus a call counter.
    fn switchable(
        threshold: u32,
    ) -> (CircuitBreaker<impl Invoker<(), ()>>, Arc<AtomicBool>, Arc<AtomicU32>) {
        let healthy = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicU32::new(0));
        let (h, c) = (healthy.clone(), calls.clone());
        let inner = invoker_fn(move |_: ()| {
            let (h, c) = (h.clone(), c.clone());
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                if h.load(Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(ProxyError::Transport {
                        instance: "a.test".into(),
                        message: "connection refused".into(),
                    })
                }
            }
        });
        (CircuitBreaker::new("a.test", inner, &config(threshold, 10)), healthy, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_trips_after_threshold_and_fails_fast() {
        let (breaker, _, calls) = switchable(2);

        for _ in 0..3 {
            let err = breaker.invoke(()).await.unwrap_err();
            assert!(matches!(err, ProxyError::Transport { .. }));
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let err = breaker.invoke(()).await.unwrap_err();
        assert!(matches!(err, ProxyError::CircuitOpen { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "open circuit must not reach the invoker");
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let (breaker, healthy, _) = switchable(2);

        let _ = breaker.invoke(()).await;
        let _ = breaker.invoke(()).await;
        healthy.store(true, Ordering::SeqCst);
        breaker.invoke(()).await.unwrap();
        healthy.store(false, Ordering::SeqCst);
        let _ = breaker.invoke(()).await;
        let _ = breaker.invoke(()).await;

        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_after_cool_down() {
        let (breaker, healthy, calls) = switchable(0);

        let _ = breaker.invoke(()).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::advance(Duration::from_secs(10)).await;
        healthy.store(true, Ordering::SeqCst);

        breaker.invoke(()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "exactly one trial reaches the invoker");
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_reopens() {
        let (breaker, _, calls) = switchable(0);

        let _ = breaker.invoke(()).await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let err = breaker.invoke(()).await.unwrap_err();
        assert!(matches!(err, ProxyError::Transport { .. }));
        assert_eq!(breaker.state(), BreakerState::Open);

        // Cool-down restarted: still failing fast.
        tokio::time::advance(Duration::from_secs(5)).await;
        let err = breaker.invoke(()).await.unwrap_err();
        assert!(matches!(err, ProxyError::CircuitOpen { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_during_trial_are_rejected() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let inner = invoker_fn(move |fail: bool| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                if fail {
                    return Err(ProxyError::Codec("boom".into()));
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            }
        });
        let breaker = Arc::new(CircuitBreaker::new("b.test", inner, &config(0, 10)));

        let _ = breaker.invoke(true).await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let trial = {
            let breaker = breaker.clone();
            tokio::spawn(async move { breaker.invoke(false).await })
        };
        tokio::task::yield_now().await;

        let err = breaker.invoke(false).await.unwrap_err();
        assert!(matches!(err, ProxyError::CircuitOpen { .. }));

        trial.await.unwrap().unwrap();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_trial_frees_slot() {
        let inner = invoker_fn(|slow: bool| async move {
            if slow {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            } else {
                Err(ProxyError::Codec("boom".into()))
            }
        });
        let breaker = CircuitBreaker::new("c.test", inner, &config(0, 10));

        let _ = breaker.invoke(false).await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let abandoned = tokio::time::timeout(Duration::from_millis(10), breaker.invoke(true)).await;
        assert!(abandoned.is_err());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        // The slot is free again, so the next call is let through as a trial.
        let err = breaker.invoke(false).await.unwrap_err();
        assert!(matches!(err, ProxyError::Codec(_)));
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
