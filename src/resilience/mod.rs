//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call from the facade:
//!     → retries.rs (pick an instance, retry within the budget)
//!     → circuit_breaker.rs (fail fast while the instance keeps failing)
//!     → rate_limit.rs (wait for a token of the instance's qps budget)
//!     → HTTP invoker (one outbound call)
//! ```
//!
//! # Design Decisions
//! - Breaker and limiter are per instance; the retry dispatcher spans instances
//! - A call rejected by an open circuit does not consume a limiter token
//! - All layers implement `Invoker`, so each is testable on its own

pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use rate_limit::RateLimiter;
pub use retries::{RetryDispatcher, RetryPolicy};
