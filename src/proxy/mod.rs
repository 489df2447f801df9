//! Request-proxying layer.
//!
//! # Data Flow
//! ```text
//! ProxyingMiddleware::rate_breakdown
//!     → RetryDispatcher (attempt budget, elapsed budget, caller deadline)
//!     → Balancer (round-robin over the publisher's snapshot)
//!     → CircuitBreaker (per instance, fail fast while open)
//!     → RateLimiter (per instance, wait for a token)
//!     → HttpInvoker (one GET with a JSON body)
//!     → upstream instance
//! ```
//!
//! # Design Decisions
//! - Every layer implements [`Invoker`]; the request and response are opaque to it
//! - Per-instance state lives in the protected invoker, never in globals
//! - Errors propagate unchanged except for the breaker's own rejection and
//!   the dispatcher's exhaustion wrapper

pub mod error;
pub mod facade;
pub mod instance;
pub mod invoker;
pub mod transport;

pub use error::{ErrorKind, ProxyError, ProxyResult};
pub use facade::{ProxyingMiddleware, TransportFactory};
pub use instance::{parse_instances, Instance};
pub use invoker::{invoker_fn, Invoker, SharedInvoker};
pub use transport::{http_client, Codec, HttpClient, HttpInvoker, JsonCodec};
