//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Retry dispatcher needs an invoker
//!     → publisher.rs (ordered snapshot of protected invokers)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through instances)
//!     → Return the chosen endpoint or NoInstances
//! ```
//!
//! # Design Decisions
//! - Strategies only choose an index; the publisher owns the invokers
//! - Every pick works on a fresh snapshot, so membership changes are safe
//! - No health filtering here: the circuit breaker inside each invoker
//!   rejects calls to failing instances and the retry moves on

pub mod publisher;
pub mod round_robin;

use std::fmt;
use std::sync::Arc;

use crate::proxy::error::{ProxyError, ProxyResult};
pub use publisher::{Endpoint, InstancePublisher, InvokerFactory, RefreshSummary};
pub use round_robin::RoundRobin;

/// A selection strategy over a snapshot of `len` entries.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Index of the entry to use next, or `None` for an empty snapshot.
    fn next_index(&self, len: usize) -> Option<usize>;

    /// Strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Picks one endpoint per call from the publisher's current snapshot.
pub struct Balancer<Req, Resp> {
    publisher: Arc<InstancePublisher<Req, Resp>>,
    strategy: Box<dyn LoadBalancer>,
}

impl<Req, Resp> Balancer<Req, Resp> {
    pub fn new(publisher: Arc<InstancePublisher<Req, Resp>>, strategy: Box<dyn LoadBalancer>) -> Self {
        Self { publisher, strategy }
    }

    /// Round-robin over the publisher's instances.
    pub fn round_robin(publisher: Arc<InstancePublisher<Req, Resp>>) -> Self {
        Self::new(publisher, Box::new(RoundRobin::new()))
    }

    /// Select the endpoint for the next attempt.
    pub fn pick(&self) -> ProxyResult<Endpoint<Req, Resp>> {
        let snapshot = self.publisher.current();
        match self.strategy.next_index(snapshot.len()) {
            Some(index) => Ok(snapshot[index].clone()),
            None => {
                tracing::debug!(strategy = self.strategy.name(), "No instances to pick from");
                Err(ProxyError::NoInstances)
            }
        }
    }
}
