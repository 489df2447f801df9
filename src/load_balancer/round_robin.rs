//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Stores an internal counter to rotate through instances.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        // Wraps against the length of the snapshot being picked from, so a
        // shrinking instance set never indexes out of bounds.
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(count % len)
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
