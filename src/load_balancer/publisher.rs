//! Instance publisher.
//!
//! # Responsibilities
//! - Own one protected invoker per published instance
//! - Hand out cheap, ordered snapshots to the balancer
//! - Rebuild on membership change, keeping state for instances that persist
//!
//! # Design Decisions
//! - Snapshots are `Arc<Vec<_>>` swapped atomically (arc-swap); readers never lock
//! - Refreshes are serialized; a failing factory leaves the previous set in place
//! - Duplicate instances each get their own invoker

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};

use crate::proxy::error::{ProxyError, ProxyResult};
use crate::proxy::instance::Instance;
use crate::proxy::invoker::SharedInvoker;

/// Builds the protected invoker for one instance.
pub type InvokerFactory<Req, Resp> =
    Arc<dyn Fn(&Instance) -> ProxyResult<SharedInvoker<Req, Resp>> + Send + Sync>;

/// A published instance together with its invoker.
pub struct Endpoint<Req, Resp> {
    pub instance: Instance,
    pub invoker: SharedInvoker<Req, Resp>,
}

impl<Req, Resp> Clone for Endpoint<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            invoker: self.invoker.clone(),
        }
    }
}

/// Outcome of a refresh, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub kept: usize,
    pub built: usize,
    pub removed: usize,
}

/// Maintains the live instance → invoker mapping.
pub struct InstancePublisher<Req, Resp> {
    factory: InvokerFactory<Req, Resp>,
    endpoints: ArcSwap<Vec<Endpoint<Req, Resp>>>,
    refresh_lock: Mutex<()>,
}

impl<Req, Resp> InstancePublisher<Req, Resp> {
    /// Publish the initial instance set. Fails if it is empty or any
    /// instance cannot be built.
    pub fn new(instances: Vec<Instance>, factory: InvokerFactory<Req, Resp>) -> ProxyResult<Self> {
        let publisher = Self {
            factory,
            endpoints: ArcSwap::from_pointee(Vec::new()),
            refresh_lock: Mutex::new(()),
        };
        publisher.refresh(instances)?;
        Ok(publisher)
    }

    /// Ordered snapshot of the current endpoints.
    pub fn current(&self) -> Arc<Vec<Endpoint<Req, Resp>>> {
        self.endpoints.load_full()
    }

    /// Instances currently published, in order.
    pub fn instances(&self) -> Vec<Instance> {
        self.endpoints
            .load()
            .iter()
            .map(|endpoint| endpoint.instance.clone())
            .collect()
    }

    /// Replace the instance set.
    ///
    /// Invokers for instances present before and after are carried over
    /// untouched (breaker and limiter state included); new instances go
    /// through the factory; the rest are dropped once in-flight calls finish.
    pub fn refresh(&self, instances: Vec<Instance>) -> ProxyResult<RefreshSummary> {
        if instances.is_empty() {
            return Err(ProxyError::NoInstances);
        }

        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = self.endpoints.load_full();
        let mut reusable: Vec<Option<Endpoint<Req, Resp>>> =
            current.iter().cloned().map(Some).collect();
        let mut next = Vec::with_capacity(instances.len());
        let mut summary = RefreshSummary::default();

        for instance in instances {
            let existing = reusable
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|e| e.instance == instance))
                .and_then(Option::take);

            match existing {
                Some(endpoint) => {
                    summary.kept += 1;
                    next.push(endpoint);
                }
                None => {
                    let invoker = (self.factory)(&instance)?;
                    summary.built += 1;
                    next.push(Endpoint { instance, invoker });
                }
            }
        }
        summary.removed = reusable.iter().flatten().count();

        let published: Vec<&str> = next.iter().map(|e| e.instance.address()).collect();
        tracing::info!(
            instances = ?published,
            kept = summary.kept,
            built = summary.built,
            removed = summary.removed,
            "Instance set published"
        );

        self.endpoints.store(Arc::new(next));
        Ok(summary)
    }
}
