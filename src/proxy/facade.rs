//! Proxying decorator for the business service.
//!
//! # Responsibilities
//! - Decide once, at construction, whether proxying is enabled
//! - Assemble the chain: retry → round-robin → breaker → limiter → transport
//! - Intercept `rate_breakdown` only; every other method goes to the wrapped service
//! - Apply a new instance list on configuration reload
//!
//! # Design Decisions
//! - An empty instance list builds nothing; calls go straight to `next`
//! - A malformed instance fails construction rather than the first call
//! - The transport factory is injectable so the chain can be tested without a network

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::{BreakerConfig, ProxyConfig};
use crate::load_balancer::{Balancer, InstancePublisher, InvokerFactory, RefreshSummary};
use crate::proxy::error::ProxyResult;
use crate::proxy::instance::{parse_instances, Instance};
use crate::proxy::invoker::SharedInvoker;
use crate::proxy::transport::{http_client, HttpInvoker};
use crate::resilience::{CircuitBreaker, RateLimiter, RetryDispatcher, RetryPolicy};
use crate::service::{HotelSupply, RateBreakdownRequest, RateBreakdownResponse};

/// Builds the unprotected single-call invoker for one instance.
pub type TransportFactory = InvokerFactory<RateBreakdownRequest, RateBreakdownResponse>;

/// The assembled proxy chain.
struct Proxy {
    dispatcher: RetryDispatcher<RateBreakdownRequest, RateBreakdownResponse>,
    publisher: Arc<InstancePublisher<RateBreakdownRequest, RateBreakdownResponse>>,
}

/// Wraps a [`HotelSupply`] and forwards `rate_breakdown` to upstream instances.
pub struct ProxyingMiddleware<S> {
    next: S,
    proxy: Option<Proxy>,
}

impl<S> ProxyingMiddleware<S> {
    /// Build from configuration with the HTTP/JSON transport.
    pub fn new(config: &ProxyConfig, next: S) -> ProxyResult<Self> {
        let client = http_client()?;
        let default_path = config.upstream.default_path.clone();
        let timeout = config.upstream.request_timeout();

        let transport: TransportFactory = Arc::new(move |instance: &Instance| {
            let invoker = HttpInvoker::new(instance, &default_path, client.clone(), timeout)?;
            let invoker: SharedInvoker<RateBreakdownRequest, RateBreakdownResponse> = Arc::new(invoker);
            Ok(invoker)
        });

        Self::with_transport(config, next, transport)
    }

    /// Build from configuration with a custom transport.
    pub fn with_transport(config: &ProxyConfig, next: S, transport: TransportFactory) -> ProxyResult<Self> {
        let instances = parse_instances(&config.upstream.instances);
        if instances.is_empty() {
            tracing::info!(proxy_to = "none", "Proxying disabled");
            return Ok(Self { next, proxy: None });
        }

        let addresses: Vec<&str> = instances.iter().map(Instance::address).collect();
        tracing::info!(
            proxy_to = ?addresses,
            qps = config.upstream.qps,
            max_attempts = config.retries.max_attempts,
            max_elapsed_ms = config.retries.max_elapsed_ms,
            "Proxying enabled"
        );

        let factory = protected_factory(transport, config.upstream.qps, config.breaker.clone());
        let publisher = Arc::new(InstancePublisher::new(instances, factory)?);
        let dispatcher = RetryDispatcher::new(
            Balancer::round_robin(publisher.clone()),
            RetryPolicy::from(&config.retries),
        );

        Ok(Self {
            next,
            proxy: Some(Proxy { dispatcher, publisher }),
        })
    }

    /// Whether calls are being forwarded to upstream instances.
    pub fn is_proxying(&self) -> bool {
        self.proxy.is_some()
    }

    /// The live instance publisher, when proxying.
    pub fn publisher(&self) -> Option<&Arc<InstancePublisher<RateBreakdownRequest, RateBreakdownResponse>>> {
        self.proxy.as_ref().map(|proxy| &proxy.publisher)
    }

    /// Publish a new comma-separated instance list.
    ///
    /// Returns `Ok(None)` when proxying was disabled at startup; enabling it
    /// needs a restart. An empty or unbuildable list keeps the current set.
    pub fn reload_instances(&self, list: &str) -> ProxyResult<Option<RefreshSummary>> {
        let Some(proxy) = &self.proxy else {
            if !list.trim().is_empty() {
                tracing::warn!(instances = list, "Proxying was disabled at startup, restart to enable it");
            }
            return Ok(None);
        };

        proxy.publisher.refresh(parse_instances(list)).map(Some).map_err(|e| {
            tracing::warn!(error = %e, "Instance reload rejected, keeping current set");
            e
        })
    }
}

/// Wrap every transport invoker in a rate limiter, then a circuit breaker.
fn protected_factory(transport: TransportFactory, qps: u32, breaker: BreakerConfig) -> TransportFactory {
    Arc::new(move |instance: &Instance| {
        let single = transport(instance)?;
        let limited = RateLimiter::new(single, qps);
        let protected: SharedInvoker<RateBreakdownRequest, RateBreakdownResponse> =
            Arc::new(CircuitBreaker::new(instance.address(), limited, &breaker));
        Ok(protected)
    })
}

#[async_trait]
impl<S: HotelSupply> HotelSupply for ProxyingMiddleware<S> {
    fn name(&self) -> &str {
        self.next.name()
    }

    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
        match &self.proxy {
            Some(proxy) => proxy.dispatcher.call(request).await,
            None => self.next.rate_breakdown(request).await,
        }
    }

    async fn rate_breakdown_until(
        &self,
        request: RateBreakdownRequest,
        deadline: Instant,
    ) -> ProxyResult<RateBreakdownResponse> {
        match &self.proxy {
            Some(proxy) => proxy.dispatcher.call_with_deadline(request, deadline).await,
            None => self.next.rate_breakdown_until(request, deadline).await,
        }
    }

    async fn health_check(&self) -> bool {
        self.next.health_check().await
    }
}
