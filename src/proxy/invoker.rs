//! The callable unit every proxy layer wraps.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::proxy::error::ProxyResult;

/// A downstream call: one opaque request in, one opaque response or error out.
///
/// Rate limiter, circuit breaker and retry dispatcher all implement this
/// trait around an inner invoker, so they compose in any order.
#[async_trait]
pub trait Invoker<Req, Resp>: Send + Sync {
    async fn invoke(&self, request: Req) -> ProxyResult<Resp>;
}

/// Type-erased invoker shared between the publisher and in-flight calls.
pub type SharedInvoker<Req, Resp> = Arc<dyn Invoker<Req, Resp>>;

#[async_trait]
impl<Req, Resp, T> Invoker<Req, Resp> for Arc<T>
where
    T: Invoker<Req, Resp> + ?Sized,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, request: Req) -> ProxyResult<Resp> {
        (**self).invoke(request).await
    }
}

/// Adapts an async closure into an [`Invoker`].
#[derive(Debug, Clone)]
pub struct FnInvoker<F> {
    f: F,
}

/// Build an invoker from `Fn(Req) -> impl Future<Output = ProxyResult<Resp>>`.
pub fn invoker_fn<F>(f: F) -> FnInvoker<F> {
    FnInvoker { f }
}

#[async_trait]
impl<Req, Resp, F, Fut> Invoker<Req, Resp> for FnInvoker<F>
where
    F: Fn(Req) -> Fut + Send + Sync,
    Fut: Future<Output = ProxyResult<Resp>> + Send + 'static,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn invoke(&self, request: Req) -> ProxyResult<Resp> {
        (self.f)(request).await
    }
}
