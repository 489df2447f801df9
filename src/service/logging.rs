//! Logging decorator for the business service.

use async_trait::async_trait;
use std::time::Instant;

use crate::proxy::error::ProxyResult;
use crate::service::{HotelSupply, RateBreakdownRequest, RateBreakdownResponse};

fn log_outcome(begin: Instant, result: &ProxyResult<RateBreakdownResponse>) {
    match result {
        Ok(_) => tracing::info!(method = "rate_breakdown", took = ?begin.elapsed(), "Request served"),
        Err(e) => tracing::info!(method = "rate_breakdown", took = ?begin.elapsed(), error = %e, "Request failed"),
    }
}

/// Logs method name and duration of every rate breakdown.
pub struct LoggingMiddleware<S> {
    next: S,
}

impl<S> LoggingMiddleware<S> {
    pub fn new(next: S) -> Self {
        Self { next }
    }
}

#[async_trait]
impl<S: HotelSupply> HotelSupply for LoggingMiddleware<S> {
    fn name(&self) -> &str {
        self.next.name()
    }

    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
        let begin = Instant::now();
        let result = self.next.rate_breakdown(request).await;
        log_outcome(begin, &result);
        result
    }

    async fn rate_breakdown_until(
        &self,
        request: RateBreakdownRequest,
        deadline: tokio::time::Instant,
    ) -> ProxyResult<RateBreakdownResponse> {
        let begin = Instant::now();
        let result = self.next.rate_breakdown_until(request, deadline).await;
        log_outcome(begin, &result);
        result
    }

    async fn health_check(&self) -> bool {
        self.next.health_check().await
    }
}
