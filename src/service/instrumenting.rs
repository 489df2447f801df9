//! Metrics decorator for the business service.

use async_trait::async_trait;
use std::time::Instant;

use crate::observability::metrics;
use crate::proxy::error::ProxyResult;
use crate::service::{HotelSupply, RateBreakdownRequest, RateBreakdownResponse};

fn record(begin: Instant, result: &ProxyResult<RateBreakdownResponse>) {
    // A response carrying an error counts as failed too.
    let failed = match result {
        Ok(response) => response.error.is_some(),
        Err(_) => true,
    };
    metrics::record_request("rate_breakdown", failed, begin);
}

/// Records `hsp_request_duration_seconds` for every rate breakdown.
pub struct InstrumentingMiddleware<S> {
    next: S,
}

impl<S> InstrumentingMiddleware<S> {
    pub fn new(next: S) -> Self {
        Self { next }
    }
}

#[async_trait]
impl<S: HotelSupply> HotelSupply for InstrumentingMiddleware<S> {
    fn name(&self) -> &str {
        self.next.name()
    }

    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
        let begin = Instant::now();
        let result = self.next.rate_breakdown(request).await;
        record(begin, &result);
        result
    }

    async fn rate_breakdown_until(
        &self,
        request: RateBreakdownRequest,
        deadline: tokio::time::Instant,
    ) -> ProxyResult<RateBreakdownResponse> {
        let begin = Instant::now();
        let result = self.next.rate_breakdown_until(request, deadline).await;
        record(begin, &result);
        result
    }

    async fn health_check(&self) -> bool {
        self.next.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LocalHotelSupply;

    #[tokio::test]
    async fn test_passes_result_through() {
        let service = InstrumentingMiddleware::new(LocalHotelSupply::new());
        let response = service
            .rate_breakdown(RateBreakdownRequest::default())
            .await
            .unwrap();
        assert!(response.error.is_none());
        assert!(service.health_check().await);

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
        assert!(service
            .rate_breakdown_until(RateBreakdownRequest::default(), deadline)
            .await
            .is_ok());
    }
}
