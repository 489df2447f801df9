//! Local service implementation.

use async_trait::async_trait;

use crate::proxy::error::ProxyResult;
use crate::service::{HotelSupply, RateBreakdownRequest, RateBreakdownResponse};

/// Answers every rate breakdown by echoing the request back.
#[derive(Debug, Clone, Default)]
pub struct LocalHotelSupply;

impl LocalHotelSupply {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HotelSupply for LocalHotelSupply {
    fn name(&self) -> &str {
        "local"
    }

    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
        Ok(RateBreakdownResponse { request, error: None })
    }

    async fn health_check(&self) -> bool {
        true
    }
}
