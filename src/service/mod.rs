//! Hotel supply business interface.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → logging.rs (method, took)
//!     → instrumenting.rs (request duration histogram)
//!     → proxy facade (proxied when instances are configured)
//!     → local.rs (answers locally otherwise)
//! ```
//!
//! # Design Decisions
//! - Every layer implements the full `HotelSupply` trait; decorators forward
//!   the methods they do not care about
//! - Request and response are plain serde types; the proxy treats them as opaque

pub mod instrumenting;
pub mod local;
pub mod logging;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

use crate::proxy::error::{ProxyError, ProxyResult};

pub use instrumenting::InstrumentingMiddleware;
pub use local::LocalHotelSupply;
pub use logging::LoggingMiddleware;

/// Request for a rate breakdown between two dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBreakdownRequest {
    /// Supplier query URL, filled in by services that build one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(default)]
    pub arrival: String,
    #[serde(default)]
    pub departure: String,
    #[serde(default)]
    pub currency: String,
}

/// Rate breakdown answer. Carries the request it answers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBreakdownResponse {
    pub request: RateBreakdownRequest,
    #[serde(default)]
    pub error: Option<String>,
}

/// The hotel supply platform service.
#[async_trait]
pub trait HotelSupply: Send + Sync {
    /// Service name for logs.
    fn name(&self) -> &str;

    /// Rate breakdown for the requested stay. The remote-callable method.
    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse>;

    /// `rate_breakdown` bounded by a caller deadline. Fails with
    /// `DeadlineExceeded` once `deadline` passes.
    async fn rate_breakdown_until(
        &self,
        request: RateBreakdownRequest,
        deadline: Instant,
    ) -> ProxyResult<RateBreakdownResponse> {
        tokio::time::timeout_at(deadline, self.rate_breakdown(request))
            .await
            .map_err(|_| ProxyError::DeadlineExceeded)?
    }

    /// Whether the service can take requests.
    async fn health_check(&self) -> bool;
}

#[async_trait]
impl<T> HotelSupply for Arc<T>
where
    T: HotelSupply + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
        (**self).rate_breakdown(request).await
    }

    async fn rate_breakdown_until(
        &self,
        request: RateBreakdownRequest,
        deadline: Instant,
    ) -> ProxyResult<RateBreakdownResponse> {
        (**self).rate_breakdown_until(request, deadline).await
    }

    async fn health_check(&self) -> bool {
        (**self).health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let request: RateBreakdownRequest =
            serde_json::from_str(r#"{"arrival":"2026-11-02","departure":"2026-11-05","currency":"USD"}"#).unwrap();
        assert_eq!(request.request_url, None);
        assert_eq!(request.currency, "USD");

        let encoded = serde_json::to_value(&request).unwrap();
        assert!(encoded.get("request_url").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_deadline_bounds_rate_breakdown() {
        struct Slow;

        #[async_trait]
        impl HotelSupply for Slow {
            fn name(&self) -> &str {
                "slow"
            }

            async fn rate_breakdown(&self, request: RateBreakdownRequest) -> ProxyResult<RateBreakdownResponse> {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                Ok(RateBreakdownResponse { request, error: None })
            }

            async fn health_check(&self) -> bool {
                true
            }
        }

        let service = Arc::new(Slow);
        let soon = Instant::now() + std::time::Duration::from_millis(10);
        let err = service
            .rate_breakdown_until(RateBreakdownRequest::default(), soon)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::DeadlineExceeded));

        let later = Instant::now() + std::time::Duration::from_secs(5);
        assert!(service.rate_breakdown_until(RateBreakdownRequest::default(), later).await.is_ok());
    }

    #[test]
    fn test_response_json_shape() {
        let response = RateBreakdownResponse {
            request: RateBreakdownRequest {
                currency: "EUR".into(),
                ..Default::default()
            },
            error: None,
        };
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["request"]["currency"], "EUR");
        assert!(encoded["error"].is_null());
    }
}
