//! Hotel supply platform proxy library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod service;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ProxyError, ProxyResult, ProxyingMiddleware};
pub use service::{HotelSupply, RateBreakdownRequest, RateBreakdownResponse};
