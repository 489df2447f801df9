//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID assigned or kept)
//!     → handler decodes JSON and calls the HotelSupply service
//!     → response.rs (errors mapped to status + JSON body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use response::status_for;
pub use server::{HttpServer, SharedSupply, RATE_BREAKDOWN_PATH, UPSTREAM_RATE_BREAKDOWN_PATH};
