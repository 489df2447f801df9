//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → any metrics recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the HTTP layers as `x-request-id`
//! - Metrics are cheap (no-ops without a recorder)

pub mod logging;
pub mod metrics;
