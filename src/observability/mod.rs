//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured `tracing` events)
//!     → metrics.rs (counters and histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → GET /metrics (Prometheus text, rendered from the installed handle)
//! ```
//!
//! The request id (`x-request-id`) is set by the access-log slot and
//! recorded on every request span.

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::install_recorder;
