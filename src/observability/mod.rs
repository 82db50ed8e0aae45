//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Prometheus scrape endpoint (when enabled)
//! ```
//!
//! # Design Decisions
//! - Request ID (`x-request-id`) is attached to every request span
//! - Metric updates go through the `metrics` facade and are no-ops until an
//!   exporter is installed, so tests never need one

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
