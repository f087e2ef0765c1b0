//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (render counters and latency histograms)
//!
//! Consumers:
//!     → stdout (pretty in development, JSON in production)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Request ID and site name flow through every render log line
//! - Metrics are cheap (atomic increments) and always recorded;
//!   the exporter is opt-in

pub mod logging;
pub mod metrics;
