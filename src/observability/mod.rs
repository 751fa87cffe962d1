//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (selection counters, dispatch histogram)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID (x-request-id) is attached to the HTTP trace span
//! - Route scores are logged at trace level only, they run per route per call
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
