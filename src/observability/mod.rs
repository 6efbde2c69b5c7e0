//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every deadline-bounded run produces:
//!     → a `deadline.run` span carrying its run ID
//!     → logging.rs (structured log events)
//!     → metrics.rs (outcome counter, duration histogram)
//!
//! Consumers:
//!     → Log aggregation (stderr, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Diagnostics never alter the outcome relayed to the caller
//! - Timeouts and aborts log at debug; they are the caller's to report
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
