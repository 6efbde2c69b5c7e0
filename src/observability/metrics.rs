//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deadline_outcomes_total` (counter): finished runs by outcome
//! - `deadline_run_duration_seconds` (histogram): time the caller waited, by outcome
//!
//! Without an installed recorder every call is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::resilience::types::OutcomeKind;

pub const OUTCOMES_TOTAL: &str = "deadline_outcomes_total";
pub const RUN_DURATION_SECONDS: &str = "deadline_run_duration_seconds";

/// Record one finished run.
pub fn record_outcome(kind: OutcomeKind, elapsed: Duration) {
    ::metrics::counter!(OUTCOMES_TOTAL, "outcome" => kind.as_str()).increment(1);
    ::metrics::histogram!(RUN_DURATION_SECONDS, "outcome" => kind.as_str())
        .record(elapsed.as_secs_f64());
}

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}
