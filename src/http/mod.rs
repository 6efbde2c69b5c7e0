//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Caller builds a reqwest::Request
//!     → pipeline.rs (execute + read body as one unit of work)
//!     → resilience::DeadlineExecutor (spawn, bounded wait)
//!     → PipelineResponse | DeadlineError<reqwest::Error>
//!
//! tower stacks:
//!     → middleware.rs (DeadlineLayer around any Service)
//! ```

pub mod middleware;
pub mod pipeline;

pub use middleware::{DeadlineLayer, DeadlineService};
pub use pipeline::{HttpPipeline, PipelineResponse, PipelineResult};
