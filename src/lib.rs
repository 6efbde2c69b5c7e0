//! Deadline-bounded execution of request pipelines.
//!
//! Runs one unit of work on its own execution context, waits for it no longer
//! than a wall-clock deadline, and hands back exactly what the work produced:
//! its value, its error, or its panic. On timeout the context is asked to
//! cancel and the caller gets a recoverable [`DeadlineError::TimedOut`].
//!
//! ```no_run
//! use deadline_exec::DeadlineExecutor;
//!
//! # async fn demo() {
//! let executor = DeadlineExecutor::from_millis(1000);
//! let value = executor
//!     .run(|| async { Ok::<_, std::io::Error>(42) })
//!     .await
//!     .unwrap();
//! assert_eq!(value, 42);
//! # }
//! ```

pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;

pub use config::DeadlineConfig;
pub use http::{DeadlineLayer, HttpPipeline};
pub use resilience::{
    run, Abort, DeadlineError, DeadlineExecutor, ExecutionContextProvider, Outcome, OutcomeKind,
};
