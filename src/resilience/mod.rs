//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Caller hands over a unit of work:
//!     → provider.rs (spawn it on an independent execution context)
//!     → timeouts.rs (bounded wait on the context's join handle)
//!     → types.rs (classify: Completed / Failed / Aborted / TimedOut)
//!     → re-signal in the caller: Ok, Err, resumed panic, or timeout error
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; the default is one second
//! - One context per call, never pooled or reused
//! - Cancellation is requested, never awaited
//! - No retries; callers decide what a timeout means

pub mod provider;
pub mod timeouts;
pub mod types;

pub use provider::{
    ExecutionContextProvider, RuntimeProvider, SpanPropagatingProvider, TokioProvider,
};
pub use timeouts::{run, DeadlineExecutor, DEFAULT_TIMEOUT_MS};
pub use types::{Abort, DeadlineError, Outcome, OutcomeKind, RunId};
