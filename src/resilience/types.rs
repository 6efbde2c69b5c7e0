//! Outcome and error types for deadline-bounded runs.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinError;

/// Global atomic counter for run IDs.
/// Relaxed ordering is enough since IDs only need to be unique.
static RUN_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier attached to the tracing span of every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(u64);

impl RunId {
    /// Generate a new unique run ID.
    pub fn new() -> Self {
        Self(RUN_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Fieldless classification of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Completed,
    Failed,
    Aborted,
    TimedOut,
}

impl OutcomeKind {
    /// Stable lowercase label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Completed => "completed",
            OutcomeKind::Failed => "failed",
            OutcomeKind::Aborted => "aborted",
            OutcomeKind::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-local termination of a unit of work.
pub enum Abort {
    /// The work panicked. Holds the original panic payload.
    Panic(Box<dyn Any + Send + 'static>),
    /// The execution context was torn down by someone other than the executor
    /// (for example the runtime shutting down) before the work finished.
    Cancelled,
}

impl Abort {
    pub(crate) fn from_join_error(err: JoinError) -> Self {
        match err.try_into_panic() {
            Ok(payload) => Abort::Panic(payload),
            Err(_) => Abort::Cancelled,
        }
    }

    /// Returns true when the abort came from a panic inside the work.
    pub fn is_panic(&self) -> bool {
        matches!(self, Abort::Panic(_))
    }

    /// Panic message, when the payload is a `&str` or `String`.
    pub fn message(&self) -> Option<&str> {
        match self {
            Abort::Panic(payload) => panic_message(payload.as_ref()),
            Abort::Cancelled => None,
        }
    }

    /// Re-raise the abort in the current context.
    ///
    /// Panics resume unwinding with the untouched original payload.
    pub fn resume(self) -> ! {
        match self {
            Abort::Panic(payload) => std::panic::resume_unwind(payload),
            Abort::Cancelled => {
                panic!("execution context was cancelled before the unit of work finished")
            }
        }
    }
}

impl fmt::Debug for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abort::Panic(_) => f
                .debug_tuple("Panic")
                .field(&self.message().unwrap_or("<non-string payload>"))
                .finish(),
            Abort::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Extract a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        Some(*message)
    } else {
        payload.downcast_ref::<String>().map(String::as_str)
    }
}

/// The single result of one deadline-bounded run.
///
/// Not `Clone`: an outcome is produced once and consumed once.
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The work returned normally.
    Completed(T),
    /// The work returned its own error.
    Failed(E),
    /// The work panicked or its context was torn down.
    Aborted(Abort),
    /// The deadline elapsed first; cancellation was requested.
    TimedOut { deadline: Duration },
}

impl<T, E> Outcome<T, E> {
    pub(crate) fn from_join(joined: Result<Result<T, E>, JoinError>) -> Self {
        match joined {
            Ok(Ok(value)) => Outcome::Completed(value),
            Ok(Err(err)) => Outcome::Failed(err),
            Err(join_err) => Outcome::Aborted(Abort::from_join_error(join_err)),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Completed(_) => OutcomeKind::Completed,
            Outcome::Failed(_) => OutcomeKind::Failed,
            Outcome::Aborted(_) => OutcomeKind::Aborted,
            Outcome::TimedOut { .. } => OutcomeKind::TimedOut,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut { .. })
    }

    /// Re-signal the outcome in the caller's context.
    ///
    /// `Completed` and `Failed` map onto `Result`, `TimedOut` becomes a
    /// recoverable [`DeadlineError::TimedOut`], and `Aborted` resumes
    /// unwinding with the original payload.
    pub fn into_result(self) -> Result<T, DeadlineError<E>> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Failed(err) => Err(DeadlineError::Failed(err)),
            Outcome::TimedOut { deadline } => Err(DeadlineError::TimedOut { deadline }),
            Outcome::Aborted(abort) => abort.resume(),
        }
    }
}

/// Recoverable errors surfaced by a deadline-bounded run.
///
/// `Failed` is transparent: it displays as the wrapped error and reports the
/// wrapped error's own `source()`, so the cause chain reads as if the work had
/// returned the error directly.
#[derive(Debug)]
pub enum DeadlineError<E> {
    /// The deadline elapsed before the unit of work finished.
    TimedOut { deadline: Duration },

    /// The unit of work's own error, passed through unchanged.
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for DeadlineError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineError::TimedOut { deadline } => write!(
                f,
                "deadline of {}ms elapsed before the unit of work finished",
                deadline.as_millis()
            ),
            DeadlineError::Failed(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl<E: Error + 'static> Error for DeadlineError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DeadlineError::TimedOut { .. } => None,
            DeadlineError::Failed(err) => err.source(),
        }
    }
}

impl<E> DeadlineError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DeadlineError::TimedOut { .. })
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            DeadlineError::TimedOut { .. } => OutcomeKind::TimedOut,
            DeadlineError::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// Borrow the original failure, if this is not a timeout.
    pub fn failure(&self) -> Option<&E> {
        match self {
            DeadlineError::Failed(err) => Some(err),
            DeadlineError::TimedOut { .. } => None,
        }
    }

    /// Take back the original failure, if this is not a timeout.
    pub fn into_failure(self) -> Option<E> {
        match self {
            DeadlineError::Failed(err) => Some(err),
            DeadlineError::TimedOut { .. } => None,
        }
    }
}
