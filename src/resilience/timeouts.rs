//! Timeout enforcement.
//!
//! # Responsibilities
//! - Run one unit of work on its own execution context
//! - Bound the wait by a wall-clock deadline
//! - Relay the work's termination (value, error, panic) unchanged
//! - Request cancellation of the context on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities over the task's `JoinHandle`
//! - The join handle is polled before the timer, so a tie resolves to the result
//! - Timeout errors are distinct from the work's own errors
//! - Cancellation is `JoinHandle::abort`, which never blocks the caller

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::ExecutorConfig;
use crate::observability::metrics;
use crate::resilience::provider::{ExecutionContextProvider, TokioProvider};
use crate::resilience::types::{DeadlineError, Outcome, RunId};

/// Deadline applied when the caller does not supply one.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Runs units of work under a wall-clock deadline.
///
/// Every call spawns a fresh execution context owned by that call alone.
#[derive(Debug, Clone)]
pub struct DeadlineExecutor<P = TokioProvider> {
    deadline: Duration,
    provider: P,
}

impl DeadlineExecutor<TokioProvider> {
    /// Create an executor that spawns onto the ambient tokio runtime.
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            provider: TokioProvider,
        }
    }

    pub fn from_millis(deadline_ms: u64) -> Self {
        Self::new(Duration::from_millis(deadline_ms))
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.timeout())
    }
}

impl Default for DeadlineExecutor<TokioProvider> {
    fn default() -> Self {
        Self::from_millis(DEFAULT_TIMEOUT_MS)
    }
}

impl<P: ExecutionContextProvider> DeadlineExecutor<P> {
    /// Swap the execution-context provider.
    pub fn with_provider<Q: ExecutionContextProvider>(self, provider: Q) -> DeadlineExecutor<Q> {
        DeadlineExecutor {
            deadline: self.deadline,
            provider,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run async work and capture how it terminated.
    ///
    /// `work` is invoked exactly once, inside the spawned context.
    pub async fn execute<F, Fut, T, E>(&self, work: F) -> Outcome<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let span = self.run_span();
        let handle = span.in_scope(|| self.provider.spawn(async move { work().await }));
        self.supervise(handle).instrument(span).await
    }

    /// Run blocking work on the provider's blocking pool and capture how it
    /// terminated.
    ///
    /// A timed-out blocking closure cannot be interrupted; it keeps its pool
    /// thread until it returns on its own.
    pub async fn execute_blocking<F, T, E>(&self, work: F) -> Outcome<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let span = self.run_span();
        let handle = span.in_scope(|| self.provider.spawn_blocking(work));
        self.supervise(handle).instrument(span).await
    }

    /// Run async work and re-signal its termination in the caller's context.
    ///
    /// # Errors
    ///
    /// Returns [`DeadlineError::Failed`] with the work's own error, or
    /// [`DeadlineError::TimedOut`] when the deadline elapsed first.
    ///
    /// # Panics
    ///
    /// Resumes the work's panic, payload untouched.
    pub async fn run<F, Fut, T, E>(&self, work: F) -> Result<T, DeadlineError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.execute(work).await.into_result()
    }

    /// Blocking counterpart of [`DeadlineExecutor::run`].
    pub async fn run_blocking<F, T, E>(&self, work: F) -> Result<T, DeadlineError<E>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.execute_blocking(work).await.into_result()
    }

    fn run_span(&self) -> tracing::Span {
        tracing::debug_span!(
            "deadline.run",
            run_id = %RunId::new(),
            deadline_ms = whole_millis(self.deadline)
        )
    }

    async fn supervise<T, E>(&self, handle: JoinHandle<Result<T, E>>) -> Outcome<T, E> {
        let started = Instant::now();
        let mut context = AbortOnDrop(handle);
        tracing::trace!("Execution context spawned");

        let outcome = match tokio::time::timeout(self.deadline, &mut context.0).await {
            Ok(joined) => Outcome::from_join(joined),
            Err(_) => {
                context.0.abort();
                Outcome::TimedOut {
                    deadline: self.deadline,
                }
            }
        };

        let elapsed = started.elapsed();
        match &outcome {
            Outcome::TimedOut { .. } => tracing::debug!(
                elapsed_ms = whole_millis(elapsed),
                "Deadline elapsed, cancellation requested"
            ),
            Outcome::Aborted(abort) => tracing::debug!(
                panic = abort.is_panic(),
                reason = abort.message().unwrap_or_default(),
                "Unit of work aborted"
            ),
            _ => tracing::trace!(
                outcome = %outcome.kind(),
                elapsed_ms = whole_millis(elapsed),
                "Unit of work finished"
            ),
        }
        metrics::record_outcome(outcome.kind(), elapsed);

        outcome
    }
}

/// Owns the spawned context for the duration of one call.
///
/// If the caller stops waiting (its future is dropped) the context is aborted
/// instead of being left to run detached.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Milliseconds in `duration` for log fields, saturating at `u64::MAX`.
fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run `work` under `deadline_ms`, defaulting to [`DEFAULT_TIMEOUT_MS`].
pub async fn run<F, Fut, T, E>(work: F, deadline_ms: Option<u64>) -> Result<T, DeadlineError<E>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    DeadlineExecutor::from_millis(deadline_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
        .run(work)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::provider::RuntimeProvider;
    use crate::resilience::types::{panic_message, Abort, OutcomeKind};
    use futures_util::FutureExt;
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Sets a flag when dropped, to observe cancellation of spawned work.
    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_deadline_is_one_second() {
        let executor = DeadlineExecutor::default();
        assert_eq!(executor.deadline(), Duration::from_millis(1000));
    }

    #[test]
    fn from_config_uses_timeout_ms() {
        let config = ExecutorConfig { timeout_ms: 250 };
        let executor = DeadlineExecutor::from_config(&config);
        assert_eq!(executor.deadline(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn completed_value_passes_through() {
        let executor = DeadlineExecutor::from_millis(1000);
        let value = executor.run(|| async { Ok::<_, String>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn slow_work_times_out_promptly() {
        let executor = DeadlineExecutor::from_millis(100);
        let started = Instant::now();

        let result = executor
            .run(|| async {
                tokio::time::sleep(Duration::from_millis(5000)).await;
                Ok::<_, String>(1)
            })
            .await;

        let elapsed = started.elapsed();
        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(1000), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn expected_failure_passes_through() {
        let executor = DeadlineExecutor::from_millis(1000);
        let err = executor
            .run(|| async { Err::<u32, _>("bad input".to_string()) })
            .await
            .unwrap_err();

        assert!(!err.is_timeout());
        assert_eq!(err.into_failure().as_deref(), Some("bad input"));
    }

    #[tokio::test]
    async fn panic_is_captured_as_abort() {
        let executor = DeadlineExecutor::from_millis(1000);
        let outcome = executor
            .execute(|| async {
                if true {
                    panic!("oom");
                }
                Ok::<u32, String>(0)
            })
            .await;

        assert_eq!(outcome.kind(), OutcomeKind::Aborted);
        match outcome {
            Outcome::Aborted(abort) => {
                assert!(abort.is_panic());
                assert_eq!(abort.message(), Some("oom"));
            }
            other => panic!("expected Aborted, got {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn panic_is_resumed_in_caller() {
        let executor = DeadlineExecutor::from_millis(1000);
        let caught = AssertUnwindSafe(executor.run(|| async {
            if true {
                panic!("oom");
            }
            Ok::<u32, String>(0)
        }))
        .catch_unwind()
        .await;

        let payload = caught.expect_err("abort must not be downgraded to an error value");
        assert_eq!(panic_message(payload.as_ref()), Some("oom"));
    }

    #[tokio::test]
    async fn non_string_panic_payload_is_preserved() {
        #[derive(Debug, PartialEq)]
        struct Fatal(u16);

        let executor = DeadlineExecutor::from_millis(1000);
        let caught = AssertUnwindSafe(executor.run(|| async {
            if true {
                std::panic::panic_any(Fatal(137));
            }
            Ok::<u32, String>(0)
        }))
        .catch_unwind()
        .await;

        let payload = caught.unwrap_err();
        assert_eq!(payload.downcast_ref::<Fatal>(), Some(&Fatal(137)));
    }

    #[tokio::test]
    async fn classification_is_stable_across_runs() {
        let executor = DeadlineExecutor::from_millis(500);
        let work = || || async { Err::<u32, _>("same") };

        let first = executor.execute(work()).await.kind();
        let second = executor.execute(work()).await.kind();
        assert_eq!(first, OutcomeKind::Failed);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn boundary_yields_exactly_one_outcome() {
        let executor = DeadlineExecutor::from_millis(50);
        let outcome = executor
            .execute(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, String>(1)
            })
            .await;

        match outcome {
            Outcome::Completed(value) => assert_eq!(value, 1),
            Outcome::TimedOut { deadline } => assert_eq!(deadline, Duration::from_millis(50)),
            other => panic!("unexpected outcome {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn timeout_requests_cancellation() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = SetOnDrop(cancelled.clone());

        let executor = DeadlineExecutor::from_millis(50);
        let outcome = executor
            .execute(move || async move {
                let _guard = guard;
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            })
            .await;
        assert!(outcome.is_timed_out());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cancelled.load(Ordering::SeqCst), "spawned work should be dropped");
    }

    #[tokio::test]
    async fn dropping_caller_aborts_context() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = SetOnDrop(cancelled.clone());

        let executor = DeadlineExecutor::from_millis(10_000);
        let pending = executor.execute(move || async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, String>(())
        });
        let _ = tokio::time::timeout(Duration::from_millis(50), pending).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_work_that_ignores_cancellation_does_not_delay_timeout() {
        let executor = DeadlineExecutor::from_millis(50);
        let started = Instant::now();

        let result = executor
            .run_blocking(|| {
                std::thread::sleep(Duration::from_millis(400));
                Ok::<_, String>("late")
            })
            .await;

        assert!(result.unwrap_err().is_timeout());
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn blocking_work_classifies_like_async_work() {
        let executor = DeadlineExecutor::from_millis(1000);

        let ok = executor.run_blocking(|| Ok::<_, String>(5)).await.unwrap();
        assert_eq!(ok, 5);

        let failed = executor
            .execute_blocking(|| Err::<u32, _>("bad input"))
            .await;
        assert!(failed.is_failed());

        let aborted = executor
            .execute_blocking(|| -> Result<u32, String> { panic!("oom") })
            .await;
        assert!(aborted.is_aborted());
    }

    #[tokio::test]
    async fn free_function_applies_default_deadline() {
        let value = run(|| async { Ok::<_, String>("fast") }, None).await.unwrap();
        assert_eq!(value, "fast");

        let err = run(
            || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, String>("slow")
            },
            Some(20),
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn external_runtime_shutdown_is_cancelled_abort() {
        let worker = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let caller = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let executor = DeadlineExecutor::from_millis(5_000)
            .with_provider(RuntimeProvider::new(worker.handle().clone()));
        let shutdown = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            drop(worker);
        });

        let started = Instant::now();
        let outcome = caller.block_on(executor.execute(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(())
        }));
        shutdown.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(outcome.kind(), OutcomeKind::Aborted);
        assert!(matches!(outcome, Outcome::Aborted(Abort::Cancelled)));
    }

    #[test]
    fn log_millis_saturate() {
        assert_eq!(whole_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(whole_millis(Duration::MAX), u64::MAX);
    }
}
