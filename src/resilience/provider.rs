//! Execution-context providers.
//!
//! # Responsibilities
//! - Launch a unit of work on an independent execution context
//! - Hand back a `JoinHandle` that doubles as the single-use outcome channel
//!
//! # Design Decisions
//! - The default provider is plain `tokio::spawn`
//! - Context propagation (tracing spans) is a wrapping provider, not a flag
//! - Blocking work goes to the blocking pool; aborting it is a no-op once started

use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, Span};

/// Factory for the execution contexts used by a deadline executor.
pub trait ExecutionContextProvider: Send + Sync {
    /// Run an async unit of work on a new context.
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static;

    /// Run a blocking unit of work on a new context.
    fn spawn_blocking<F, R>(&self, work: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static;
}

/// Spawns onto the ambient tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProvider;

impl ExecutionContextProvider for TokioProvider {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }

    fn spawn_blocking<F, R>(&self, work: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        tokio::task::spawn_blocking(work)
    }
}

/// Spawns onto an explicit runtime, e.g. a dedicated I/O runtime.
#[derive(Debug, Clone)]
pub struct RuntimeProvider {
    handle: Handle,
}

impl RuntimeProvider {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Capture the runtime the caller is currently running on.
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl ExecutionContextProvider for RuntimeProvider {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    fn spawn_blocking<F, R>(&self, work: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.spawn_blocking(work)
    }
}

/// Carries the caller's current tracing span and subscriber into the spawned
/// context.
///
/// Without it, work spawned on another task loses the caller's span and its
/// events show up detached from the request that caused them. Blocking work runs
/// on a pool thread that has no thread-local subscriber, so the dispatcher is
/// carried along with the span.
#[derive(Debug, Clone, Default)]
pub struct SpanPropagatingProvider<P = TokioProvider> {
    inner: P,
}

impl<P: ExecutionContextProvider> SpanPropagatingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: ExecutionContextProvider> ExecutionContextProvider for SpanPropagatingProvider<P> {
    fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner
            .spawn(future.instrument(Span::current()).with_current_subscriber())
    }

    fn spawn_blocking<F, R>(&self, work: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let span = Span::current();
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        self.inner.spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || span.in_scope(work))
        })
    }
}
