//! Deadline middleware for tower services.
//!
//! Wraps any `tower::Service` so each call runs on its own execution context
//! under the executor's deadline. Inner errors come back as
//! `DeadlineError::Failed`, inner panics are resumed in the caller.

use futures_util::future::BoxFuture;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};

use crate::config::ExecutorConfig;
use crate::resilience::provider::{ExecutionContextProvider, TokioProvider};
use crate::resilience::timeouts::DeadlineExecutor;
use crate::resilience::types::DeadlineError;

/// Layer that applies [`DeadlineService`] to an inner service.
#[derive(Debug, Clone)]
pub struct DeadlineLayer<P = TokioProvider> {
    executor: DeadlineExecutor<P>,
}

impl DeadlineLayer<TokioProvider> {
    pub fn new(deadline: Duration) -> Self {
        Self::with_executor(DeadlineExecutor::new(deadline))
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::with_executor(DeadlineExecutor::from_config(config))
    }
}

impl<P> DeadlineLayer<P> {
    pub fn with_executor(executor: DeadlineExecutor<P>) -> Self {
        Self { executor }
    }
}

impl<S, P: Clone> Layer<S> for DeadlineLayer<P> {
    type Service = DeadlineService<S, P>;

    fn layer(&self, inner: S) -> Self::Service {
        DeadlineService {
            inner,
            executor: self.executor.clone(),
        }
    }
}

/// Service that runs every call of `S` under a deadline.
#[derive(Debug, Clone)]
pub struct DeadlineService<S, P = TokioProvider> {
    inner: S,
    executor: DeadlineExecutor<P>,
}

impl<S, P, Req> Service<Req> for DeadlineService<S, P>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    P: ExecutionContextProvider + Clone + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = DeadlineError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(DeadlineError::Failed)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // The driven-to-ready instance goes into the spawned context.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let executor = self.executor.clone();

        Box::pin(async move {
            executor
                .run(move || {
                    let mut inner = inner;
                    inner.call(req)
                })
                .await
        })
    }
}
