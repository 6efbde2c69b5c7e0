//! Deadline-bounded HTTP request pipeline.
//!
//! # Responsibilities
//! - Send one request and read its full body as a single unit of work
//! - Apply the executor's deadline to the whole chain, body included
//! - Hand reqwest errors back unchanged
//!
//! # Design Decisions
//! - The client is cloned into the spawned context (cheap, Arc inside)
//! - Status handling is opt-in via `error_for_status`

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Request, RequestBuilder, StatusCode, Url};

use crate::config::DeadlineConfig;
use crate::resilience::provider::{ExecutionContextProvider, TokioProvider};
use crate::resilience::timeouts::DeadlineExecutor;
use crate::resilience::types::DeadlineError;

/// Fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl PipelineResponse {
    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result type for pipeline operations.
pub type PipelineResult = Result<PipelineResponse, DeadlineError<reqwest::Error>>;

/// HTTP client whose every request runs under a deadline.
#[derive(Debug, Clone)]
pub struct HttpPipeline<P = TokioProvider> {
    client: Client,
    executor: DeadlineExecutor<P>,
    error_for_status: bool,
}

impl HttpPipeline<TokioProvider> {
    /// Build the client and executor from configuration.
    pub fn from_config(config: &DeadlineConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.http.user_agent.as_str())
            .build()?;

        Ok(Self::new(client, DeadlineExecutor::from_config(&config.executor))
            .with_error_for_status(config.http.error_for_status))
    }
}

impl<P: ExecutionContextProvider> HttpPipeline<P> {
    pub fn new(client: Client, executor: DeadlineExecutor<P>) -> Self {
        Self {
            client,
            executor,
            error_for_status: false,
        }
    }

    pub fn with_error_for_status(mut self, enabled: bool) -> Self {
        self.error_for_status = enabled;
        self
    }

    pub fn with_executor<Q: ExecutionContextProvider>(
        self,
        executor: DeadlineExecutor<Q>,
    ) -> HttpPipeline<Q> {
        HttpPipeline {
            client: self.client,
            executor,
            error_for_status: self.error_for_status,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn executor(&self) -> &DeadlineExecutor<P> {
        &self.executor
    }

    /// Start building a request on the underlying client.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send `request` and buffer the response, all within the deadline.
    pub async fn send(&self, request: Request) -> PipelineResult {
        let client = self.client.clone();
        let error_for_status = self.error_for_status;
        let method = request.method().clone();
        let target = log_target(request.url());

        tracing::debug!(method = %method, target = %target, "Sending request");

        self.executor
            .run(move || async move {
                let response = client.execute(request).await?;
                let response = if error_for_status {
                    response.error_for_status()?
                } else {
                    response
                };

                let status = response.status();
                let headers = response.headers().clone();
                let body = response.bytes().await?.to_vec();

                Ok::<_, reqwest::Error>(PipelineResponse {
                    status,
                    headers,
                    body,
                })
            })
            .await
    }

    /// Convenience GET.
    pub async fn get(&self, url: &str) -> PipelineResult {
        let request = self.client.get(url).build().map_err(DeadlineError::Failed)?;
        self.send(request).await
    }
}

/// Host, port and path of `url`; userinfo and query are left out of logs.
fn log_target(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, url.path()),
        None => format!("{}{}", host, url.path()),
    }
}
