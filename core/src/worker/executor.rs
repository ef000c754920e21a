//! Single-request execution

use crate::error::{Error, LoadResult, TransportError};
use crate::request::RequestTask;
use crate::response::RequestResult;
use crate::traits::{HttpResponse, HttpTransport};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Performs one GET for a task and times it
///
/// Latency runs from dispatch to the arrival of the response headers. The
/// body is then drained outside the measurement; on every exit path the
/// response is dropped, which releases its connection.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    timeout: Option<Duration>,
}

impl RequestExecutor {
    /// Create an executor over a shared transport
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute a single request
    ///
    /// Any HTTP status is a successful result. Returns [`Error::Cancelled`]
    /// promptly when `cancel` fires, abandoning the in-flight request, and
    /// [`Error::Transport`] on network failures.
    pub async fn execute(
        &self,
        task: &RequestTask,
        cancel: &CancellationToken,
    ) -> LoadResult<RequestResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let start = Instant::now();
        let response = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(Error::Cancelled),

            response = self.dispatch(task.url()) => response?,
        };
        let latency = start.elapsed();
        let status = response.status();

        let bytes = tokio::select! {
            biased;

            _ = cancel.cancelled() => return Err(Error::Cancelled),

            drained = response.drain() => drained?,
        };

        tracing::trace!(
            request_id = %task.id,
            status,
            bytes,
            latency_ms = latency.as_secs_f64() * 1000.0,
            "Request completed"
        );

        Ok(RequestResult::new(task.id, status, latency))
    }

    async fn dispatch(&self, url: &str) -> Result<HttpResponse, TransportError> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.transport.get(url))
                .await
                .map_err(|_| TransportError::Timeout(timeout))?,
            None => self.transport.get(url).await,
        }
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("transport", &self.transport.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
