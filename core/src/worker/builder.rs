//! Builder pattern for WorkerPool construction

use crate::channel::ChannelConfig;
use crate::config::{ConfigError, LoadProfile};
use crate::error::LoadResult;
use crate::traits::HttpTransport;

use super::executor::RequestExecutor;
use super::pool::WorkerPool;

use std::sync::Arc;
use std::time::Duration;

/// Builder for creating WorkerPool instances
///
/// # Example
/// ```ignore
/// let pool = WorkerPoolBuilder::new()
///     .transport(transport)
///     .workers(10)
///     .rate_limit(Some(50.0))
///     .build()?;
/// ```
#[derive(Default)]
pub struct WorkerPoolBuilder {
    transport: Option<Arc<dyn HttpTransport>>,
    workers: Option<usize>,
    rate_limit: Option<f64>,
    request_timeout: Option<Duration>,
    result_buffer: usize,
}

impl WorkerPoolBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            result_buffer: ChannelConfig::default().result_buffer,
            ..Default::default()
        }
    }

    /// Take worker count, rate limit and timeout from a profile
    pub fn profile(self, profile: &LoadProfile) -> Self {
        self.workers(profile.workers)
            .rate_limit(profile.rate_limit)
            .request_timeout(profile.request_timeout)
    }

    /// Set the HTTP transport shared by every worker
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the number of workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the per-worker rate limit (requests per second)
    pub fn rate_limit(mut self, rps: Option<f64>) -> Self {
        self.rate_limit = rps;
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the result channel buffer size
    pub fn result_buffer(mut self, buffer: usize) -> Self {
        self.result_buffer = buffer.max(1);
        self
    }

    /// Build the WorkerPool
    ///
    /// # Errors
    /// Returns a configuration error if the transport or worker count is
    /// missing, or if the worker count is zero.
    pub fn build(self) -> LoadResult<WorkerPool> {
        let transport = self.transport.ok_or(ConfigError::Missing("transport"))?;
        let workers = self.workers.ok_or(ConfigError::Missing("workers"))?;

        if workers == 0 {
            return Err(ConfigError::InvalidWorkers("worker count must be at least 1".into()).into());
        }

        let executor = RequestExecutor::new(transport).with_timeout(self.request_timeout);

        Ok(WorkerPool {
            workers,
            executor,
            rate_limit: self.rate_limit,
            result_buffer: self.result_buffer.max(1),
        })
    }
}

impl std::fmt::Debug for WorkerPoolBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPoolBuilder")
            .field("transport", &self.transport.as_ref().map(|t| t.name().to_string()))
            .field("workers", &self.workers)
            .field("rate_limit", &self.rate_limit)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_builder_missing_transport() {
        let err = WorkerPoolBuilder::new().workers(4).build().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing("transport"))));
        assert!(err.to_string().contains("transport"));
    }

    #[test]
    fn test_builder_missing_workers() {
        let err = WorkerPool::builder().build().unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Missing(_))));
    }
}
