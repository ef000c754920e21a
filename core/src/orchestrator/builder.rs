//! Builder pattern for Orchestrator construction

use std::sync::Arc;
use std::time::Duration;

use crate::channel::ChannelConfig;
use crate::config::{ConfigError, LoadProfile};
use crate::error::LoadResult;
use crate::traits::HttpTransport;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .target("http://localhost:8080/")
///     .workers(10)
///     .requests(1000)
///     .transport(transport)
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    profile: LoadProfile,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            profile: LoadProfile::default(),
            transport: None,
        }
    }

    /// Set the full load profile
    pub fn profile(mut self, profile: LoadProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the target URL
    pub fn target(mut self, url: impl Into<String>) -> Self {
        self.profile.target_url = url.into();
        self
    }

    /// Set the number of workers
    pub fn workers(mut self, workers: usize) -> Self {
        self.profile.workers = workers;
        self
    }

    /// Set the total request count
    pub fn requests(mut self, requests: usize) -> Self {
        self.profile.requests = requests;
        self
    }

    /// Set the run duration
    pub fn duration(mut self, duration: Option<Duration>) -> Self {
        self.profile.duration = duration;
        self
    }

    /// Set the per-worker rate limit (requests per second)
    pub fn rate_limit(mut self, rps: Option<f64>) -> Self {
        self.profile.rate_limit = rps;
        self
    }

    /// Set the HTTP transport
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is not set or if profile
    /// validation fails.
    pub fn build(self) -> LoadResult<Orchestrator> {
        let transport = self.transport.ok_or(ConfigError::Missing("transport"))?;

        self.profile.validate()?;

        Ok(Orchestrator::new(
            self.profile,
            transport,
            ChannelConfig::default(),
        ))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
