//! Load profile configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default number of concurrent workers
pub const DEFAULT_WORKERS: usize = 50;

/// Default number of requests for count-bounded runs
pub const DEFAULT_REQUESTS: usize = 200;

/// How a run decides it has issued enough requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCondition {
    /// Issue exactly N requests in total, shared by all workers
    RequestCount(usize),

    /// Issue requests until the duration elapses
    Duration(Duration),
}

/// Immutable run configuration
///
/// Built once at startup and shared read-only by every stage of the
/// pipeline. `requests` is ignored when a non-zero `duration` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadProfile {
    /// URL every request is sent to
    pub target_url: String,

    /// Number of concurrent workers
    pub workers: usize,

    /// Total number of requests for count-bounded runs
    pub requests: usize,

    /// Run duration; when set the request count is ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,

    /// Per-worker rate limit in requests per second
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<f64>,

    /// Per-request timeout, measured up to the response headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            workers: DEFAULT_WORKERS,
            requests: DEFAULT_REQUESTS,
            duration: None,
            rate_limit: None,
            request_timeout: None,
        }
    }
}

impl LoadProfile {
    /// Create a profile for the given target with default volume settings
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Default::default()
        }
    }

    /// Set the number of concurrent workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the total request count
    pub fn with_requests(mut self, requests: usize) -> Self {
        self.requests = requests;
        self
    }

    /// Set the run duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the per-worker rate limit
    pub fn with_rate_limit(mut self, rps: f64) -> Self {
        self.rate_limit = Some(rps);
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// The run duration, if one is in effect (zero counts as unset)
    pub fn effective_duration(&self) -> Option<Duration> {
        self.duration.filter(|d| !d.is_zero())
    }

    /// Resolve the stop condition for this profile
    pub fn stop_condition(&self) -> StopCondition {
        match self.effective_duration() {
            Some(duration) => StopCondition::Duration(duration),
            None => StopCondition::RequestCount(self.requests),
        }
    }

    /// Validate the profile
    ///
    /// Must pass before any network activity takes place.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_url.trim().is_empty() {
            return Err(ConfigError::EmptyTarget);
        }

        let target = Url::parse(self.target_url.trim())
            .map_err(|e| ConfigError::InvalidTarget(format!("{}: {e}", self.target_url)))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidTarget(format!(
                "{}: unsupported scheme {:?}",
                self.target_url,
                target.scheme()
            )));
        }

        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkers(
                "worker count must be at least 1".into(),
            ));
        }

        if self.effective_duration().is_none() && self.requests < self.workers {
            return Err(ConfigError::RequestsBelowWorkers {
                requests: self.requests,
                workers: self.workers,
            });
        }

        if let Some(rps) = self.rate_limit {
            if !rps.is_finite() || rps <= 0.0 {
                return Err(ConfigError::InvalidRateLimit(format!(
                    "rate limit must be a positive number, got {rps}"
                )));
            }
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "request timeout must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// No target URL was given
    #[error("no URL provided")]
    EmptyTarget,

    /// The target is not an absolute http(s) URL
    #[error("invalid URL {0}")]
    InvalidTarget(String),

    /// Invalid worker count
    #[error("invalid worker count: {0}")]
    InvalidWorkers(String),

    /// Count-bounded run with fewer requests than workers
    #[error("the number of requests to run ({requests}) cannot be less than the number of workers ({workers})")]
    RequestsBelowWorkers {
        /// Configured request count
        requests: usize,
        /// Configured worker count
        workers: usize,
    },

    /// Invalid rate limit
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid request timeout
    #[error("invalid request timeout: {0}")]
    InvalidTimeout(String),

    /// A builder was finished without a required component
    #[error("missing required component: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = LoadProfile::default();
        assert_eq!(profile.workers, 50);
        assert_eq!(profile.requests, 200);
        assert!(profile.duration.is_none());
        assert!(profile.rate_limit.is_none());
    }

    #[test]
    fn test_profile_builder_pattern() {
        let profile = LoadProfile::new("http://localhost:8080")
            .with_workers(10)
            .with_requests(100)
            .with_rate_limit(25.0)
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(profile.workers, 10);
        assert_eq!(profile.requests, 100);
        assert_eq!(profile.rate_limit, Some(25.0));
        assert_eq!(profile.request_timeout, Some(Duration::from_secs(5)));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_target() {
        let profile = LoadProfile::new("  ");
        assert_eq!(profile.validate(), Err(ConfigError::EmptyTarget));
    }

    #[test]
    fn test_validation_rejects_unparseable_target() {
        for target in ["not a url", "localhost:8080/", "ftp://localhost/", "/relative/path"] {
            let profile = LoadProfile::new(target)
                .with_workers(4)
                .with_duration(Duration::from_millis(300));
            assert!(
                matches!(profile.validate(), Err(ConfigError::InvalidTarget(_))),
                "{target:?} should be rejected"
            );
        }

        assert!(LoadProfile::new("https://example.com:8443/path?q=1")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validation_zero_workers() {
        let profile = LoadProfile::new("http://localhost").with_workers(0);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidWorkers(_))
        ));
    }

    #[test]
    fn test_validation_requests_below_workers() {
        let profile = LoadProfile::new("http://localhost")
            .with_workers(10)
            .with_requests(5);

        let err = profile.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::RequestsBelowWorkers {
                requests: 5,
                workers: 10
            }
        );
        assert!(err.to_string().contains("(5)"));
        assert!(err.to_string().contains("(10)"));
    }

    #[test]
    fn test_validation_duration_ignores_request_count() {
        let profile = LoadProfile::new("http://localhost")
            .with_workers(10)
            .with_requests(5)
            .with_duration(Duration::from_secs(2));

        assert!(profile.validate().is_ok());
        assert_eq!(
            profile.stop_condition(),
            StopCondition::Duration(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_zero_duration_is_unset() {
        let profile = LoadProfile::new("http://localhost")
            .with_workers(10)
            .with_requests(5)
            .with_duration(Duration::ZERO);

        assert!(profile.effective_duration().is_none());
        assert_eq!(profile.stop_condition(), StopCondition::RequestCount(5));
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validation_rate_limit() {
        let profile = LoadProfile::new("http://localhost").with_rate_limit(-1.0);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidRateLimit(_))
        ));

        let profile = LoadProfile::new("http://localhost").with_rate_limit(f64::NAN);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let profile = LoadProfile::new("http://localhost").with_request_timeout(Duration::ZERO);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_profile_serialization() {
        let profile = LoadProfile::new("http://localhost:9000")
            .with_workers(4)
            .with_requests(40);

        let json = serde_json::to_string(&profile).unwrap();
        assert!(!json.contains("rate_limit"));

        let deserialized: LoadProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, profile);
    }
}
