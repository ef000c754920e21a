//! reqwest-backed HTTP transport for httpload
//!
//! Provides [`ReqwestTransport`], the [`HttpTransport`] implementation used
//! by the `httpload` binary. A single instance, and therefore a single
//! connection pool, is shared by every worker of a run.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use httpload_core::{HttpResponse, HttpTransport, TransportError};

/// Default `User-Agent` header
pub const DEFAULT_USER_AGENT: &str = concat!("httpload/", env!("CARGO_PKG_VERSION"));

/// [`HttpTransport`] over a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    connect_timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// Create a transport with default settings
    pub fn new() -> Result<Self, TransportError> {
        Self::builder().build()
    }

    /// Start building a transport
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Map a reqwest failure onto the transport error kinds
    ///
    /// The client carries no request timeout, so a reqwest timeout can only
    /// come from the connect timeout.
    fn classify(&self, err: reqwest::Error) -> TransportError {
        let message = error_chain(&err);

        if err.is_timeout() {
            match self.connect_timeout {
                Some(timeout) => TransportError::Timeout(timeout),
                None => TransportError::Connect(message),
            }
        } else if err.is_builder() {
            TransportError::InvalidUrl(message)
        } else if err.is_connect() {
            TransportError::Connect(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(message)
        } else {
            TransportError::Request(message)
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();

        let body = response
            .bytes_stream()
            .map_err(|e| TransportError::Body(e.to_string()));

        Ok(HttpResponse::new(status, Box::pin(body)))
    }
}

/// Builder for [`ReqwestTransport`]
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    user_agent: String,
    connect_timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: None,
            pool_max_idle_per_host: None,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Set the `User-Agent` header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the TCP connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the number of idle connections kept per host
    ///
    /// Matching this to the worker count lets every worker reuse its
    /// connection.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Build the transport
    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(max) = self.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(
            connect_timeout = ?self.connect_timeout,
            pool_max_idle_per_host = ?self.pool_max_idle_per_host,
            "HTTP client ready"
        );

        Ok(ReqwestTransport {
            client,
            connect_timeout: self.connect_timeout,
        })
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    use std::error::Error as _;

    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
