//! Core traits for HTTP transports
//!
//! The trait is defined in core so that the pipeline does not depend on a
//! particular HTTP client. Implementations live in their own crates
//! (`transport/`).

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt;
use std::pin::Pin;

/// Stream of response body chunks
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

// ============================================================================
// HTTP Transport Trait
// ============================================================================

/// Capability to perform a GET request
///
/// One transport instance is shared by every executor of a run, so
/// implementations must tolerate concurrent use without external locking.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Transport identifier (e.g., "reqwest")
    fn name(&self) -> &str;

    /// Send a GET request and resolve once the response headers arrive
    ///
    /// Dropping the returned future abandons the request.
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// Response
// ============================================================================

/// Response headers plus the not-yet-consumed body
pub struct HttpResponse {
    status: u16,
    body: BodyStream,
}

impl HttpResponse {
    /// Create a response from a status code and body stream
    pub fn new(status: u16, body: BodyStream) -> Self {
        Self { status, body }
    }

    /// Create a response with an empty body
    pub fn empty(status: u16) -> Self {
        Self::new(status, Box::pin(futures::stream::empty()))
    }

    /// HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Read the body to the end, returning the number of bytes read
    ///
    /// The body stream is consumed and dropped whether or not reading
    /// succeeds, which releases the underlying connection.
    pub async fn drain(mut self) -> Result<u64, TransportError> {
        let mut total = 0u64;
        while let Some(chunk) = self.body.next().await {
            total += chunk?.len() as u64;
        }
        Ok(total)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
