//! Response types: the timed outcome of one request

use crate::request::RequestId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one completed request attempt
///
/// Any HTTP response produces a result regardless of its status code;
/// transport failures produce none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestResult {
    /// Task this result belongs to
    pub request_id: RequestId,

    /// HTTP status code
    pub status: u16,

    /// Time from dispatch to response headers
    pub latency: Duration,
}

impl RequestResult {
    /// Create a new result
    pub fn new(request_id: RequestId, status: u16, latency: Duration) -> Self {
        Self {
            request_id,
            status,
            latency,
        }
    }
}
