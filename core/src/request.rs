//! Request task types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Run-unique identifier of a request task, assigned in emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// A single unit of load-generation work
///
/// The target is constant across a run today, but each task carries its own
/// URL so the pipeline does not care where targets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTask {
    /// Sequence id within the run
    pub id: RequestId,

    /// Target URL (shared, cheap to clone)
    pub url: Arc<str>,
}

impl RequestTask {
    /// Create a new task
    pub fn new(id: u64, url: Arc<str>) -> Self {
        Self {
            id: RequestId(id),
            url,
        }
    }

    /// The target URL as a string slice
    pub fn url(&self) -> &str {
        &self.url
    }
}
