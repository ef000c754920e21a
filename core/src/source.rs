//! Request source: the first pipeline stage
//!
//! Emits [`RequestTask`]s into a bounded queue shared by every worker. A
//! count-bounded run emits exactly `requests` tasks and closes the queue; a
//! duration-bounded run emits until the run is cancelled. Every send races
//! the cancellation token, so the source never stays blocked on a full queue
//! once the run is being torn down.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, LoadProfile, StopCondition};
use crate::error::LoadResult;
use crate::request::RequestTask;

/// Receiving side of the task queue, shared by all workers
///
/// Each task is handed to exactly one caller of [`TaskStream::next`].
#[derive(Debug, Clone)]
pub struct TaskStream {
    inner: Arc<Mutex<mpsc::Receiver<RequestTask>>>,
}

impl TaskStream {
    /// Wrap a receiver so it can be shared
    pub fn new(rx: mpsc::Receiver<RequestTask>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rx)),
        }
    }

    /// Wait for the next task; `None` once the source has finished
    ///
    /// Cancel-safe: dropping the future releases the queue without losing a
    /// task.
    pub async fn next(&self) -> Option<RequestTask> {
        self.inner.lock().await.recv().await
    }
}

/// Generates the tasks of one run
#[derive(Debug)]
pub struct RequestSource {
    url: Arc<str>,
    limit: Option<usize>,
    buffer: usize,
}

impl RequestSource {
    /// Create a source for the given profile
    ///
    /// Fails with a configuration error when the target is empty.
    pub fn new(profile: &LoadProfile) -> LoadResult<Self> {
        if profile.target_url.trim().is_empty() {
            return Err(ConfigError::EmptyTarget.into());
        }

        let limit = match profile.stop_condition() {
            StopCondition::RequestCount(n) => Some(n),
            StopCondition::Duration(_) => None,
        };

        Ok(Self {
            url: Arc::from(profile.target_url.as_str()),
            limit,
            buffer: 1,
        })
    }

    /// Set the task queue buffer size
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Number of tasks this source will emit, `None` for unbounded
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Start emitting tasks
    ///
    /// Returns the shared task stream and the stage's completion handle,
    /// which resolves to the number of tasks emitted.
    pub fn generate(self, cancel: CancellationToken) -> (TaskStream, JoinHandle<LoadResult<u64>>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let handle = tokio::spawn(self.emit(tx, cancel));
        (TaskStream::new(rx), handle)
    }

    async fn emit(self, tx: mpsc::Sender<RequestTask>, cancel: CancellationToken) -> LoadResult<u64> {
        let mut emitted: u64 = 0;

        tracing::debug!(limit = ?self.limit, "Request source started");

        loop {
            if self.limit.is_some_and(|limit| emitted >= limit as u64) {
                break;
            }

            let task = RequestTask::new(emitted, Arc::clone(&self.url));

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tracing::debug!(emitted, "Request source cancelled");
                    break;
                }

                sent = tx.send(task) => {
                    if sent.is_err() {
                        tracing::debug!(emitted, "Task queue closed, request source stopping");
                        break;
                    }
                    emitted += 1;
                }
            }
        }

        tracing::debug!(emitted, "Request source finished");
        Ok(emitted)
    }
}
