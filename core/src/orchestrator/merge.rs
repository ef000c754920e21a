//! Merging stage completion signals into one terminal error

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, LoadResult};

/// Holds the first fatal error reported by any stage
///
/// Recording a fatal error cancels the run; later errors are only logged.
#[derive(Debug, Default)]
pub(crate) struct FirstError {
    slot: Mutex<Option<Error>>,
}

impl FirstError {
    pub(crate) fn record(&self, stage: &'static str, err: Error, cancel: &CancellationToken) {
        if err.is_cancellation() {
            tracing::debug!(stage, "Stage observed cancellation");
            return;
        }

        tracing::error!(stage, error = %err, "Stage failed, cancelling run");
        cancel.cancel();

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub(crate) fn take(&self) -> Option<Error> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Await one stage, folding a failure or panic into `first`
pub(crate) async fn join_stage<T>(
    stage: &'static str,
    handle: JoinHandle<LoadResult<T>>,
    first: &FirstError,
    cancel: &CancellationToken,
) -> Option<T> {
    let outcome = match handle.await {
        Ok(outcome) => outcome,
        Err(e) => Err(Error::invariant(format!("{stage} task failed: {e}"))),
    };

    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            first.record(stage, err, cancel);
            None
        }
    }
}

/// Drain the worker error stream, tallying transport errors by kind
///
/// Anything fatal is recorded in `first` instead.
pub(crate) async fn count_errors(
    mut errors: mpsc::UnboundedReceiver<Error>,
    first: &FirstError,
    cancel: &CancellationToken,
) -> BTreeMap<&'static str, usize> {
    let mut tally = BTreeMap::new();
    while let Some(err) = errors.recv().await {
        match err {
            Error::Transport(e) => *tally.entry(e.kind()).or_insert(0) += 1,
            Error::Cancelled => {}
            err => first.record("worker", err, cancel),
        }
    }
    tally
}
