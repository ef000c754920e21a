//! Result collection: the last pipeline stage

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::LoadResult;
use crate::metrics::ResultSet;
use crate::response::RequestResult;

/// Single writer of a run's [`ResultSet`]
///
/// Appends every result it receives and publishes the running count on a
/// watch channel for progress displays.
#[derive(Debug)]
pub struct Aggregator {
    progress: Arc<watch::Sender<usize>>,
}

impl Aggregator {
    /// Create an aggregator that reports progress on `progress`
    pub fn new(progress: Arc<watch::Sender<usize>>) -> Self {
        Self { progress }
    }

    /// Create an aggregator with nobody watching its progress
    pub fn detached() -> Self {
        let (tx, _) = watch::channel(0);
        Self::new(Arc::new(tx))
    }

    /// Run [`collect`](Self::collect) on its own task
    pub fn spawn(
        self,
        results: mpsc::Receiver<RequestResult>,
        cancel: CancellationToken,
    ) -> JoinHandle<LoadResult<ResultSet>> {
        tokio::spawn(async move { self.collect(results, cancel).await })
    }

    /// Collect results until the stream closes, then seal the set
    ///
    /// On cancellation the stream is closed to new senders and whatever is
    /// already buffered is still appended, so the returned set holds every
    /// result a worker managed to deliver.
    ///
    /// # Errors
    /// Returns an invariant error on a duplicated request id.
    pub async fn collect(
        &self,
        mut results: mpsc::Receiver<RequestResult>,
        cancel: CancellationToken,
    ) -> LoadResult<ResultSet> {
        let mut set = ResultSet::new();
        self.progress.send_replace(0);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    results.close();
                    while let Some(result) = results.recv().await {
                        self.append(&mut set, result)?;
                    }
                    tracing::debug!(collected = set.len(), "Aggregator drained after cancellation");
                    break;
                }

                next = results.recv() => match next {
                    Some(result) => self.append(&mut set, result)?,
                    None => break,
                },
            }
        }

        set.seal();
        tracing::debug!(collected = set.len(), "Result set sealed");
        Ok(set)
    }

    fn append(&self, set: &mut ResultSet, result: RequestResult) -> LoadResult<()> {
        set.push(result)?;
        self.progress.send_replace(set.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::request::RequestId;
    use std::time::Duration;

    fn result(id: u64) -> RequestResult {
        RequestResult::new(RequestId(id), 200, Duration::from_millis(id + 1))
    }

    #[tokio::test]
    async fn test_collect_until_closed() {
        let (tx, rx) = mpsc::channel(16);
        let aggregator = Aggregator::detached();

        for id in 0..10 {
            tx.send(result(id)).await.unwrap();
        }
        drop(tx);

        let set = aggregator.collect(rx, CancellationToken::new()).await.unwrap();
        assert_eq!(set.len(), 10);
        assert!(set.is_sealed());
    }

    #[tokio::test]
    async fn test_collect_publishes_progress() {
        let (progress_tx, progress_rx) = watch::channel(0);
        let aggregator = Aggregator::new(Arc::new(progress_tx));
        let (tx, rx) = mpsc::channel(16);

        for id in 0..3 {
            tx.send(result(id)).await.unwrap();
        }
        drop(tx);

        aggregator.collect(rx, CancellationToken::new()).await.unwrap();
        assert_eq!(*progress_rx.borrow(), 3);
    }

    #[tokio::test]
    async fn test_collect_drains_buffer_on_cancel() {
        let (tx, rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        tx.send(result(0)).await.unwrap();
        tx.send(result(1)).await.unwrap();
        cancel.cancel();

        // The sender is still alive: only cancellation ends collection
        let set = tokio::time::timeout(
            Duration::from_millis(500),
            Aggregator::detached().collect(rx, cancel),
        )
        .await
        .expect("aggregator ignored cancellation")
        .unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.is_sealed());
        assert!(tx.send(result(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_collect_rejects_duplicate_ids() {
        let (tx, rx) = mpsc::channel(16);
        tx.send(result(5)).await.unwrap();
        tx.send(result(5)).await.unwrap();
        drop(tx);

        let err = Aggregator::detached()
            .collect(rx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
    }
}
