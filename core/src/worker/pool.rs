//! Worker pool: N workers draining one shared task queue

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, LoadResult};
use crate::response::RequestResult;
use crate::source::TaskStream;

use super::builder::WorkerPoolBuilder;
use super::executor::RequestExecutor;
use super::rate_limiter::RequestRateLimiter;
use super::stats::WorkerStats;

/// Streams handed back by [`WorkerPool::run`]
#[derive(Debug)]
pub struct PoolHandles {
    /// Results of completed requests; closes once every worker has exited
    pub results: mpsc::Receiver<RequestResult>,

    /// Per-request transport errors, for logging and counting
    pub errors: mpsc::UnboundedReceiver<Error>,

    /// Resolves to the per-worker stats, ordered by worker id
    ///
    /// A panicking worker cancels the token passed to [`WorkerPool::run`]
    /// and makes this resolve to an invariant error.
    pub completion: JoinHandle<LoadResult<Vec<WorkerStats>>>,
}

/// A fixed number of workers sharing one executor configuration
#[derive(Debug)]
pub struct WorkerPool {
    pub(crate) workers: usize,
    pub(crate) executor: RequestExecutor,
    pub(crate) rate_limit: Option<f64>,
    pub(crate) result_buffer: usize,
}

impl WorkerPool {
    /// Start building a pool
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::new()
    }

    /// Number of workers this pool runs
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn every worker and return the pool's output streams
    ///
    /// Exactly `workers` tasks are spawned up front; each pulls from the
    /// shared `tasks` stream until it closes or `cancel` fires.
    pub fn run(self, tasks: TaskStream, cancel: CancellationToken) -> PoolHandles {
        let (result_tx, result_rx) = mpsc::channel(self.result_buffer);
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        let mut set = JoinSet::new();
        for id in 0..self.workers {
            let worker = Worker {
                id,
                executor: self.executor.clone(),
                rate_limiter: RequestRateLimiter::new(self.rate_limit),
                tasks: tasks.clone(),
                results: result_tx.clone(),
                errors: error_tx.clone(),
            };
            set.spawn(worker.run(cancel.clone()));
        }

        tracing::debug!(workers = self.workers, "Worker pool started");

        PoolHandles {
            results: result_rx,
            errors: error_rx,
            completion: tokio::spawn(join_workers(set, cancel)),
        }
    }
}

/// Join every worker; the first panic cancels the remaining ones
async fn join_workers(
    mut set: JoinSet<WorkerStats>,
    cancel: CancellationToken,
) -> LoadResult<Vec<WorkerStats>> {
    let mut stats = Vec::with_capacity(set.len());
    let mut panicked = 0usize;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(worker_stats) => {
                tracing::debug!(
                    worker_id = worker_stats.worker_id,
                    completed = worker_stats.completed,
                    errors = worker_stats.errors,
                    "Worker completed"
                );
                stats.push(worker_stats);
            }
            Err(e) => {
                panicked += 1;
                tracing::error!(error = %e, "Worker task panicked, stopping pool");
                cancel.cancel();
            }
        }
    }

    if panicked > 0 {
        return Err(Error::invariant(format!("{panicked} worker task(s) panicked")));
    }

    stats.sort_by_key(|s| s.worker_id);
    Ok(stats)
}

/// One executor loop: pull, wait for a permit, execute, report
struct Worker {
    id: usize,
    executor: RequestExecutor,
    rate_limiter: RequestRateLimiter,
    tasks: TaskStream,
    results: mpsc::Sender<RequestResult>,
    errors: mpsc::UnboundedSender<Error>,
}

impl Worker {
    async fn run(self, cancel: CancellationToken) -> WorkerStats {
        let mut stats = WorkerStats::begin(self.id);

        loop {
            if !self.rate_limiter.acquire(&cancel).await {
                break;
            }

            let task = tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                task = self.tasks.next() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            match self.executor.execute(&task, &cancel).await {
                Ok(result) => {
                    // A finished result is delivered unless the aggregator is gone
                    let delivered = tokio::select! {
                        biased;
                        sent = self.results.send(result) => sent.is_ok(),
                        _ = cancel.cancelled() => false,
                    };
                    if !delivered {
                        break;
                    }
                    stats.record_success();
                }
                Err(Error::Cancelled) => break,
                Err(e) => {
                    stats.record_error();
                    tracing::warn!(
                        worker_id = self.id,
                        request_id = %task.id,
                        error = %e,
                        "Request failed"
                    );
                    let _ = self.errors.send(e);
                }
            }
        }

        stats.finish();
        tracing::debug!(
            worker_id = self.id,
            completed = stats.completed,
            errors = stats.errors,
            "Worker stopped"
        );
        stats
    }
}
