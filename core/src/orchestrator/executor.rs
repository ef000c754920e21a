//! Orchestrator execution logic

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::channel::ChannelConfig;
use crate::config::LoadProfile;
use crate::error::{Error, LoadResult};
use crate::metrics::{ResultSet, Summary};
use crate::source::RequestSource;
use crate::traits::HttpTransport;
use crate::worker::{PoolHandles, PoolTotals, WorkerPool, WorkerStats};

use super::aggregator::Aggregator;
use super::merge::{count_errors, join_stage, FirstError};

/// Why a run stopped issuing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every task was issued and every stage finished on its own
    Completed,
    /// The configured duration elapsed
    DeadlineElapsed,
    /// The run was cancelled from outside (e.g. Ctrl+C)
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Completed => "completed",
            StopReason::DeadlineElapsed => "deadline elapsed",
            StopReason::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunOutcome {
    /// Statistics over every collected result
    pub summary: Summary,

    /// The sealed result set
    pub results: ResultSet,

    /// How the run ended
    pub stop_reason: StopReason,

    /// Wall-clock time from start to the last stage joining
    pub elapsed: Duration,

    /// Number of requests that failed at the transport level
    pub transport_errors: usize,

    /// Transport errors keyed by [`TransportError::kind`](crate::TransportError::kind)
    pub errors_by_kind: BTreeMap<&'static str, usize>,

    /// Per-worker statistics, ordered by worker id
    pub worker_stats: Vec<WorkerStats>,
}

impl RunOutcome {
    /// Results per second of wall-clock time
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.results.len() as f64 / secs
        } else {
            0.0
        }
    }

    /// Totals across all workers
    pub fn totals(&self) -> PoolTotals {
        PoolTotals::from_stats(&self.worker_stats)
    }
}

/// Pipeline coordinator for one load run
///
/// Wires source, worker pool and aggregator to a single cancellation token
/// per run, waits for natural completion, the deadline or an external
/// cancel, and joins every stage before summarizing.
pub struct Orchestrator {
    pub(crate) profile: LoadProfile,
    pub(crate) transport: Arc<dyn HttpTransport>,
    pub(crate) channels: ChannelConfig,
    pub(crate) progress: Arc<watch::Sender<usize>>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        profile: LoadProfile,
        transport: Arc<dyn HttpTransport>,
        channels: ChannelConfig,
    ) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            profile,
            transport,
            channels,
            progress: Arc::new(progress),
        }
    }

    /// Get the load profile
    pub fn profile(&self) -> &LoadProfile {
        &self.profile
    }

    /// Subscribe to the number of results collected so far
    pub fn progress(&self) -> watch::Receiver<usize> {
        self.progress.subscribe()
    }

    /// Execute one run
    ///
    /// Cancelling `external` stops the run early; the results collected up
    /// to that point are still summarized. The token is never cancelled by
    /// the run itself.
    ///
    /// # Errors
    /// Configuration errors are returned before any request is sent. A
    /// fatal stage error (an invariant violation or a panicked stage) is
    /// returned after every stage has been joined.
    pub async fn run_once(&self, external: CancellationToken) -> LoadResult<RunOutcome> {
        self.profile.validate()?;

        let source = RequestSource::new(&self.profile)?.with_buffer(self.channels.task_buffer);
        let pool = WorkerPool::builder()
            .profile(&self.profile)
            .transport(Arc::clone(&self.transport))
            .result_buffer(self.channels.result_buffer)
            .build()?;

        tracing::info!(
            target_url = %self.profile.target_url,
            workers = self.profile.workers,
            stop_condition = ?self.profile.stop_condition(),
            rate_limit = ?self.profile.rate_limit,
            "Starting load run"
        );

        let start = Instant::now();
        let cancel = external.child_token();

        let (tasks, source_handle) = source.generate(cancel.clone());
        let PoolHandles {
            results,
            errors,
            completion,
        } = pool.run(tasks, cancel.clone());
        let aggregator_handle =
            Aggregator::new(Arc::clone(&self.progress)).spawn(results, cancel.clone());

        let first = FirstError::default();
        let (stop_reason, (emitted, worker_stats, result_set, errors_by_kind)) = {
            let stages = async {
                tokio::join!(
                    join_stage("source", source_handle, &first, &cancel),
                    join_stage("worker pool", completion, &first, &cancel),
                    join_stage("aggregator", aggregator_handle, &first, &cancel),
                    count_errors(errors, &first, &cancel),
                )
            };
            tokio::pin!(stages);

            let deadline = async {
                match self.profile.effective_duration() {
                    Some(duration) => tokio::time::sleep(duration).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;

                _ = external.cancelled() => {
                    tracing::info!("Run interrupted, stopping all stages");
                    cancel.cancel();
                    (StopReason::Interrupted, stages.await)
                }

                _ = deadline => {
                    tracing::info!("Run duration elapsed, stopping all stages");
                    cancel.cancel();
                    (StopReason::DeadlineElapsed, stages.await)
                }

                joined = &mut stages => (StopReason::Completed, joined),
            }
        };
        let elapsed = start.elapsed();

        if let Some(err) = first.take() {
            return Err(err);
        }

        let results = result_set
            .ok_or_else(|| Error::invariant("aggregator finished without a result set"))?;
        let worker_stats =
            worker_stats.ok_or_else(|| Error::invariant("worker pool finished without stats"))?;
        let summary = results.summarize();
        let transport_errors: usize = errors_by_kind.values().sum();

        tracing::info!(
            elapsed_secs = elapsed.as_secs_f64(),
            emitted = ?emitted,
            results = results.len(),
            transport_errors,
            stop_reason = %stop_reason,
            "Load run finished"
        );

        Ok(RunOutcome {
            summary,
            results,
            stop_reason,
            elapsed,
            transport_errors,
            errors_by_kind,
            worker_stats,
        })
    }

    /// Run with Ctrl+C signal handling
    ///
    /// The first Ctrl+C stops the run; its partial results are still
    /// returned.
    pub async fn run_with_signal_handling(&self) -> LoadResult<RunOutcome> {
        let interrupt = CancellationToken::new();
        let trigger = interrupt.clone();

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                    trigger.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run_once(interrupt).await;

        signal_handle.abort();

        result
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("profile", &self.profile)
            .field("transport", &self.transport.name())
            .field("channels", &self.channels)
            .finish()
    }
}
