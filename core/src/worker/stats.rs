//! Per-worker counters

use std::time::{Duration, Instant};

/// What one worker did during a run
#[derive(Debug, Clone)]
pub struct WorkerStats {
    /// Worker identifier, `0..workers`
    pub worker_id: usize,

    /// Results delivered to the aggregator
    pub completed: usize,

    /// Requests that failed at the transport level
    pub errors: usize,

    started_at: Instant,
    finished_at: Option<Instant>,
}

impl WorkerStats {
    /// Start counting for a worker that begins now
    pub fn begin(worker_id: usize) -> Self {
        Self {
            worker_id,
            completed: 0,
            errors: 0,
            started_at: Instant::now(),
            finished_at: None,
        }
    }

    /// Mark the worker as exited
    pub fn finish(&mut self) {
        self.finished_at.get_or_insert_with(Instant::now);
    }

    pub(crate) fn record_success(&mut self) {
        self.completed += 1;
    }

    pub(crate) fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Requests this worker dispatched that reached an outcome
    pub fn attempts(&self) -> usize {
        self.completed + self.errors
    }

    /// Fraction of attempts that failed (0.0 - 1.0)
    pub fn error_rate(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => self.errors as f64 / n as f64,
        }
    }

    /// Time the worker was alive; still running workers report time so far
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
    }
}

/// Totals across all workers of a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolTotals {
    /// Number of workers
    pub workers: usize,
    /// Results delivered to the aggregator
    pub completed: usize,
    /// Requests that failed at the transport level
    pub errors: usize,
}

impl PoolTotals {
    /// Sum per-worker stats
    pub fn from_stats(stats: &[WorkerStats]) -> Self {
        stats.iter().fold(
            Self {
                workers: stats.len(),
                ..Default::default()
            },
            |mut totals, s| {
                totals.completed += s.completed;
                totals.errors += s.errors;
                totals
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_stats() {
        let stats = WorkerStats::begin(3);
        assert_eq!(stats.worker_id, 3);
        assert_eq!(stats.attempts(), 0);
        assert_eq!(stats.error_rate(), 0.0);
    }

    #[test]
    fn test_error_rate() {
        let mut stats = WorkerStats::begin(0);
        for _ in 0..3 {
            stats.record_success();
        }
        stats.record_error();

        assert_eq!(stats.attempts(), 4);
        assert!((stats.error_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_elapsed_freezes_on_finish() {
        let mut stats = WorkerStats::begin(0);
        std::thread::sleep(Duration::from_millis(10));
        stats.finish();

        let frozen = stats.elapsed();
        assert!(frozen >= Duration::from_millis(10));

        std::thread::sleep(Duration::from_millis(5));
        stats.finish();
        assert_eq!(stats.elapsed(), frozen);
    }

    #[test]
    fn test_pool_totals() {
        let mut a = WorkerStats::begin(0);
        a.completed = 10;
        a.errors = 1;
        let mut b = WorkerStats::begin(1);
        b.completed = 5;

        assert_eq!(
            PoolTotals::from_stats(&[a, b]),
            PoolTotals {
                workers: 2,
                completed: 15,
                errors: 1
            }
        );
        assert_eq!(PoolTotals::from_stats(&[]), PoolTotals::default());
    }
}
