//! Result collection and summary statistics

use crate::error::{Error, LoadResult};
use crate::request::RequestId;
use crate::response::RequestResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

// ============================================================================
// Result Set
// ============================================================================

/// Every result collected during one run
///
/// Append-only while the run is in progress and sealed once the aggregator
/// has seen the end of the result stream. Appending to a sealed set, or
/// appending the same task twice, is an invariant violation.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    results: Vec<RequestResult>,
    seen: HashSet<RequestId>,
    sealed: bool,
}

impl ResultSet {
    /// Create an empty, open result set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result
    pub fn push(&mut self, result: RequestResult) -> LoadResult<()> {
        if self.sealed {
            return Err(Error::invariant(format!(
                "result for {} arrived after the result set was sealed",
                result.request_id
            )));
        }

        if !self.seen.insert(result.request_id) {
            return Err(Error::invariant(format!(
                "{} produced more than one result",
                result.request_id
            )));
        }

        self.results.push(result);
        Ok(())
    }

    /// Mark the set read-only
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether the set has been sealed
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of collected results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no result was collected
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Compute the summary of this set
    pub fn summarize(&self) -> Summary {
        Summary::from_results(&self.results)
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Latency percentiles in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    /// Median
    pub p50: f64,
    /// 90th percentile
    pub p90: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

/// Summary statistics of a result set
///
/// Latency aggregates are in seconds. The status-code map iterates in
/// ascending numeric order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of results summarized
    pub count: usize,
    /// Sum of all latencies
    pub total_secs: f64,
    /// Largest latency
    pub slowest_secs: f64,
    /// Smallest latency
    pub fastest_secs: f64,
    /// Mean latency
    pub average_secs: f64,
    /// Requests per second derived from the mean latency
    pub requests_per_second: f64,
    /// Latency percentiles
    pub percentiles: LatencyPercentiles,
    /// Number of results per status code
    pub status_codes: BTreeMap<u16, usize>,
}

impl Summary {
    /// Calculate a summary from results
    ///
    /// Latencies are summed as integer durations, so the outcome does not
    /// depend on the order of `results`.
    pub fn from_results(results: &[RequestResult]) -> Self {
        let mut status_codes = BTreeMap::new();
        for result in results {
            *status_codes.entry(result.status).or_insert(0) += 1;
        }

        if results.is_empty() {
            return Self {
                status_codes,
                ..Default::default()
            };
        }

        let mut latencies: Vec<Duration> = results.iter().map(|r| r.latency).collect();
        latencies.sort_unstable();

        let count = latencies.len();
        let total: Duration = latencies.iter().sum();
        let total_secs = total.as_secs_f64();
        let average_secs = total_secs / count as f64;
        let requests_per_second = if average_secs > 0.0 {
            1.0 / average_secs
        } else {
            0.0
        };

        Self {
            count,
            total_secs,
            slowest_secs: latencies[count - 1].as_secs_f64(),
            fastest_secs: latencies[0].as_secs_f64(),
            average_secs,
            requests_per_second,
            percentiles: LatencyPercentiles {
                p50: percentile(&latencies, 50.0),
                p90: percentile(&latencies, 90.0),
                p95: percentile(&latencies, 95.0),
                p99: percentile(&latencies, 99.0),
            },
            status_codes,
        }
    }

    /// Sum of the status-code counts
    pub fn status_total(&self) -> usize {
        self.status_codes.values().sum()
    }
}

/// Summarize a slice of results
pub fn summarize(results: &[RequestResult]) -> Summary {
    Summary::from_results(results)
}

/// Nearest-rank percentile over sorted latencies, in seconds
fn percentile(sorted: &[Duration], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[index.min(sorted.len() - 1)].as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: u64, status: u16, millis: u64) -> RequestResult {
        RequestResult::new(RequestId(id), status, Duration::from_millis(millis))
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);

        assert_eq!(summary.count, 0);
        assert_eq!(summary.total_secs, 0.0);
        assert_eq!(summary.slowest_secs, 0.0);
        assert_eq!(summary.fastest_secs, 0.0);
        assert_eq!(summary.average_secs, 0.0);
        assert_eq!(summary.requests_per_second, 0.0);
        assert_eq!(summary.percentiles, LatencyPercentiles::default());
        assert!(summary.status_codes.is_empty());
    }

    #[test]
    fn test_summarize_latency_aggregates() {
        let results = vec![
            result(0, 200, 100),
            result(1, 200, 300),
            result(2, 500, 200),
            result(3, 200, 400),
        ];

        let summary = summarize(&results);

        assert_eq!(summary.count, 4);
        assert!((summary.total_secs - 1.0).abs() < 1e-9);
        assert!((summary.slowest_secs - 0.4).abs() < 1e-9);
        assert!((summary.fastest_secs - 0.1).abs() < 1e-9);
        assert!((summary.average_secs - 0.25).abs() < 1e-9);
        assert!((summary.requests_per_second - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_zero_latency_has_no_rate() {
        let summary = summarize(&[result(0, 200, 0)]);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.requests_per_second, 0.0);
    }

    #[test]
    fn test_status_distribution_ascending_and_complete() {
        let results = vec![
            result(0, 503, 10),
            result(1, 200, 10),
            result(2, 404, 10),
            result(3, 200, 10),
            result(4, 301, 10),
        ];

        let summary = summarize(&results);

        let codes: Vec<u16> = summary.status_codes.keys().copied().collect();
        assert_eq!(codes, vec![200, 301, 404, 503]);
        assert_eq!(summary.status_codes[&200], 2);
        assert_eq!(summary.status_total(), results.len());
    }

    #[test]
    fn test_summarize_is_order_independent() {
        let results: Vec<RequestResult> = (0..50)
            .map(|i| result(i, if i % 7 == 0 { 500 } else { 200 }, 1 + (i * 37) % 101))
            .collect();

        let mut reversed = results.clone();
        reversed.reverse();

        let mut rotated = results.clone();
        rotated.rotate_left(17);

        let expected = summarize(&results);
        assert_eq!(summarize(&reversed), expected);
        assert_eq!(summarize(&rotated), expected);
    }

    #[test]
    fn test_percentiles() {
        let results: Vec<RequestResult> = (1..=100).map(|i| result(i, 200, i)).collect();
        let summary = summarize(&results);

        assert!((summary.percentiles.p50 - 0.051).abs() < 1e-9);
        assert!((summary.percentiles.p99 - 0.099).abs() < 1e-9);
        assert!(summary.percentiles.p90 <= summary.percentiles.p95);
    }

    #[test]
    fn test_result_set_push_and_seal() {
        let mut set = ResultSet::new();
        set.push(result(0, 200, 5)).unwrap();
        set.push(result(1, 200, 5)).unwrap();
        assert_eq!(set.len(), 2);

        set.seal();
        assert!(set.is_sealed());

        let err = set.push(result(2, 200, 5)).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_result_set_rejects_duplicate_task() {
        let mut set = ResultSet::new();
        set.push(result(7, 200, 5)).unwrap();

        let err = set.push(result(7, 500, 9)).unwrap_err();
        assert!(err.to_string().contains("req-7"));
        assert_eq!(set.summarize().count, 1);
    }
}
