//! Report rendering for load run results
//!
//! This crate turns a finished run into output:
//!
//! - Plain text, in the classic `Summary:` / `Status code distribution:` layout
//! - JSON, for machine consumption

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::Duration;

use httpload_core::{RunOutcome, StopReason, Summary, WorkerStats};
use serde::Serialize;

/// Report generation errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Writing the report failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested output format does not exist
    #[error("unknown output format: {0} (expected \"text\" or \"json\")")]
    UnknownFormat(String),
}

/// Result type alias
pub type ReportResult<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Report
// ============================================================================

/// The renderable view of a run
#[derive(Debug, Clone, Serialize)]
pub struct Report<'a> {
    /// Latency and status statistics
    pub summary: &'a Summary,
    /// How the run ended
    pub stop_reason: StopReason,
    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
    /// Results per second of wall-clock time
    pub throughput: f64,
    /// Requests that failed at the transport level
    pub transport_errors: usize,
    /// Transport errors by kind (`connect`, `timeout`, ...)
    pub errors_by_kind: BTreeMap<&'static str, usize>,
    /// Per-worker breakdown, ordered by worker id
    pub workers: Vec<WorkerReport>,
}

/// One worker's share of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerReport {
    /// Worker identifier
    pub worker_id: usize,
    /// Results delivered
    pub completed: usize,
    /// Transport failures
    pub errors: usize,
    /// Fraction of attempts that failed
    pub error_rate: f64,
    /// Time the worker was alive, in seconds
    pub elapsed_secs: f64,
}

impl From<&WorkerStats> for WorkerReport {
    fn from(stats: &WorkerStats) -> Self {
        Self {
            worker_id: stats.worker_id,
            completed: stats.completed,
            errors: stats.errors,
            error_rate: stats.error_rate(),
            elapsed_secs: stats.elapsed().as_secs_f64(),
        }
    }
}

impl<'a> Report<'a> {
    /// Build a report from a finished run
    pub fn from_outcome(outcome: &'a RunOutcome) -> Self {
        Self {
            summary: &outcome.summary,
            stop_reason: outcome.stop_reason,
            elapsed_secs: outcome.elapsed.as_secs_f64(),
            throughput: outcome.throughput(),
            transport_errors: outcome.transport_errors,
            errors_by_kind: outcome.errors_by_kind.clone(),
            workers: outcome.worker_stats.iter().map(WorkerReport::from).collect(),
        }
    }

    /// Build a report from a bare summary of a completed run
    pub fn from_summary(summary: &'a Summary, elapsed: Duration) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            summary.count as f64 / elapsed_secs
        } else {
            0.0
        };

        Self {
            summary,
            stop_reason: StopReason::Completed,
            elapsed_secs,
            throughput,
            transport_errors: 0,
            errors_by_kind: BTreeMap::new(),
            workers: Vec::new(),
        }
    }
}

// ============================================================================
// Renderers
// ============================================================================

/// Something that can write a [`Report`]
pub trait Renderer {
    /// Write the report to `out`
    fn render(&self, report: &Report<'_>, out: &mut dyn Write) -> ReportResult<()>;

    /// Render the report into a string
    fn render_to_string(&self, report: &Report<'_>) -> ReportResult<String> {
        let mut buffer = Vec::new();
        self.render(report, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Human-readable text output
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    fn write_timings(summary: &Summary, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Total:        {:12.4} secs", summary.total_secs)?;
        writeln!(out, "Slowest:      {:12.4} secs", summary.slowest_secs)?;
        writeln!(out, "Fastest:      {:12.4} secs", summary.fastest_secs)?;
        writeln!(out, "Average:      {:12.4} secs", summary.average_secs)?;
        writeln!(out, "Requests/sec: {:12.4}", summary.requests_per_second)
    }

    fn write_status_codes(summary: &Summary, out: &mut dyn Write) -> io::Result<()> {
        for (code, count) in &summary.status_codes {
            writeln!(out, "[{code:3}] {count:12} response(s)")?;
        }
        Ok(())
    }

    fn write_latency_distribution(summary: &Summary, out: &mut dyn Write) -> io::Result<()> {
        let p = &summary.percentiles;
        write!(out, "\nLatency distribution:\n\n")?;
        for (label, value) in [("50%", p.p50), ("90%", p.p90), ("95%", p.p95), ("99%", p.p99)] {
            writeln!(out, "  {label} in {value:.4} secs")?;
        }
        Ok(())
    }
}

impl Renderer for TextRenderer {
    fn render(&self, report: &Report<'_>, out: &mut dyn Write) -> ReportResult<()> {
        let summary = report.summary;

        write!(out, "\nSummary:\n\n")?;
        if summary.count > 0 {
            Self::write_timings(summary, out)?;
        }

        write!(out, "\nStatus code distribution:\n\n")?;
        Self::write_status_codes(summary, out)?;

        if summary.count > 0 {
            Self::write_latency_distribution(summary, out)?;
        }

        if report.transport_errors > 0 {
            writeln!(out, "\nErrors: {} request(s) failed", report.transport_errors)?;
            for (kind, count) in &report.errors_by_kind {
                writeln!(out, "  {kind:<12} {count:12}")?;
            }
        }

        if report.stop_reason != StopReason::Completed {
            writeln!(
                out,
                "\nStopped: {} after {:.4} secs",
                report.stop_reason, report.elapsed_secs
            )?;
        }

        Ok(())
    }
}

/// JSON output
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Create a compact JSON renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent the output
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }
}

impl Renderer for JsonRenderer {
    fn render(&self, report: &Report<'_>, out: &mut dyn Write) -> ReportResult<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, report)?;
        } else {
            serde_json::to_writer(&mut *out, report)?;
        }
        writeln!(out)?;
        Ok(())
    }
}

// ============================================================================
// Output format selection
// ============================================================================

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// The renderer for this format
    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            OutputFormat::Text => Box::new(TextRenderer),
            OutputFormat::Json => Box::new(JsonRenderer::new().pretty()),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}
