//! CLI argument parsing and run dispatch

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use httpload_core::{LoadProfile, Orchestrator, OrchestratorBuilder, DEFAULT_REQUESTS, DEFAULT_WORKERS};
use httpload_report::{OutputFormat, Report};
use httpload_transport::ReqwestTransport;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;

#[derive(Parser, Debug)]
#[command(name = "httpload")]
#[command(author, version, about = "Concurrent HTTP load generator", long_about = None)]
#[command(override_usage = "httpload [OPTIONS] <URL>")]
pub struct Cli {
    /// URL to send GET requests to
    #[arg(env = "HTTPLOAD_URL")]
    pub url: String,

    /// Number of workers to run concurrently
    #[arg(short = 'w', long, env = "HTTPLOAD_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Number of requests to run; ignored when a duration is given
    #[arg(short = 'n', long, env = "HTTPLOAD_REQUESTS", default_value_t = DEFAULT_REQUESTS)]
    pub requests: usize,

    /// Duration of the run (e.g. 10s, 500ms, 2m)
    #[arg(short = 'z', long, env = "HTTPLOAD_DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Rate limit per worker, in queries per second
    #[arg(short = 'q', long = "rate", env = "HTTPLOAD_RATE")]
    pub rate: Option<f64>,

    /// Timeout for each request, up to the response headers
    #[arg(short = 't', long, env = "HTTPLOAD_TIMEOUT", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The load profile described by the arguments
    pub fn profile(&self) -> LoadProfile {
        LoadProfile {
            target_url: self.url.clone(),
            workers: self.workers,
            requests: self.requests,
            duration: self.duration,
            rate_limit: self.rate,
            request_timeout: self.timeout,
        }
    }

    /// Execute the run and print the report to stdout
    pub async fn run(self) -> Result<()> {
        let profile = self.profile();

        let transport = ReqwestTransport::builder()
            .pool_max_idle_per_host(profile.workers)
            .build()
            .context("failed to create HTTP client")?;

        let orchestrator = OrchestratorBuilder::new()
            .profile(profile)
            .transport(Arc::new(transport))
            .build()
            .context("invalid load profile")?;

        let progress = (!self.no_progress).then(|| ProgressDisplay::start(&orchestrator));
        let outcome = orchestrator.run_with_signal_handling().await;
        if let Some(progress) = progress {
            progress.finish();
        }
        let outcome = outcome.context("load run failed")?;

        let report = Report::from_outcome(&outcome);
        let mut stdout = std::io::stdout().lock();
        self.format
            .renderer()
            .render(&report, &mut stdout)
            .context("failed to write report")?;
        stdout.flush()?;

        Ok(())
    }
}

/// Progress bar fed from the orchestrator's result counter
struct ProgressDisplay {
    bar: ProgressBar,
    updater: JoinHandle<()>,
}

impl ProgressDisplay {
    fn start(orchestrator: &Orchestrator) -> Self {
        let profile = orchestrator.profile();
        let bar = match profile.effective_duration() {
            Some(_) => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.green} [{elapsed_precise}] {pos} responses")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
            None => {
                let bar = ProgressBar::new(profile.requests as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                        )
                        .map(|style| style.progress_chars("#>-"))
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            }
        };

        let mut completed = orchestrator.progress();
        let updater = tokio::spawn({
            let bar = bar.clone();
            async move {
                while completed.changed().await.is_ok() {
                    let count = *completed.borrow_and_update();
                    bar.set_position(count as u64);
                }
            }
        });

        Self { bar, updater }
    }

    fn finish(self) {
        self.updater.abort();
        self.bar.finish_and_clear();
    }
}

/// Parse a duration such as `500ms`, `10s`, `1.5m` or `1h`
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (value, unit) = match s.find(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };

    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {s:?}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid duration: {s:?}"));
    }

    let secs = match unit {
        "ms" => value / 1_000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3_600.0,
        other => return Err(format!("unknown duration unit {other:?} in {s:?}")),
    };

    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid duration {s:?}: {e}"))
}
