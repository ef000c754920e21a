//! httpload-core: the load generation pipeline
//!
//! This crate provides everything between a validated load profile and a
//! latency summary:
//!
//! - Load profile configuration and validation
//! - The request source, worker pool and aggregator stages
//! - The orchestrator that runs them under one cancellation token
//! - Result sets and summary statistics
//! - The [`HttpTransport`] trait the workers send requests through
//! - Error handling
//!
//! HTTP itself lives outside this crate; see `httpload-transport`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod source;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod testing;

pub use channel::ChannelConfig;
pub use config::{ConfigError, LoadProfile, StopCondition, DEFAULT_REQUESTS, DEFAULT_WORKERS};
pub use error::*;
pub use metrics::*;
pub use orchestrator::{Aggregator, Orchestrator, OrchestratorBuilder, RunOutcome, StopReason};
pub use request::*;
pub use response::*;
pub use source::{RequestSource, TaskStream};
pub use traits::*;
pub use worker::{PoolTotals, RequestExecutor, RequestRateLimiter, WorkerPool, WorkerStats};
