//! Orchestrator for the load run lifecycle
//!
//! The Orchestrator coordinates one complete run:
//! - Starting the request source, the worker pool and the aggregator
//! - Threading one cancellation token through every stage
//! - Stopping on completion, deadline or external interrupt
//! - Merging stage failures into a single terminal error
//!
//! Termination is two-phase: cancellation is broadcast first, then every
//! stage is joined, so the result set is stable before it is summarized.
//!
//! # Example
//!
//! ```ignore
//! use httpload_core::{LoadProfile, OrchestratorBuilder};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .profile(LoadProfile::new("http://localhost:8080/").with_workers(10))
//!     .transport(transport)
//!     .build()?;
//!
//! let outcome = orchestrator.run_with_signal_handling().await?;
//! ```

mod aggregator;
mod builder;
mod executor;
mod merge;

pub use aggregator::Aggregator;
pub use builder::OrchestratorBuilder;
pub use executor::{Orchestrator, RunOutcome, StopReason};
