//! Worker pool for executing load requests
//!
//! Each worker is a tokio task running the loop
//! **wait for permit -> pull task -> execute -> report -> repeat**:
//!
//! 1. Optionally waits on its own rate limiter
//! 2. Pulls the next task from the queue shared with every other worker
//! 3. Executes one GET through the shared [`HttpTransport`](crate::traits::HttpTransport)
//! 4. Sends the timed result to the aggregator, or the error to the error stream
//!
//! A worker stops when the task queue closes or the run is cancelled. A
//! transport error never stops a worker.
//!
//! # Example
//!
//! ```ignore
//! use httpload_core::worker::WorkerPool;
//!
//! let pool = WorkerPool::builder()
//!     .profile(&profile)
//!     .transport(transport)
//!     .build()?;
//!
//! let handles = pool.run(tasks, cancel.clone());
//! ```

mod builder;
mod executor;
mod pool;
mod rate_limiter;
mod stats;

pub use builder::WorkerPoolBuilder;
pub use executor::RequestExecutor;
pub use pool::{PoolHandles, WorkerPool};
pub use rate_limiter::RequestRateLimiter;
pub use stats::{PoolTotals, WorkerStats};
