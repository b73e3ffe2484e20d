//! # Scalable Pool
//!
//! A worker-pool task executor that grows before it queues.
//!
//! A [`ScalablePool`](core::ScalablePool) keeps between `core_pool_size` and
//! `maximum_pool_size` OS threads. Each submission is admitted along the first
//! path that works:
//!
//! - **Hand-off**: an idle worker is parked on the queue and receives the task
//!   directly, without it ever touching the backlog.
//! - **Growth**: the pool is below its maximum, so a new worker is started with
//!   the task as its first unit of work.
//! - **Backlog**: the pool is at its maximum, so the task waits in FIFO order
//!   (or is rejected if the backlog is bounded and full).
//!
//! Workers above the core size retire after sitting idle for `keep_alive`.
//! Task failures (errors and panics) are reported to a
//! [`FailureSink`](core::FailureSink) and never take a worker down.
//!
//! A [`FixedPool`](core::FixedPool) with N permanent workers and an unbounded
//! backlog is provided as the baseline to compare against.
//!
//! ```rust
//! use scalable_pool::config::PoolConfig;
//! use scalable_pool::core::{ScalablePool, ShutdownMode};
//! use std::time::Duration;
//!
//! let pool = ScalablePool::new(
//!     PoolConfig::new()
//!         .with_core_pool_size(2)
//!         .with_maximum_pool_size(8)
//!         .with_keep_alive(Duration::from_secs(30)),
//! )?;
//!
//! for i in 0..16 {
//!     pool.execute(move || println!("task {i}")).unwrap();
//! }
//!
//! pool.shutdown(ShutdownMode::Graceful);
//! assert!(pool.await_termination(Duration::from_secs(5)));
//! # Ok::<(), scalable_pool::core::PoolError>(())
//! ```
//!
//! For complete examples, see:
//! - `tests/admission_algorithm_test.rs` - admission order and pool limits
//! - `tests/scalable_pool_test.rs` - worker lifecycle and shutdown

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Worker pools, admission, tasks and failure reporting.
pub mod core;
/// Configuration models for pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Runtime adapters: thread spawning and result handles.
pub mod runtime;
/// Shared utilities.
pub mod util;
