//! Worker pools backed by dedicated OS threads.
//!
//! Two pools live here:
//!
//! - [`ScalablePool`]: grows from `core_pool_size` towards
//!   `maximum_pool_size` before it ever queues a task, and lets idle
//!   non-core workers retire after `keep_alive`.
//! - [`FixedPool`]: exactly N workers pulling from an unbounded channel.
//!
//! # Admission
//!
//! Every submission to a `ScalablePool` takes the first path that works:
//!
//! 1. hand the task to a worker parked on the [`TransferQueue`];
//! 2. spawn a new worker carrying the task, if the pool is below its maximum;
//! 3. append the task to the backlog, or reject it if the backlog is full.
//!
//! Steps 2 and 3 run under one lock that also guards every change to the
//! worker count, so concurrent submitters can never push the pool past its
//! maximum.
//!
//! # Example
//!
//! ```rust
//! use scalable_pool::core::worker_pool::{ScalablePool, ShutdownMode};
//! use std::time::Duration;
//!
//! let pool = ScalablePool::with_limits(1, 4, Duration::from_secs(30))?;
//! pool.execute(|| println!("hello from a worker")).unwrap();
//!
//! pool.shutdown(ShutdownMode::Graceful);
//! assert!(pool.await_termination(Duration::from_secs(5)));
//! # Ok::<(), scalable_pool::core::PoolError>(())
//! ```

mod admission;
mod fixed;
mod queue;
mod scalable;
mod worker;

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

pub use fixed::FixedPool;
pub use queue::{Take, TransferQueue};
pub use scalable::ScalablePool;
pub use worker::is_interrupted;

/// Which path admitted a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Transferred directly to an idle, parked worker.
    HandedOff,
    /// Given to a newly spawned worker as its first task.
    Spawned,
    /// Appended to the backlog because the pool is at its maximum size.
    Queued,
}

/// How [`ScalablePool::shutdown`] and [`FixedPool::shutdown`] treat
/// outstanding work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownMode {
    /// Refuse new work, finish queued and in-flight tasks, then stop.
    #[default]
    Graceful,
    /// Refuse new work, drop the backlog, interrupt workers and stop as soon
    /// as their current task returns.
    Immediate,
}

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Identifier of the pool, also attached to its log events.
    pub pool_id: Uuid,

    /// Workers currently alive.
    pub pool_size: usize,

    /// Largest number of workers alive at the same time.
    pub largest_pool_size: usize,

    /// Currently executing tasks.
    pub active_tasks: u64,

    /// Tasks waiting in the backlog.
    pub queued_tasks: usize,

    /// Workers parked and ready for a direct hand-off.
    pub idle_workers: usize,

    /// Total tasks accepted.
    pub submitted_tasks: u64,

    /// Total tasks that returned normally.
    pub completed_tasks: u64,

    /// Total tasks that returned an error or panicked.
    pub failed_tasks: u64,

    /// Total submissions refused.
    pub rejected_tasks: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub rejected_tasks: AtomicU64,
}

impl PoolCounters {
    /// Fill the counter-backed fields of a stats snapshot.
    pub fn snapshot(&self, pool_id: Uuid) -> PoolStats {
        PoolStats {
            pool_id,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
            ..PoolStats::default()
        }
    }
}
