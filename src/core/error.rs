//! Error types for pool operations.

use thiserror::Error;

use crate::core::task::Task;

/// Errors produced while building or operating a pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The host refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Every worker slot is taken and the backlog is full.
    #[error("pool saturated and backlog full")]
    Saturated,
    /// Shutdown has begun; no new work is admitted.
    #[error("pool has been shut down")]
    Shutdown,
}

/// A refused submission. The task is handed back so the caller can run it
/// inline, retry later, or drop it.
#[derive(Debug, Error)]
#[error("task rejected: {reason}")]
pub struct Rejected {
    reason: RejectReason,
    task: Task,
}

impl Rejected {
    pub(crate) const fn new(reason: RejectReason, task: Task) -> Self {
        Self { reason, task }
    }

    /// Reason the pool refused the task.
    #[must_use]
    pub const fn reason(&self) -> RejectReason {
        self.reason
    }

    /// Recover ownership of the refused task.
    #[must_use]
    pub fn into_task(self) -> Task {
        self.task
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
