//! Admission decision for [`ScalablePool`].
//!
//! Growth is preferred over queueing: a task only reaches the backlog once
//! the pool is at `maximum_pool_size`, or a spawn attempt failed while at
//! least one worker is alive. The backlog is never fed while the pool has no
//! workers.

use std::sync::atomic::Ordering;

use tracing::{trace, warn};

use crate::core::error::{RejectReason, Rejected};
use crate::core::task::Task;

use super::scalable::{RunState, ScalablePool};
use super::Admission;

impl ScalablePool {
    /// Submit a task.
    ///
    /// Takes the first path that works: direct hand-off to a parked worker,
    /// a new worker carrying the task (while below `maximum_pool_size`), or
    /// the backlog. Never waits for a worker to become free.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`], holding the task, when the pool is at its
    /// maximum and the backlog is full, when a worker cannot be started and
    /// none is alive to drain the backlog, or once shutdown has begun.
    pub fn submit(&self, task: Task) -> Result<Admission, Rejected> {
        let core = &self.core;

        // Fast path: an idle worker is parked. Uses only the queue's lock.
        let task = match core.queue.try_hand_off(task) {
            Ok(()) => return Ok(self.accepted(Admission::HandedOff)),
            Err(task) => task,
        };

        let mut state = core.state.lock();
        if state.run_state != RunState::Running {
            drop(state);
            return Err(self.rejected(RejectReason::Shutdown, task));
        }

        // A worker may have parked between the fast path and the lock.
        let task = match core.queue.try_hand_off(task) {
            Ok(()) => return Ok(self.accepted(Admission::HandedOff)),
            Err(task) => task,
        };

        let task = if state.worker_count < core.config.maximum_pool_size {
            match core.spawn_worker(&mut state, Some(task)) {
                Ok(()) => return Ok(self.accepted(Admission::Spawned)),
                // With no live worker the backlog would never be drained.
                Err((_, Some(task))) if state.worker_count == 0 => {
                    drop(state);
                    return Err(self.rejected(RejectReason::Saturated, task));
                }
                // Spawn failure: fall through to the backlog.
                Err((_, Some(task))) => task,
                Err((e, None)) => {
                    // The spawner ran the body despite reporting failure;
                    // the task is in that thread's hands now.
                    warn!(pool_id = %core.id, error = %e, "Spawner reported failure after starting worker");
                    return Ok(self.accepted(Admission::Spawned));
                }
            }
        } else {
            task
        };

        match core.queue.enqueue(task) {
            Ok(()) => Ok(self.accepted(Admission::Queued)),
            Err(task) => {
                drop(state);
                Err(self.rejected(RejectReason::Saturated, task))
            }
        }
    }

    fn accepted(&self, admission: Admission) -> Admission {
        self.core
            .counters
            .submitted_tasks
            .fetch_add(1, Ordering::Relaxed);
        trace!(pool_id = %self.core.id, admission = ?admission, "Task admitted");
        admission
    }

    fn rejected(&self, reason: RejectReason, task: Task) -> Rejected {
        self.core
            .counters
            .rejected_tasks
            .fetch_add(1, Ordering::Relaxed);
        warn!(
            pool_id = %self.core.id,
            reason = %reason,
            task = task.name().unwrap_or("<unnamed>"),
            "Task rejected"
        );
        Rejected::new(reason, task)
    }
}
