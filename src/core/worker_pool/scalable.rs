//! Elastic pool controller.
//!
//! Owns the worker set and the admission lock. The lock guards
//! [`PoolState`]; every change to the worker count happens while it is held,
//! and so does every spawn decision (see `admission.rs`). Lock order is
//! always pool state first, queue second.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PoolConfig;
use crate::core::error::{PoolError, Rejected};
use crate::core::failure::{FailureSink, TracingFailureSink};
use crate::core::task::Task;
use crate::runtime::spawner::{OsThreadSpawner, ThreadSpawner};

use super::queue::TransferQueue;
use super::worker::Worker;
use super::{Admission, PoolCounters, PoolStats, ShutdownMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RunState {
    Running,
    ShuttingDown,
    Terminated,
}

/// Live worker as seen by the controller.
pub(super) struct WorkerHandle {
    /// Dropping the handle detaches the thread; workers remove their own
    /// entry on exit.
    _thread: JoinHandle<()>,
    interrupt: Arc<AtomicBool>,
}

/// Everything guarded by the admission lock.
pub(super) struct PoolState {
    pub run_state: RunState,
    pub worker_count: usize,
    pub largest_pool_size: usize,
    next_worker_id: usize,
    workers: HashMap<usize, WorkerHandle>,
}

/// State shared between the pool handle and its workers.
pub(super) struct PoolCore {
    pub id: Uuid,
    pub config: PoolConfig,
    pub keep_alive: Duration,
    pub state: Mutex<PoolState>,
    /// Signalled (with `state`) whenever a worker exits.
    pub termination: Condvar,
    pub queue: TransferQueue<Task>,
    pub counters: PoolCounters,
    pub sink: Arc<dyn FailureSink>,
    spawner: Arc<dyn ThreadSpawner>,
}

impl PoolCore {
    /// Start one worker, optionally carrying its first task.
    ///
    /// Caller holds the admission lock (`state`) and has checked that the
    /// pool is below its maximum. On failure the first task is handed back.
    pub(super) fn spawn_worker(
        self: &Arc<Self>,
        state: &mut PoolState,
        first_task: Option<Task>,
    ) -> Result<(), (PoolError, Option<Task>)> {
        debug_assert!(state.worker_count < self.config.maximum_pool_size);

        let worker_id = state.next_worker_id;
        let name = format!("{}-{worker_id}", self.config.thread_name_prefix);
        let interrupt = Arc::new(AtomicBool::new(false));
        let first_task = Arc::new(Mutex::new(first_task));
        let worker = Worker::new(
            worker_id,
            Arc::clone(self),
            Arc::clone(&first_task),
            Arc::clone(&interrupt),
        );

        match self.spawner.spawn(name, Box::new(move || worker.run())) {
            Ok(thread) => {
                state.next_worker_id += 1;
                state.worker_count += 1;
                state.largest_pool_size = state.largest_pool_size.max(state.worker_count);
                state.workers.insert(
                    worker_id,
                    WorkerHandle {
                        _thread: thread,
                        interrupt,
                    },
                );
                debug!(
                    pool_id = %self.id,
                    worker_id = worker_id,
                    pool_size = state.worker_count,
                    "Worker spawned"
                );
                Ok(())
            }
            Err(e) => {
                warn!(pool_id = %self.id, error = %e, "Failed to spawn worker thread");
                let task = first_task.lock().take();
                Err((PoolError::Spawn(e), task))
            }
        }
    }

    /// Called by a worker whose idle wait timed out. Retires it (count
    /// decremented, handle dropped) when the pool is above its floor and
    /// nothing is waiting in the backlog; otherwise the worker keeps going.
    pub(super) fn try_retire(&self, worker_id: usize) -> bool {
        let mut state = self.state.lock();
        let floor = if self.config.allow_core_timeout {
            0
        } else {
            self.config.core_pool_size
        };
        // Enqueue only happens under this lock, so an empty backlog here
        // stays empty until the count has been lowered.
        if state.worker_count <= floor || !self.queue.is_empty() {
            return false;
        }
        self.release(&mut state, worker_id);
        debug!(
            pool_id = %self.id,
            worker_id = worker_id,
            pool_size = state.worker_count,
            "Idle worker retired"
        );
        true
    }

    /// Account for a worker that is exiting for any reason other than an
    /// idle retirement.
    pub(super) fn worker_exited(&self, worker_id: usize) {
        let mut state = self.state.lock();
        self.release(&mut state, worker_id);
    }

    fn release(&self, state: &mut PoolState, worker_id: usize) {
        state.worker_count = state.worker_count.saturating_sub(1);
        state.workers.remove(&worker_id);
        if state.worker_count == 0 && state.run_state == RunState::ShuttingDown {
            state.run_state = RunState::Terminated;
            info!(pool_id = %self.id, "Pool terminated");
        }
        self.termination.notify_all();
    }
}

/// Elastic worker pool: grows to `maximum_pool_size` before queueing, and
/// shrinks back to `core_pool_size` when idle.
///
/// Share it between submitters with an `Arc`. Dropping the last handle
/// starts a graceful shutdown but does not wait for workers.
pub struct ScalablePool {
    pub(super) core: Arc<PoolCore>,
}

impl ScalablePool {
    /// Create a pool that logs task failures through `tracing` and runs
    /// workers on OS threads.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if prestarting core workers fails
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let spawner = OsThreadSpawner::from_config(&config);
        Self::with_components(config, Arc::new(TracingFailureSink), Arc::new(spawner))
    }

    /// Shorthand for a pool with the given limits and default settings
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::InvalidConfig` if `core > max` or `max == 0`.
    pub fn with_limits(
        core_pool_size: usize,
        maximum_pool_size: usize,
        keep_alive: Duration,
    ) -> Result<Self, PoolError> {
        Self::new(
            PoolConfig::new()
                .with_core_pool_size(core_pool_size)
                .with_maximum_pool_size(maximum_pool_size)
                .with_keep_alive(keep_alive),
        )
    }

    /// Create a pool with an explicit failure sink and thread spawner.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if prestarting core workers fails
    pub fn with_components(
        config: PoolConfig,
        sink: Arc<dyn FailureSink>,
        spawner: Arc<dyn ThreadSpawner>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let core = Arc::new(PoolCore {
            id: Uuid::new_v4(),
            keep_alive: config.keep_alive(),
            queue: TransferQueue::new(config.queue_capacity),
            state: Mutex::new(PoolState {
                run_state: RunState::Running,
                worker_count: 0,
                largest_pool_size: 0,
                next_worker_id: 0,
                workers: HashMap::new(),
            }),
            termination: Condvar::new(),
            counters: PoolCounters::default(),
            sink,
            spawner,
            config,
        });

        info!(
            pool_id = %core.id,
            core_pool_size = core.config.core_pool_size,
            maximum_pool_size = core.config.maximum_pool_size,
            keep_alive_ms = core.config.keep_alive_ms,
            queue_capacity = ?core.config.queue_capacity,
            "ScalablePool initialized"
        );

        let pool = Self { core };
        if pool.core.config.prestart_core_workers {
            let mut state = pool.core.state.lock();
            while state.worker_count < pool.core.config.core_pool_size {
                pool.core
                    .spawn_worker(&mut state, None)
                    .map_err(|(e, _)| e)?;
            }
        }
        Ok(pool)
    }

    /// Submit a closure. See [`submit`](Self::submit).
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the pool is saturated or shut down.
    pub fn execute<F>(&self, f: F) -> Result<Admission, Rejected>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::new(f))
    }

    /// Start idle core workers up to `core_pool_size`. Returns how many were
    /// started.
    pub fn prestart_core_workers(&self) -> usize {
        let mut state = self.core.state.lock();
        let mut started = 0;
        while state.run_state == RunState::Running
            && state.worker_count < self.core.config.core_pool_size
        {
            if self.core.spawn_worker(&mut state, None).is_err() {
                break;
            }
            started += 1;
        }
        started
    }

    /// Begin shutting down. Idempotent and terminal.
    ///
    /// Both modes refuse new submissions from this point on. `Graceful` lets
    /// queued and in-flight tasks finish. `Immediate` removes the backlog and
    /// returns it unrun, raises every worker's interrupt flag (see
    /// [`is_interrupted`](super::is_interrupted)) and lets workers exit as
    /// soon as their current task returns. A task a worker had already taken
    /// off the backlog before the call still runs, seeing `is_interrupted()`
    /// as `true`. Neither mode waits; use
    /// [`await_termination`](Self::await_termination).
    pub fn shutdown(&self, mode: ShutdownMode) -> Vec<Task> {
        let mut state = self.core.state.lock();
        if state.run_state == RunState::Running {
            state.run_state = if state.worker_count == 0 {
                RunState::Terminated
            } else {
                RunState::ShuttingDown
            };
            info!(
                pool_id = %self.core.id,
                mode = ?mode,
                pool_size = state.worker_count,
                queued = self.core.queue.len(),
                "Shutting down pool"
            );
        }
        let discarded = match mode {
            ShutdownMode::Graceful => {
                self.core.queue.close();
                Vec::new()
            }
            ShutdownMode::Immediate => {
                // Interrupts go up before the backlog is closed and emptied
                // in a single queue-lock section.
                for handle in state.workers.values() {
                    handle.interrupt.store(true, Ordering::Release);
                }
                self.core.queue.close_and_drain()
            }
        };
        if !discarded.is_empty() {
            info!(
                pool_id = %self.core.id,
                discarded = discarded.len(),
                "Discarded queued tasks"
            );
        }
        drop(state);
        self.core.termination.notify_all();
        discarded
    }

    /// Block until every worker has exited after shutdown, or `timeout`
    /// passes. Returns whether the pool terminated.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.core.state.lock();
        while state.run_state != RunState::Terminated {
            match deadline {
                Some(deadline) => {
                    if self
                        .core
                        .termination
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return state.run_state == RunState::Terminated;
                    }
                }
                None => self.core.termination.wait(&mut state),
            }
        }
        true
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.core.state.lock().run_state != RunState::Running
    }

    /// Whether shutdown has completed and every worker has exited.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.core.state.lock().run_state == RunState::Terminated
    }

    /// Workers currently alive.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.core.state.lock().worker_count
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.core.counters.snapshot(self.core.id);
        {
            let state = self.core.state.lock();
            stats.pool_size = state.worker_count;
            stats.largest_pool_size = state.largest_pool_size;
        }
        stats.queued_tasks = self.core.queue.len();
        stats.idle_workers = self.core.queue.waiting_consumers();
        stats
    }

    /// The pool's configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.core.config
    }

    /// Identifier attached to this pool's log events.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.core.id
    }
}

impl std::fmt::Debug for ScalablePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalablePool")
            .field("id", &self.core.id)
            .field("config", &self.core.config)
            .field("queue", &self.core.queue)
            .finish_non_exhaustive()
    }
}

impl Drop for ScalablePool {
    fn drop(&mut self) {
        // Don't wait for workers here; explicit shutdown + await_termination
        // is the way to block on completion.
        if !self.is_shutdown() {
            debug!(pool_id = %self.core.id, "ScalablePool dropped without explicit shutdown");
            self.shutdown(ShutdownMode::Graceful);
        }
    }
}
