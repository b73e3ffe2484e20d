//! Fixed-size pool: N workers started once, never resized.
//!
//! Workers block on an unbounded channel. Shutdown drops the sender, which
//! lets workers drain what is left and then see the channel disconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{PoolError, RejectReason, Rejected};
use crate::core::failure::{FailureReport, FailureSink, TracingFailureSink};
use crate::core::task::Task;
use crate::runtime::spawner::{OsThreadSpawner, ThreadSpawner};

use super::worker::InterruptScope;
use super::{PoolCounters, PoolStats, ShutdownMode};

/// Pool with a constant number of worker threads and an unbounded backlog.
pub struct FixedPool {
    id: Uuid,
    num_threads: usize,

    /// Task sender. `None` once shut down.
    task_tx: Mutex<Option<Sender<Task>>>,

    /// Kept so an immediate shutdown can drain the backlog.
    task_rx: Receiver<Task>,

    counters: Arc<PoolCounters>,

    /// Raised by an immediate shutdown.
    interrupt: Arc<AtomicBool>,

    /// Handles are only kept so shutdown can join the threads.
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FixedPool {
    /// Start `num_threads` workers.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `num_threads` is zero
    /// - `PoolError::Spawn` if a worker thread cannot be started
    pub fn new(num_threads: usize) -> Result<Self, PoolError> {
        Self::with_components(
            num_threads,
            Arc::new(TracingFailureSink),
            Arc::new(OsThreadSpawner::new()),
        )
    }

    /// Start `num_threads` workers with an explicit failure sink and spawner.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if `num_threads` is zero
    /// - `PoolError::Spawn` if a worker thread cannot be started
    pub fn with_components(
        num_threads: usize,
        sink: Arc<dyn FailureSink>,
        spawner: Arc<dyn ThreadSpawner>,
    ) -> Result<Self, PoolError> {
        if num_threads == 0 {
            return Err(PoolError::InvalidConfig(
                "num_threads must be greater than 0".into(),
            ));
        }

        let id = Uuid::new_v4();
        let (task_tx, task_rx) = unbounded::<Task>();
        let counters = Arc::new(PoolCounters::default());
        let interrupt = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(num_threads);
        for worker_id in 0..num_threads {
            let rx = task_rx.clone();
            let counters = Arc::clone(&counters);
            let interrupt = Arc::clone(&interrupt);
            let sink = Arc::clone(&sink);
            let name = format!("fixed-worker-{worker_id}");
            let spawned = spawner.spawn(
                name.clone(),
                Box::new(move || worker_loop(&name, &rx, &counters, interrupt, sink.as_ref())),
            );
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Dropping the sender releases the workers already started.
                    drop(task_tx);
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        info!(pool_id = %id, num_threads = num_threads, "FixedPool initialized");

        Ok(Self {
            id,
            num_threads,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            counters,
            interrupt,
            workers: Mutex::new(workers),
        })
    }

    /// Queue a task. Never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] with reason `Shutdown` after shutdown has begun.
    pub fn submit(&self, task: Task) -> Result<(), Rejected> {
        let task_tx = self.task_tx.lock();
        let Some(tx) = task_tx.as_ref() else {
            self.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
            return Err(Rejected::new(RejectReason::Shutdown, task));
        };
        match tx.send(task) {
            Ok(()) => {
                self.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
                Err(Rejected::new(RejectReason::Shutdown, err.into_inner()))
            }
        }
    }

    /// Queue a closure. See [`submit`](Self::submit).
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] after shutdown has begun.
    pub fn execute<F>(&self, f: F) -> Result<(), Rejected>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::new(f))
    }

    /// Stop accepting work. `Graceful` lets workers drain the backlog;
    /// `Immediate` raises the interrupt flag and returns the backlog unrun.
    /// A task a worker received before it saw the flag still runs; every
    /// other accepted task is either run or returned. Does not wait; see
    /// [`join`](Self::join).
    pub fn shutdown(&self, mode: ShutdownMode) -> Vec<Task> {
        let was_running = self.task_tx.lock().take().is_some();
        if was_running {
            info!(pool_id = %self.id, mode = ?mode, "Shutting down fixed pool");
        }
        match mode {
            ShutdownMode::Graceful => Vec::new(),
            ShutdownMode::Immediate => {
                self.interrupt.store(true, Ordering::Release);
                self.task_rx.try_iter().collect()
            }
        }
    }

    /// Join every worker thread, waiting at most `timeout` for each one.
    /// Workers that don't exit in time are detached. Returns whether all of
    /// them were joined.
    ///
    /// Only meaningful after [`shutdown`](Self::shutdown); before that,
    /// workers never exit.
    pub fn join(&self, timeout: Duration) -> bool {
        let mut workers = self.workers.lock();
        let mut all_joined = true;

        for (idx, worker) in workers.drain(..).enumerate() {
            // Join on a helper thread so a stuck worker can't hang us.
            let (tx, rx) = crossbeam_channel::bounded(1);
            let join_thread = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(timeout) {
                Ok(true) => {
                    debug!(worker_id = idx, "Worker joined successfully");
                    let _ = join_thread.join();
                }
                Ok(false) => {
                    warn!(worker_id = idx, "Worker panicked");
                    let _ = join_thread.join();
                }
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                    all_joined = false;
                }
            }
        }

        all_joined
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.task_tx.lock().is_none()
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.counters.snapshot(self.id);
        stats.pool_size = self.num_threads;
        stats.largest_pool_size = self.num_threads;
        stats.queued_tasks = self.task_rx.len();
        stats
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn num_threads(&self) -> usize {
        self.num_threads
    }
}

impl std::fmt::Debug for FixedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedPool")
            .field("id", &self.id)
            .field("num_threads", &self.num_threads)
            .field("queued", &self.task_rx.len())
            .finish_non_exhaustive()
    }
}

impl Drop for FixedPool {
    fn drop(&mut self) {
        // Signal shutdown but don't join workers in Drop.
        if self.task_tx.lock().take().is_some() {
            debug!(pool_id = %self.id, "FixedPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

fn worker_loop(
    name: &str,
    rx: &Receiver<Task>,
    counters: &PoolCounters,
    interrupt: Arc<AtomicBool>,
    sink: &dyn FailureSink,
) {
    let _scope = InterruptScope::install(Arc::clone(&interrupt));
    debug!(worker = name, "Fixed worker started");
    // Checked before each receive so an interrupted worker leaves the rest of
    // the channel to `shutdown`. A task already received is always run.
    while !interrupt.load(Ordering::Acquire) {
        // recv() returns Err once the sender is dropped and the channel is empty.
        let Ok(task) = rx.recv() else {
            break;
        };
        let task_name = task.name().map(str::to_owned);
        counters.active_tasks.fetch_add(1, Ordering::Relaxed);
        let outcome = task.run();
        counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
        match outcome {
            Ok(()) => {
                counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
            }
            Err(failure) => {
                counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                sink.report(FailureReport {
                    worker: name.to_owned(),
                    task_name,
                    failure,
                });
            }
        }
    }
    debug!(worker = name, "Fixed worker exiting");
}
