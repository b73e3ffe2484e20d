//! Worker loop: `Idle → Running → Idle → … → Terminated`.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::debug;

use crate::core::failure::FailureReport;
use crate::core::task::Task;

use super::queue::Take;
use super::scalable::PoolCore;

thread_local! {
    static INTERRUPT: RefCell<Option<Arc<AtomicBool>>> = const { RefCell::new(None) };
}

/// Whether the pool running the current task has asked it to stop.
///
/// Set for every worker by an immediate shutdown. Tasks that run for a long
/// time should poll this and return early; the pool never stops a running
/// task by force. Always `false` outside a pool worker.
#[must_use]
pub fn is_interrupted() -> bool {
    INTERRUPT.with(|flag| {
        flag.borrow()
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    })
}

/// Installs a worker's interrupt flag for the lifetime of the guard.
pub(super) struct InterruptScope;

impl InterruptScope {
    pub(super) fn install(flag: Arc<AtomicBool>) -> Self {
        INTERRUPT.with(|slot| *slot.borrow_mut() = Some(flag));
        Self
    }
}

impl Drop for InterruptScope {
    fn drop(&mut self) {
        INTERRUPT.with(|slot| slot.borrow_mut().take());
    }
}

/// Returns the worker's slot to the pool unless an idle retirement already
/// did. Runs on every exit path, panics included.
struct ExitGuard<'a> {
    core: &'a PoolCore,
    worker_id: usize,
    released: bool,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.core.worker_exited(self.worker_id);
        }
    }
}

pub(super) struct Worker {
    id: usize,
    core: Arc<PoolCore>,
    first_task: Arc<Mutex<Option<Task>>>,
    interrupt: Arc<AtomicBool>,
}

impl Worker {
    pub(super) const fn new(
        id: usize,
        core: Arc<PoolCore>,
        first_task: Arc<Mutex<Option<Task>>>,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            core,
            first_task,
            interrupt,
        }
    }

    pub(super) fn run(self) {
        let _scope = InterruptScope::install(Arc::clone(&self.interrupt));
        let mut guard = ExitGuard {
            core: &self.core,
            worker_id: self.id,
            released: false,
        };
        let name = thread::current()
            .name()
            .map_or_else(|| format!("worker-{}", self.id), str::to_owned);

        debug!(pool_id = %self.core.id, worker_id = self.id, "Worker thread started");

        let mut next = self.first_task.lock().take();
        loop {
            let task = match next.take() {
                Some(task) => task,
                None => match self.next_task(&mut guard) {
                    Some(task) => task,
                    None => break,
                },
            };
            self.execute(task, &name);
        }

        debug!(pool_id = %self.core.id, worker_id = self.id, "Worker thread exiting");
    }

    /// Idle state. Returns `None` when the worker should terminate.
    fn next_task(&self, guard: &mut ExitGuard<'_>) -> Option<Task> {
        // Cleared once a timeout has shown this worker is needed to hold the
        // core size; it then waits without a deadline until its next task.
        let mut timed = true;
        loop {
            if self.interrupt.load(Ordering::Acquire) {
                debug!(pool_id = %self.core.id, worker_id = self.id, "Worker interrupted");
                return None;
            }
            let outcome = if timed {
                self.core.queue.take_timeout(self.core.keep_alive)
            } else {
                self.core.queue.take().map_or(Take::Closed, Take::Item)
            };
            match outcome {
                Take::Item(task) => return Some(task),
                Take::Closed => return None,
                Take::TimedOut => {
                    if self.core.try_retire(self.id) {
                        guard.released = true;
                        return None;
                    }
                    timed = false;
                }
            }
        }
    }

    /// Running state. Failures are reported, never propagated.
    fn execute(&self, task: Task, worker_name: &str) {
        let counters = &self.core.counters;
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
                self.core.sink.report(FailureReport {
                    worker: worker_name.to_owned(),
                    task_name,
                    failure,
                });
            }
        }
    }
}
