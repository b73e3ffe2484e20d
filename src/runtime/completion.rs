//! Result-bearing submissions.
//!
//! [`ScalablePool::spawn_with_handle`] wraps a closure so its return value
//! travels back over a oneshot channel. The handle can be awaited from async
//! code or waited on from a plain thread.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::core::error::Rejected;
use crate::core::task::Task;
use crate::core::worker_pool::{Admission, ScalablePool};

/// The task ended without producing a value (it panicked, or was discarded
/// by an immediate shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task finished without producing a result")]
pub struct TaskLost;

/// Handle to the eventual result of a task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
    admission: Admission,
}

impl<T> TaskHandle<T> {
    /// How the pool admitted the task.
    #[must_use]
    pub const fn admission(&self) -> Admission {
        self.admission
    }

    /// Block the current thread until the result arrives.
    ///
    /// Must not be called from inside an async runtime; await the handle
    /// there instead.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLost`] if the task never produced a value.
    pub fn wait(self) -> Result<T, TaskLost> {
        self.rx.blocking_recv().map_err(|_| TaskLost)
    }

    /// Take the result if it is already available.
    ///
    /// # Errors
    ///
    /// Returns `Ok(None)` while the task is still pending and [`TaskLost`]
    /// once it is known that no value will arrive.
    pub fn try_wait(&mut self) -> Result<Option<T>, TaskLost> {
        match self.rx.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(TaskLost),
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskLost>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|r| r.map_err(|_| TaskLost))
    }
}

impl ScalablePool {
    /// Submit a closure and get a handle to its return value.
    ///
    /// ```
    /// use scalable_pool::core::worker_pool::ScalablePool;
    /// use std::time::Duration;
    ///
    /// let pool = ScalablePool::with_limits(1, 2, Duration::from_secs(5)).unwrap();
    /// let handle = pool.spawn_with_handle(|| 6 * 7).unwrap();
    /// assert_eq!(handle.wait(), Ok(42));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the pool is saturated or shut down.
    pub fn spawn_with_handle<F, T>(&self, f: F) -> Result<TaskHandle<T>, Rejected>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = Task::new(move || {
            // The receiver may have been dropped; nobody wants the value then.
            let _ = tx.send(f());
        });
        let admission = self.submit(task)?;
        Ok(TaskHandle { rx, admission })
    }
}
