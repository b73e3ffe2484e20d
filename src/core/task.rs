//! Units of work accepted by the pools.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

type Body = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// An opaque unit of work with a single `run` operation.
///
/// A task is owned by exactly one holder at a time (the caller, the backlog,
/// a hand-off slot, or the worker running it) and is consumed by `run`.
///
/// ```
/// use scalable_pool::core::Task;
///
/// let task = Task::new(|| println!("hello from a worker"));
/// assert!(task.run().is_ok());
///
/// let named = Task::fallible(|| anyhow::bail!("disk full")).with_name("flush");
/// assert_eq!(named.name(), Some("flush"));
/// assert!(named.run().is_err());
/// ```
pub struct Task {
    name: Option<Cow<'static, str>>,
    body: Body,
}

impl Task {
    /// Wrap an infallible closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            name: None,
            body: Box::new(move || {
                f();
                Ok(())
            }),
        }
    }

    /// Wrap a closure whose failure should be reported to the pool's sink.
    pub fn fallible<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: None,
            body: Box::new(f),
        }
    }

    /// Attach a name used in failure reports and logs.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The task's name, if one was attached.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Run the task, converting both returned errors and panics into a
    /// [`TaskFailure`].
    ///
    /// # Errors
    ///
    /// Returns `TaskFailure::Failed` when the body returns an error and
    /// `TaskFailure::Panicked` when it panics.
    pub fn run(self) -> Result<(), TaskFailure> {
        match panic::catch_unwind(AssertUnwindSafe(self.body)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(TaskFailure::Failed(err)),
            Err(payload) => Err(TaskFailure::Panicked(panic_message(payload.as_ref()))),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Failure raised while running a task. Always caught at the worker
/// boundary; never propagated to submitters.
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// The task body returned an error.
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),
    /// The task body panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskFailure {
    /// Whether the failure was a panic rather than a returned error.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
