//! Thread spawning for pool workers.

use std::io;
use std::thread::{self, JoinHandle};

use crate::config::PoolConfig;

/// Body run by a worker thread.
pub type WorkerBody = Box<dyn FnOnce() + Send + 'static>;

/// Abstraction for starting worker threads on the host.
///
/// Pools call this with their admission lock held, so implementations
/// must not call back into the pool.
pub trait ThreadSpawner: Send + Sync + 'static {
    /// Start `body` on a new thread called `name`.
    ///
    /// # Errors
    ///
    /// Returns the host's error when the thread cannot be created. The body
    /// must not have run in that case.
    fn spawn(&self, name: String, body: WorkerBody) -> io::Result<JoinHandle<()>>;
}

/// Spawner backed by `std::thread::Builder`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsThreadSpawner {
    stack_size: Option<usize>,
}

impl OsThreadSpawner {
    /// Spawner using the platform default stack size.
    #[must_use]
    pub const fn new() -> Self {
        Self { stack_size: None }
    }

    /// Spawner using a fixed stack size for every thread.
    #[must_use]
    pub const fn with_stack_size(stack_size: usize) -> Self {
        Self {
            stack_size: Some(stack_size),
        }
    }

    /// Spawner matching the thread settings of a pool configuration.
    #[must_use]
    pub const fn from_config(config: &PoolConfig) -> Self {
        Self {
            stack_size: config.thread_stack_size,
        }
    }
}

impl ThreadSpawner for OsThreadSpawner {
    fn spawn(&self, name: String, body: WorkerBody) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(body)
    }
}
