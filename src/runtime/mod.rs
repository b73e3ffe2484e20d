//! Host runtime adapters: thread spawning and result handles.

#[cfg(feature = "tokio-runtime")]
pub mod completion;
pub mod spawner;

#[cfg(feature = "tokio-runtime")]
pub use completion::{TaskHandle, TaskLost};
pub use spawner::{OsThreadSpawner, ThreadSpawner, WorkerBody};
