//! Configuration models for pools and pool sets.

pub mod pool;

pub use pool::{PoolConfig, SchedulerConfig, DEFAULT_KEEP_ALIVE_MS, DEFAULT_THREAD_NAME_PREFIX};
