//! Worker pools, their admission logic, and the task/failure types they share.

pub mod error;
pub mod failure;
pub mod task;
pub mod worker_pool;

pub use error::{AppResult, PoolError, RejectReason, Rejected};
pub use failure::{FailureReport, FailureSink, InMemoryFailureSink, TracingFailureSink};
pub use task::{Task, TaskFailure};
pub use worker_pool::{
    is_interrupted, Admission, FixedPool, PoolStats, ScalablePool, ShutdownMode, Take,
    TransferQueue,
};
