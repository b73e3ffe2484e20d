//! Tests for error types

use scalable_pool::core::{PoolError, RejectReason, TaskFailure, Task};

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("maximum_pool_size must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: maximum_pool_size must be greater than 0"
    );
}

#[test]
fn test_spawn_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::OutOfMemory, "no threads left");
    let err = PoolError::from(io);
    assert!(matches!(err, PoolError::Spawn(_)));
    assert_eq!(format!("{err}"), "failed to spawn worker thread: no threads left");
}

#[test]
fn test_reject_reason_display() {
    assert_eq!(
        format!("{}", RejectReason::Saturated),
        "pool saturated and backlog full"
    );
    assert_eq!(format!("{}", RejectReason::Shutdown), "pool has been shut down");
}

#[test]
fn test_task_failure_display() {
    let failure = Task::fallible(|| Err(anyhow::anyhow!("disk full")))
        .run()
        .unwrap_err();
    assert!(matches!(failure, TaskFailure::Failed(_)));
    assert_eq!(format!("{failure}"), "task failed: disk full");

    let failure = Task::new(|| panic!("index out of range")).run().unwrap_err();
    assert!(failure.is_panic());
    assert_eq!(format!("{failure}"), "task panicked: index out of range");
}
