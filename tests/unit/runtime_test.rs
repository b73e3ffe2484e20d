//! Tests for runtime adapters

use scalable_pool::config::PoolConfig;
use scalable_pool::core::{ScalablePool, ShutdownMode};
use scalable_pool::runtime::{OsThreadSpawner, ThreadSpawner};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_spawner_with_stack_size() {
    let handle = OsThreadSpawner::with_stack_size(256 * 1024)
        .spawn("stack-test".to_string(), Box::new(|| {}))
        .unwrap();
    handle.join().unwrap();
}

#[test]
fn test_pool_uses_configured_stack_size() {
    let config = PoolConfig::new()
        .with_core_pool_size(1)
        .with_maximum_pool_size(1)
        .with_thread_stack_size(Some(512 * 1024))
        .with_thread_name_prefix("stacked");
    let spawner = Arc::new(OsThreadSpawner::from_config(&config));
    let pool = ScalablePool::with_components(
        config,
        Arc::new(scalable_pool::core::TracingFailureSink),
        spawner,
    )
    .unwrap();

    let (tx, rx) = flume::unbounded();
    pool.execute(move || {
        tx.send(std::thread::current().name().map(str::to_owned))
            .unwrap();
    })
    .unwrap();
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5)).unwrap().as_deref(),
        Some("stacked-0")
    );

    pool.shutdown(ShutdownMode::Graceful);
    assert!(pool.await_termination(Duration::from_secs(5)));
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test]
async fn test_handle_awaited_from_async_context() {
    let pool = ScalablePool::with_limits(1, 2, Duration::from_secs(5)).unwrap();
    let handle = pool.spawn_with_handle(|| vec![1, 2, 3]).unwrap();
    assert_eq!(handle.await.unwrap(), vec![1, 2, 3]);
}
