//! Tests for building pools from configuration

use scalable_pool::builders::build_pools;
use scalable_pool::config::SchedulerConfig;
use scalable_pool::core::{
    FailureSink, InMemoryFailureSink, PoolError, ShutdownMode, Task, TracingFailureSink,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_build_pools_from_config() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "pools": {
                "fast": { "core_pool_size": 1, "maximum_pool_size": 2, "prestart_core_workers": true },
                "slow": { "core_pool_size": 0, "maximum_pool_size": 1 }
            }
        }"#,
    )
    .unwrap();

    let mut seen = Vec::new();
    let pools = build_pools(&cfg, |name, _| {
        seen.push(name.to_string());
        Arc::new(TracingFailureSink) as Arc<dyn FailureSink>
    })
    .unwrap();

    seen.sort();
    assert_eq!(seen, vec!["fast".to_string(), "slow".to_string()]);
    assert_eq!(pools["fast"].pool_size(), 1);
    assert_eq!(pools["slow"].pool_size(), 0);
    assert_eq!(pools["fast"].config().maximum_pool_size, 2);

    for pool in pools.values() {
        pool.shutdown(ShutdownMode::Graceful);
        assert!(pool.await_termination(Duration::from_secs(5)));
    }
}

#[test]
fn test_build_pools_routes_failures_to_sink() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{ "pools": { "only": { "core_pool_size": 1, "maximum_pool_size": 1 } } }"#,
    )
    .unwrap();
    let sink = InMemoryFailureSink::shared(4);

    let pools = build_pools(&cfg, |_, _| Arc::clone(&sink) as Arc<dyn FailureSink>).unwrap();
    let pool = &pools["only"];
    pool.submit(Task::fallible(|| Err(anyhow::anyhow!("nope"))))
        .unwrap();
    pool.shutdown(ShutdownMode::Graceful);
    assert!(pool.await_termination(Duration::from_secs(5)));

    assert_eq!(sink.len(), 1);
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let mut cfg = SchedulerConfig::from_json_str(
        r#"{ "pools": { "p": { "core_pool_size": 1, "maximum_pool_size": 1 } } }"#,
    )
    .unwrap();
    if let Some(pool) = cfg.pools.get_mut("p") {
        pool.maximum_pool_size = 0;
    }

    let result = build_pools(&cfg, |_, _| Arc::new(TracingFailureSink) as Arc<dyn FailureSink>);
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}
