//! Tests for configuration validation

use scalable_pool::config::{PoolConfig, SchedulerConfig, DEFAULT_THREAD_NAME_PREFIX};
use std::time::Duration;

#[test]
fn test_pool_config_validation() {
    let valid = PoolConfig::new()
        .with_core_pool_size(2)
        .with_maximum_pool_size(8)
        .with_keep_alive(Duration::from_secs(1));
    assert!(valid.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_maximum() {
    let invalid = PoolConfig::new()
        .with_core_pool_size(0)
        .with_maximum_pool_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_core_timeout() {
    let invalid = PoolConfig::new()
        .with_keep_alive(Duration::ZERO)
        .with_allow_core_timeout(true);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_invalid_thread_settings() {
    assert!(PoolConfig::new()
        .with_thread_name_prefix("")
        .validate()
        .is_err());
    assert!(PoolConfig::new()
        .with_thread_stack_size(Some(0))
        .validate()
        .is_err());
}

#[test]
fn test_scheduler_config_from_json() {
    let json = r#"{
        "pools": {
            "io": {
                "core_pool_size": 2,
                "maximum_pool_size": 16,
                "keep_alive_ms": 5000,
                "queue_capacity": 1000
            },
            "cpu": {
                "core_pool_size": 4,
                "maximum_pool_size": 4,
                "thread_name_prefix": "cpu"
            }
        }
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.pools.len(), 2);

    let io = &cfg.pools["io"];
    assert_eq!(io.maximum_pool_size, 16);
    assert_eq!(io.keep_alive(), Duration::from_secs(5));
    assert_eq!(io.queue_capacity, Some(1000));
    assert_eq!(io.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);

    let cpu = &cfg.pools["cpu"];
    assert_eq!(cpu.thread_name_prefix, "cpu");
    assert_eq!(cpu.queue_capacity, None);
}

#[test]
fn test_scheduler_config_rejects_invalid_pool() {
    let json = r#"{ "pools": { "broken": { "core_pool_size": 9, "maximum_pool_size": 3 } } }"#;
    let err = SchedulerConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("broken"));
}

#[test]
fn test_scheduler_config_requires_a_pool() {
    let err = SchedulerConfig::from_json_str(r#"{ "pools": {} }"#).unwrap_err();
    assert!(err.contains("at least one pool"));
}

#[test]
fn test_pool_config_from_env() {
    std::env::set_var("POOL_CORE_SIZE", "3");
    std::env::set_var("POOL_MAX_SIZE", "12");
    std::env::set_var("POOL_KEEP_ALIVE_MS", "250");
    std::env::set_var("POOL_QUEUE_CAPACITY", "64");
    std::env::set_var("POOL_THREAD_NAME_PREFIX", "env-worker");

    let cfg = PoolConfig::from_env().unwrap();
    assert_eq!(cfg.core_pool_size, 3);
    assert_eq!(cfg.maximum_pool_size, 12);
    assert_eq!(cfg.keep_alive(), Duration::from_millis(250));
    assert_eq!(cfg.queue_capacity, Some(64));
    assert_eq!(cfg.thread_name_prefix, "env-worker");

    std::env::set_var("POOL_MAX_SIZE", "not-a-number");
    let err = PoolConfig::from_env().unwrap_err();
    assert!(format!("{err:#}").contains("POOL_MAX_SIZE"));

    for key in [
        "POOL_CORE_SIZE",
        "POOL_MAX_SIZE",
        "POOL_KEEP_ALIVE_MS",
        "POOL_QUEUE_CAPACITY",
        "POOL_THREAD_NAME_PREFIX",
    ] {
        std::env::remove_var(key);
    }
}
