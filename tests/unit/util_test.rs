//! Tests for utility functions

use scalable_pool::util::{init_tracing, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_default_log_directive() {
    assert_eq!(DEFAULT_LOG_DIRECTIVE, "info");
}

#[test]
fn test_init_tracing_twice() {
    init_tracing();
    init_tracing();
}
