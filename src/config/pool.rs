//! Pool and scheduler configuration structures.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Default idle time before a non-core worker retires.
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 60_000;

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "pool-worker";

/// Configuration for a [`ScalablePool`](crate::core::worker_pool::ScalablePool).
///
/// Immutable once the pool is built.
///
/// ```
/// use scalable_pool::config::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_core_pool_size(2)
///     .with_maximum_pool_size(8)
///     .with_keep_alive(Duration::from_millis(500))
///     .with_queue_capacity(Some(100));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers kept alive even when idle.
    pub core_pool_size: usize,
    /// Hard cap on concurrently alive workers.
    pub maximum_pool_size: usize,
    /// Idle time in milliseconds before a worker above the core size retires.
    pub keep_alive_ms: u64,
    /// Backlog bound. `None` is unbounded; `Some(0)` admits only by hand-off
    /// or growth.
    pub queue_capacity: Option<usize>,
    /// Let core workers retire on idleness too.
    pub allow_core_timeout: bool,
    /// Start `core_pool_size` workers at construction instead of on demand.
    pub prestart_core_workers: bool,
    /// Worker threads are named `{prefix}-{id}`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads; platform default when unset.
    pub thread_stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_pool_size: 1,
            maximum_pool_size: num_cpus::get().max(1),
            keep_alive_ms: DEFAULT_KEEP_ALIVE_MS,
            queue_capacity: None,
            allow_core_timeout: false,
            prestart_core_workers: false,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            thread_stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the core pool size.
    #[must_use]
    pub fn with_core_pool_size(mut self, size: usize) -> Self {
        self.core_pool_size = size;
        self
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn with_maximum_pool_size(mut self, size: usize) -> Self {
        self.maximum_pool_size = size;
        self
    }

    /// Set the keep-alive duration (millisecond precision).
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the backlog bound.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: Option<usize>) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Allow or forbid core workers retiring on idleness.
    #[must_use]
    pub fn with_allow_core_timeout(mut self, allow: bool) -> Self {
        self.allow_core_timeout = allow;
        self
    }

    /// Start core workers eagerly.
    #[must_use]
    pub fn with_prestart_core_workers(mut self, prestart: bool) -> Self {
        self.prestart_core_workers = prestart;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub fn with_thread_stack_size(mut self, size: Option<usize>) -> Self {
        self.thread_stack_size = size;
        self
    }

    /// Keep-alive as a `Duration`.
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.maximum_pool_size == 0 {
            return Err("maximum_pool_size must be greater than 0".into());
        }
        if self.core_pool_size > self.maximum_pool_size {
            return Err(format!(
                "core_pool_size ({}) must not exceed maximum_pool_size ({})",
                self.core_pool_size, self.maximum_pool_size
            ));
        }
        if self.keep_alive_ms == 0 && self.allow_core_timeout {
            return Err("keep_alive_ms must be greater than 0 when core workers may time out".into());
        }
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Build a configuration from `POOL_*` environment variables, after
    /// loading a `.env` file if one exists. Unset variables keep their
    /// defaults.
    ///
    /// Recognized: `POOL_CORE_SIZE`, `POOL_MAX_SIZE`, `POOL_KEEP_ALIVE_MS`,
    /// `POOL_QUEUE_CAPACITY`, `POOL_ALLOW_CORE_TIMEOUT`,
    /// `POOL_PRESTART_CORE`, `POOL_THREAD_NAME_PREFIX`,
    /// `POOL_THREAD_STACK_SIZE`.
    ///
    /// # Errors
    ///
    /// Fails when a variable cannot be parsed or the result is invalid.
    pub fn from_env() -> AppResult<Self> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Some(v) = env_var("POOL_CORE_SIZE")? {
            cfg.core_pool_size = v;
        }
        if let Some(v) = env_var("POOL_MAX_SIZE")? {
            cfg.maximum_pool_size = v;
        }
        if let Some(v) = env_var("POOL_KEEP_ALIVE_MS")? {
            cfg.keep_alive_ms = v;
        }
        if let Some(v) = env_var("POOL_QUEUE_CAPACITY")? {
            cfg.queue_capacity = Some(v);
        }
        if let Some(v) = env_var("POOL_ALLOW_CORE_TIMEOUT")? {
            cfg.allow_core_timeout = v;
        }
        if let Some(v) = env_var("POOL_PRESTART_CORE")? {
            cfg.prestart_core_workers = v;
        }
        if let Ok(prefix) = env::var("POOL_THREAD_NAME_PREFIX") {
            cfg.thread_name_prefix = prefix;
        }
        if let Some(v) = env_var("POOL_THREAD_STACK_SIZE")? {
            cfg.thread_stack_size = Some(v);
        }

        cfg.validate()
            .map_err(|e| anyhow::anyhow!("pool config from environment invalid: {e}"))?;
        Ok(cfg)
    }
}

fn env_var<T>(key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("failed to parse {key}={raw:?}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {key}")),
    }
}

/// Root configuration for a set of named pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, PoolConfig>,
}

impl SchedulerConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Returns a description naming the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
