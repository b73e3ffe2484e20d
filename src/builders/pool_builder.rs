//! Builders to construct scalable pools from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::config::{PoolConfig, SchedulerConfig};
use crate::core::{FailureSink, PoolError, ScalablePool};
use crate::runtime::OsThreadSpawner;

/// Build one [`ScalablePool`] per named entry of `cfg`.
///
/// `sink_factory` is called once per pool to pick where its task failures go.
/// The whole configuration is validated before any pool is started.
///
/// # Errors
///
/// - `PoolError::InvalidConfig` if any pool configuration is invalid
/// - `PoolError::Spawn` if prestarting a pool's core workers fails
pub fn build_pools<FS>(
    cfg: &SchedulerConfig,
    mut sink_factory: FS,
) -> Result<HashMap<String, ScalablePool>, PoolError>
where
    FS: FnMut(&str, &PoolConfig) -> Arc<dyn FailureSink>,
{
    cfg.validate()
        .map_err(|e| PoolError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let sink = sink_factory(name, pool_cfg);
        let spawner = Arc::new(OsThreadSpawner::from_config(pool_cfg));
        let pool = ScalablePool::with_components(pool_cfg.clone(), sink, spawner)?;
        info!(pool = %name, pool_id = %pool.id(), "Pool built from configuration");
        pools.insert(name.clone(), pool);
    }

    Ok(pools)
}
