pub mod config;
pub mod error;
pub mod metrics;
pub mod names;
pub mod observability;
pub mod ranking;
pub mod reconcile;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, RedisConfig, RetryConfig};
pub use error::{CacheError, LeaderboardError};
pub use names::NameCache;
pub use observability::{LoggingError, apply_logging_level, init_tracing};
pub use ranking::{RankLookup, RankedEntry, RankingStore};
pub use reconcile::{ReconciliationReader, read_through};
pub use resolver::BatchResolver;
pub use retry::{RetryPolicy, Retryable};
pub use service::{GameRank, Leaderboard, LeaderboardRow, LeaderboardService, TopPlayer, UserRanking};
pub use store::{DynStoreClient, LocalStore, RedisStore, StoreClient};

use std::sync::Arc;

/// Create the store client based on configuration.
///
/// ## Store Modes
///
/// - **Redis disabled**: Returns the in-process store (DashMap)
/// - **Redis enabled**: Attempts to connect to Redis, falls back to local on failure
///
/// ## Graceful Degradation
///
/// If the Redis connection fails, rankings and names live in process memory.
/// This allows a single instance to start and run even if Redis is unavailable.
pub async fn create_store_client(config: &RedisConfig) -> DynStoreClient {
    if !config.enabled {
        tracing::info!("Redis disabled, using local store");
        return Arc::new(LocalStore::new());
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = Some(config.timeout());
    let mut timeouts = deadpool_redis::Timeouts::default();
    timeouts.wait = timeout;
    timeouts.create = timeout;
    timeouts.recycle = timeout;
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts = timeouts;

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local store."
            );
            return Arc::new(LocalStore::new());
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis successfully");
            Arc::new(RedisStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local store."
            );
            Arc::new(LocalStore::new())
        }
    }
}
