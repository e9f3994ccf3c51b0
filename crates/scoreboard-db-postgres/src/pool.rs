//! Connection pool for the durable store.

use std::time::Duration;

use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::info;

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};

const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Pool sizing and timeouts for `config`.
fn pool_options(config: &PostgresConfig) -> Result<PoolOptions<Postgres>> {
    config.validate().map_err(PostgresError::config)?;

    let min_connections = config
        .min_connections
        .unwrap_or((config.pool_size / 4).max(1));
    let max_lifetime = config
        .max_lifetime_secs
        .map_or(DEFAULT_MAX_LIFETIME, Duration::from_secs);

    Ok(PoolOptions::new()
        .max_connections(config.pool_size)
        .min_connections(min_connections)
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .max_lifetime(max_lifetime)
        .test_before_acquire(false))
}

/// Opens the pool; fails fast on an invalid section or unreachable server.
pub async fn create_pool(config: &PostgresConfig) -> Result<PgPool> {
    let options = pool_options(config)?;
    let url = config.connection_url();
    info!(
        url = %redact_url(&url),
        max_connections = options.get_max_connections(),
        min_connections = options.get_min_connections(),
        "Opening PostgreSQL pool"
    );
    Ok(options.connect(&url).await?)
}

/// Replaces the password of a connection URL, if it has one.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}
