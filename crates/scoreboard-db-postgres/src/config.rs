//! The `[storage.postgres]` configuration section.

use serde::{Deserialize, Serialize};

/// Connection and pool settings for the durable store.
///
/// The connection is either a full `url` or assembled from `host`, `port`,
/// `user`, `password` and `database`; `url` wins when both are given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,

    /// Upper bound on pooled connections.
    pub pool_size: u32,
    /// Connections kept open while idle; a quarter of `pool_size` when unset.
    pub min_connections: Option<u32>,
    /// How long a caller waits for a pooled connection.
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: Option<u64>,
    /// Connections are recycled after this long; 30 minutes when unset.
    pub max_lifetime_secs: Option<u64>,

    /// Apply the embedded schema migrations when the store opens.
    pub run_migrations: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: None,
            database: "scoreboard".into(),
            pool_size: 10,
            min_connections: None,
            connect_timeout_ms: 5000,
            idle_timeout_ms: Some(300_000),
            max_lifetime_secs: None,
            run_migrations: true,
        }
    }
}

impl PostgresConfig {
    /// Connection string handed to the driver.
    #[must_use]
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let credentials = match &self.password {
            Some(password) => format!("{}:{password}", self.user),
            None => self.user.clone(),
        };
        format!(
            "postgres://{credentials}@{}:{}/{}",
            self.host, self.port, self.database
        )
    }

    /// Checks the section before any connection is attempted.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_none() {
            if self.host.is_empty() {
                return Err("storage.postgres requires either 'url' or 'host' to be set".into());
            }
            if self.database.is_empty() {
                return Err("storage.postgres.database must not be empty".into());
            }
        }
        if self.pool_size == 0 {
            return Err("storage.postgres.pool_size must be > 0".into());
        }
        if self.min_connections.is_some_and(|min| min > self.pool_size) {
            return Err("storage.postgres.min_connections must not exceed pool_size".into());
        }
        Ok(())
    }
}
