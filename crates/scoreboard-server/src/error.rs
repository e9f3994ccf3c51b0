//! Error taxonomy for the ranking and name-cache core.
//!
//! - Cache-layer faults ([`CacheError`]) are absorbed wherever a durable
//!   fallback exists and retried on writes when transient.
//! - Durable-layer faults ([`StorageError`]) are never absorbed.
//! - "No data" outcomes are typed results, not errors.

use scoreboard_storage::{EntityKind, ErrorCategory, StorageError};

use crate::retry::Retryable;

/// Failure talking to the ranking store / key-value cache.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Connection refused, dropped, timed out, or no pooled connection
    /// available. Transient.
    #[error("cache unavailable: {message}")]
    Unavailable { message: String },

    /// The store answered, but with an error (wrong type, malformed reply).
    /// Retrying will not help.
    #[error("cache command failed: {message}")]
    Command { message: String },
}

impl CacheError {
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// Returns `true` for failures worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl Retryable for CacheError {
    fn is_transient(&self) -> bool {
        CacheError::is_transient(self)
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
        {
            CacheError::unavailable(err.to_string())
        } else {
            CacheError::command(err.to_string())
        }
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        CacheError::unavailable(format!("failed to get Redis connection: {err}"))
    }
}

/// Errors surfaced by the leaderboard facade and the read-through helpers.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    /// A cache write failed after exhausting retries, or a ranking read
    /// failed with no durable fallback.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The system of record failed. Never absorbed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Neither the cache nor the durable store knows this entity.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// A rank window with `start > end`.
    #[error("invalid rank window: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },
}

impl LeaderboardError {
    #[must_use]
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Category reported alongside the error when a command fails.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Cache(CacheError::Unavailable { .. }) => ErrorCategory::Infrastructure,
            Self::Cache(CacheError::Command { .. }) => ErrorCategory::Internal,
            Self::Storage(err) => err.category(),
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidRange { .. } => ErrorCategory::Validation,
        }
    }
}
