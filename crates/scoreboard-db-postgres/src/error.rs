//! Error types for the PostgreSQL storage backend.

use scoreboard_storage::{EntityKind, StorageError};
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for unique constraint violations (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for foreign key violations (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Returns the violated constraint name, if the error carries one.
fn constraint_name(err: &SqlxError) -> Option<String> {
    match err {
        SqlxError::Database(db_err) => db_err.constraint().map(str::to_string),
        _ => None,
    }
}

/// Maps a sqlx error raised while operating on `kind` records to the
/// storage taxonomy.
///
/// Pool exhaustion and I/O failures become `ConnectionError`, so callers can
/// tell an unreachable system of record apart from a bad request.
pub fn map_sqlx_error(err: SqlxError, kind: EntityKind, context: &str) -> StorageError {
    if has_pg_error_code(&err, PG_UNIQUE_VIOLATION) {
        let detail = constraint_name(&err).unwrap_or_else(|| "unique constraint".to_string());
        return StorageError::already_exists(kind, detail);
    }
    if has_pg_error_code(&err, PG_FOREIGN_KEY_VIOLATION) {
        let detail = constraint_name(&err).unwrap_or_else(|| "foreign key".to_string());
        return StorageError::invalid_input(format!("{context}: unknown reference ({detail})"));
    }
    match err {
        SqlxError::Io(_)
        | SqlxError::Tls(_)
        | SqlxError::PoolTimedOut
        | SqlxError::PoolClosed
        | SqlxError::WorkerCrashed => StorageError::connection_error(format!("{context}: {err}")),
        other => StorageError::internal(format!("{context}: {other}")),
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;
