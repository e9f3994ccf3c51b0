//! The durable store trait.
//!
//! The ranking store and the name cache are allowed to be stale relative to
//! whatever implements this trait; it is the single source of truth for
//! entity existence and attributes.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{
    EntityKind, GameRecord, NamedRecord, NewScore, NewUser, ScoreRecord, UserId, UserRecord,
};

/// Contract every durable backend must implement.
///
/// Implementations must be thread-safe (`Send + Sync`); callers share one
/// instance behind an `Arc`.
///
/// # Example
///
/// ```ignore
/// use scoreboard_storage::{EntityKind, LeaderboardStorage, StorageError};
///
/// async fn username(storage: &dyn LeaderboardStorage, id: i64) -> Result<String, StorageError> {
///     storage
///         .get_by_id(EntityKind::User, id)
///         .await?
///         .map(|record| record.name)
///         .ok_or_else(|| StorageError::not_found(EntityKind::User, id))
/// }
/// ```
#[async_trait]
pub trait LeaderboardStorage: Send + Sync {
    /// Reads the display name of one user or game.
    ///
    /// Returns `None` if no such record exists.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing records.
    async fn get_by_id(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<NamedRecord>, StorageError>;

    /// Reads the display names of many users or games in one query.
    ///
    /// Records for unknown ids are simply absent from the result; the order
    /// of the result is unspecified.
    async fn get_many_by_ids(
        &self,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<NamedRecord>, StorageError>;

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the username or email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StorageError>;

    /// Creates a game.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the name is taken.
    async fn create_game(&self, name: &str) -> Result<GameRecord, StorageError>;

    /// Lists every game, ordered by id.
    async fn list_games(&self) -> Result<Vec<GameRecord>, StorageError>;

    /// Appends a score submission to the history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if the user or game is unknown.
    async fn insert_score(&self, score: &NewScore) -> Result<ScoreRecord, StorageError>;

    /// Reads full user profiles for many ids. Unknown ids are absent.
    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
