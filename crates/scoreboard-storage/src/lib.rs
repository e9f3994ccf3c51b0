//! # scoreboard-storage
//!
//! Durable store contract for the scoreboard ranking service.
//!
//! This crate defines the trait and record types that every durable backend
//! must implement. It does not contain any implementations; the PostgreSQL
//! backend lives in `scoreboard-db-postgres`.
//!
//! ## Overview
//!
//! The main trait is [`LeaderboardStorage`]. The caching layers consume only
//! its narrow lookup contract:
//! - `get_by_id(kind, id)` → record or `None`
//! - `get_many_by_ids(kind, ids)` → the records that exist
//!
//! The remaining methods (registration, game creation, score history) back
//! the write paths of the service facade.
//!
//! ## Example
//!
//! ```ignore
//! use scoreboard_storage::{EntityKind, LeaderboardStorage, StorageError};
//!
//! async fn names(
//!     storage: &dyn LeaderboardStorage,
//!     ids: &[i64],
//! ) -> Result<Vec<String>, StorageError> {
//!     let records = storage.get_many_by_ids(EntityKind::User, ids).await?;
//!     Ok(records.into_iter().map(|r| r.name).collect())
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::LeaderboardStorage;
pub use types::{
    EntityKind, GameId, GameRecord, NamedRecord, NewScore, NewUser, ScoreRecord, UserId,
    UserRecord,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn LeaderboardStorage>;
