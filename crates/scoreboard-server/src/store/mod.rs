//! Store client abstraction over the ranking store and the name cache.
//!
//! ## Backends
//!
//! - **Redis** ([`RedisStore`]): shared across instances; sorted sets for
//!   rankings, plain string keys for names, pipelines for batches.
//! - **Local** ([`LocalStore`]): in-process, same ordering semantics; used
//!   when Redis is disabled or unreachable, and in tests.
//!
//! One client is built at process start ([`crate::create_store_client`])
//! and handed to every component explicitly.
//!
//! ## Key Space
//!
//! ```text
//! leaderboard:{game_id}   sorted set   member = user id, score = latest score
//! user:{id}               string       display name
//! game:{id}               string       display name
//! ```
//!
//! ## Ordering
//!
//! Reverse queries order members by score descending; equal scores are
//! ordered by member in descending byte-wise lexicographic order. This is the
//! native Redis rule and [`LocalStore`] reproduces it.

mod local;
mod redis_store;

pub use self::local::LocalStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use scoreboard_storage::{EntityKind, GameId};
use std::sync::Arc;

use crate::error::CacheError;

/// Prefix of every ranking set key.
pub const LEADERBOARD_PREFIX: &str = "leaderboard:";

/// Type filter used when enumerating ranking sets.
pub const SORTED_SET_TYPE: &str = "zset";

/// Ranking set key of one game.
#[must_use]
pub fn leaderboard_key(game_id: GameId) -> String {
    format!("{LEADERBOARD_PREFIX}{game_id}")
}

/// Parses a ranking set key back into its game id.
#[must_use]
pub fn parse_leaderboard_key(key: &str) -> Option<GameId> {
    key.strip_prefix(LEADERBOARD_PREFIX)?.parse().ok()
}

/// Name cache key of one entity; kinds live in separate namespaces.
#[must_use]
pub fn name_key(kind: EntityKind, id: i64) -> String {
    format!("{}:{id}", kind.as_str())
}

/// Outcome of one command inside a pipeline.
///
/// Batch methods return `Ok(replies)` when the round trip itself succeeded;
/// each reply still carries its own command error (a key holding the wrong
/// type, for instance).
pub type Reply<T> = Result<T, CacheError>;

/// One page of a cursor scan. A `cursor` of `0` means the scan is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// Ordered-set and key/value primitives required from the backing store.
///
/// Batch methods are pipelines: many independent single-key operations in
/// one round trip, without atomicity across them. The outer error reports a
/// failed round trip; per-key failures come back as [`Reply`] values.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Inserts `member` or overwrites its score.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError>;

    /// 0-based position of `member` in descending order, `None` if absent.
    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<u64>, CacheError>;

    /// Position and score of `member`, read in one atomic round trip.
    async fn zrevrank_with_score(
        &self,
        key: &str,
        member: &str,
    ) -> Result<Option<(u64, f64)>, CacheError>;

    /// Members at descending positions `start..=stop` with their scores.
    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, CacheError>;

    /// One page of a cursor scan over keys matching the glob `pattern`,
    /// optionally restricted to one value type.
    ///
    /// A key present for the whole scan is returned at least once, even when
    /// other keys are created or change type between pages.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        type_filter: Option<&str>,
    ) -> Result<ScanPage, CacheError>;

    /// `zrevrank(key, member)` for every key, pipelined; results follow the
    /// order of `keys`.
    async fn zrevrank_pipelined(
        &self,
        keys: &[String],
        member: &str,
    ) -> Result<Vec<Reply<Option<u64>>>, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Pipelined gets; the result has the length and order of `keys`.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Reply<Option<String>>>, CacheError>;

    /// Pipelined sets.
    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError>;

    /// Returns the backend name for logging.
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to the process-wide store client.
pub type DynStoreClient = Arc<dyn StoreClient>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(leaderboard_key(12), "leaderboard:12");
        assert_eq!(name_key(EntityKind::User, 7), "user:7");
        assert_eq!(name_key(EntityKind::Game, 7), "game:7");
    }

    #[test]
    fn test_parse_leaderboard_key() {
        assert_eq!(parse_leaderboard_key("leaderboard:42"), Some(42));
        assert_eq!(parse_leaderboard_key("leaderboard:abc"), None);
        assert_eq!(parse_leaderboard_key("user:42"), None);
    }
}
