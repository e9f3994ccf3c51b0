//! Record types for the durable store contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Identifier of a registered user (participant).
pub type UserId = i64;

/// Identifier of a game (competition).
pub type GameId = i64;

/// The kinds of entity that carry a display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Game,
}

impl EntityKind {
    /// Stable lowercase label, used for cache key prefixes and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Game => "game",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The id → display name projection of a user or game record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecord {
    pub id: i64,
    pub name: String,
}

impl NamedRecord {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A user as stored in the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub country: String,
    pub is_active: bool,
    pub is_admin: bool,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub date_added: OffsetDateTime,
}

impl UserRecord {
    #[must_use]
    pub fn named(&self) -> NamedRecord {
        NamedRecord::new(self.id, self.username.clone())
    }
}

/// Input for registering a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub country: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// A game as stored in the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_added: OffsetDateTime,
}

impl GameRecord {
    #[must_use]
    pub fn named(&self) -> NamedRecord {
        NamedRecord::new(self.id, self.name.clone())
    }
}

/// Input for recording a score submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewScore {
    pub user_id: UserId,
    pub game_id: GameId,
    pub score: f64,
}

/// One historical score submission. The durable store keeps every
/// submission; only the ranking store applies last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: i64,
    pub user_id: UserId,
    pub game_id: GameId,
    pub score: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_added: OffsetDateTime,
}
