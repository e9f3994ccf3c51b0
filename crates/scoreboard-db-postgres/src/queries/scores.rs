//! Queries against the `scores` history table.

use chrono::{DateTime, Utc};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use scoreboard_storage::{EntityKind, NewScore, ScoreRecord, StorageResult};

use super::chrono_to_time;
use crate::error::map_sqlx_error;

/// Appends one score submission.
///
/// An unknown user or game surfaces as `StorageError::InvalidInput` through
/// the foreign key constraints.
pub async fn insert(pool: &PgPool, score: &NewScore) -> StorageResult<ScoreRecord> {
    let row: (i64, i64, i64, f64, DateTime<Utc>) = query_as(
        "INSERT INTO scores (user_id, game_id, score)
         VALUES ($1, $2, $3)
         RETURNING id, user_id, game_id, score, date_added",
    )
    .bind(score.user_id)
    .bind(score.game_id)
    .bind(score.score)
    .fetch_one(pool)
    .await
    .map_err(|e| map_sqlx_error(e, EntityKind::Game, "Failed to insert score"))?;

    let (id, user_id, game_id, score, date_added) = row;
    Ok(ScoreRecord {
        id,
        user_id,
        game_id,
        score,
        date_added: chrono_to_time(date_added),
    })
}
