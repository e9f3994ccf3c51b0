//! Queries against the `games` table.

use chrono::{DateTime, Utc};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use scoreboard_storage::{EntityKind, GameId, GameRecord, NamedRecord, StorageResult};

use super::chrono_to_time;
use crate::error::map_sqlx_error;

type GameRow = (i64, String, DateTime<Utc>);

fn from_row((id, name, date_added): GameRow) -> GameRecord {
    GameRecord {
        id,
        name,
        date_added: chrono_to_time(date_added),
    }
}

/// Inserts a game and returns the stored record.
pub async fn create(pool: &PgPool, name: &str) -> StorageResult<GameRecord> {
    let row: GameRow =
        query_as("INSERT INTO games (name) VALUES ($1) RETURNING id, name, date_added")
            .bind(name)
            .fetch_one(pool)
            .await
            .map_err(|e| map_sqlx_error(e, EntityKind::Game, "Failed to create game"))?;

    Ok(from_row(row))
}

/// Lists all games ordered by id.
pub async fn list(pool: &PgPool) -> StorageResult<Vec<GameRecord>> {
    let rows: Vec<GameRow> = query_as("SELECT id, name, date_added FROM games ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error(e, EntityKind::Game, "Failed to list games"))?;

    Ok(rows.into_iter().map(from_row).collect())
}

/// Reads one game name.
pub async fn name_by_id(pool: &PgPool, id: GameId) -> StorageResult<Option<NamedRecord>> {
    let row: Option<(i64, String)> = query_as("SELECT id, name FROM games WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_sqlx_error(e, EntityKind::Game, "Failed to read game"))?;

    Ok(row.map(|(id, name)| NamedRecord { id, name }))
}

/// Reads many game names in one query.
pub async fn names_by_ids(pool: &PgPool, ids: &[GameId]) -> StorageResult<Vec<NamedRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<(i64, String)> = query_as("SELECT id, name FROM games WHERE id = ANY($1)")
        .bind(ids.to_vec())
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error(e, EntityKind::Game, "Failed to read games"))?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| NamedRecord { id, name })
        .collect())
}
