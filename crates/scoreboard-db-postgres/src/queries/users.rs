//! Queries against the `users` table.

use chrono::{DateTime, Utc};
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use scoreboard_storage::{EntityKind, NamedRecord, NewUser, StorageResult, UserId, UserRecord};

use super::chrono_to_time;
use crate::error::map_sqlx_error;

type UserRow = (i64, String, String, String, bool, bool, DateTime<Utc>);

const USER_COLUMNS: &str = "id, username, email, country, is_active, is_admin, date_added";

fn from_row(row: UserRow) -> UserRecord {
    let (id, username, email, country, is_active, is_admin, date_added) = row;
    UserRecord {
        id,
        username,
        email,
        country,
        is_active,
        is_admin,
        date_added: chrono_to_time(date_added),
    }
}

/// Inserts a user and returns the stored record.
pub async fn create(pool: &PgPool, user: &NewUser) -> StorageResult<UserRecord> {
    let sql = format!(
        "INSERT INTO users (username, email, country, is_admin)
         VALUES ($1, $2, $3, $4)
         RETURNING {USER_COLUMNS}"
    );

    let row: UserRow = query_as(&sql)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.country)
        .bind(user.is_admin)
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error(e, EntityKind::User, "Failed to create user"))?;

    Ok(from_row(row))
}

/// Reads one username.
pub async fn name_by_id(pool: &PgPool, id: UserId) -> StorageResult<Option<NamedRecord>> {
    let row: Option<(i64, String)> = query_as("SELECT id, username FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_sqlx_error(e, EntityKind::User, "Failed to read user"))?;

    Ok(row.map(|(id, name)| NamedRecord { id, name }))
}

/// Reads many usernames with a single `= ANY($1)` query.
pub async fn names_by_ids(pool: &PgPool, ids: &[UserId]) -> StorageResult<Vec<NamedRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<(i64, String)> =
        query_as("SELECT id, username FROM users WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(pool)
            .await
            .map_err(|e| map_sqlx_error(e, EntityKind::User, "Failed to read users"))?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| NamedRecord { id, name })
        .collect())
}

/// Reads full profiles for many users.
pub async fn profiles_by_ids(pool: &PgPool, ids: &[UserId]) -> StorageResult<Vec<UserRecord>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
    let rows: Vec<UserRow> = query_as(&sql)
        .bind(ids.to_vec())
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error(e, EntityKind::User, "Failed to read user profiles"))?;

    Ok(rows.into_iter().map(from_row).collect())
}
