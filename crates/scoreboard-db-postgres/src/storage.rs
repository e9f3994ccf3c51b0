//! PostgreSQL implementation of the LeaderboardStorage trait.

use async_trait::async_trait;
use sqlx_postgres::PgPool;

use scoreboard_storage::{
    EntityKind, GameRecord, LeaderboardStorage, NamedRecord, NewScore, NewUser, ScoreRecord,
    StorageError, UserId, UserRecord,
};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries::{games, scores, users};

/// PostgreSQL durable store for users, games and score history.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a new `PostgresStorage` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl LeaderboardStorage for PostgresStorage {
    async fn get_by_id(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<NamedRecord>, StorageError> {
        match kind {
            EntityKind::User => users::name_by_id(&self.pool, id).await,
            EntityKind::Game => games::name_by_id(&self.pool, id).await,
        }
    }

    async fn get_many_by_ids(
        &self,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<NamedRecord>, StorageError> {
        match kind {
            EntityKind::User => users::names_by_ids(&self.pool, ids).await,
            EntityKind::Game => games::names_by_ids(&self.pool, ids).await,
        }
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StorageError> {
        users::create(&self.pool, user).await
    }

    async fn create_game(&self, name: &str) -> Result<GameRecord, StorageError> {
        games::create(&self.pool, name).await
    }

    async fn list_games(&self) -> Result<Vec<GameRecord>, StorageError> {
        games::list(&self.pool).await
    }

    async fn insert_score(&self, score: &NewScore) -> Result<ScoreRecord, StorageError> {
        scores::insert(&self.pool, score).await
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError> {
        users::profiles_by_ids(&self.pool, ids).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
