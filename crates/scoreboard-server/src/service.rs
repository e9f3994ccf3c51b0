//! Leaderboard operations composed from the ranking store, the name cache
//! and the durable store.

use futures_util::future::try_join;
use scoreboard_storage::{
    DynStorage, EntityKind, GameId, GameRecord, NewScore, NewUser, ScoreRecord, UserId,
    UserRecord,
};
use serde::Serialize;
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::error::LeaderboardError;
use crate::names::NameCache;
use crate::ranking::{RankLookup, RankingStore};
use crate::reconcile::ReconciliationReader;
use crate::resolver::BatchResolver;
use crate::retry::RetryPolicy;
use crate::store::DynStoreClient;

/// One row of a game's leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: u64,
    pub user_id: UserId,
    pub username: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub game_id: GameId,
    pub game: String,
    pub entries: Vec<LeaderboardRow>,
}

/// A user's standing in one game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRanking {
    pub game_id: GameId,
    pub game: String,
    pub rank: u64,
    pub score: f64,
}

/// A user's rank in one of the games they play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRank {
    pub game_id: GameId,
    pub game: String,
    pub rank: u64,
}

/// Top-player report row, joined with the durable profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPlayer {
    pub rank: u64,
    pub user_id: UserId,
    pub username: String,
    pub country: String,
    pub score: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

/// Entry point for callers of the ranking core.
///
/// Writes go to the durable store first and then to the cache side; the two
/// are not coordinated, so a failure in between leaves them out of step
/// until the next read-through repairs the names. Ranking sets are never
/// repaired from the durable store.
#[derive(Clone)]
pub struct LeaderboardService {
    storage: DynStorage,
    ranking: RankingStore,
    names: NameCache,
    reader: ReconciliationReader,
    resolver: BatchResolver,
}

impl LeaderboardService {
    pub fn new(
        client: DynStoreClient,
        storage: DynStorage,
        retry: RetryPolicy,
        scan_page_size: usize,
    ) -> Self {
        let names = NameCache::new(client.clone(), retry);
        Self {
            ranking: RankingStore::new(client, retry, scan_page_size),
            reader: ReconciliationReader::new(names.clone(), storage.clone()),
            resolver: BatchResolver::new(names.clone(), storage.clone()),
            names,
            storage,
        }
    }

    pub fn from_config(client: DynStoreClient, storage: DynStorage, config: &AppConfig) -> Self {
        Self::new(
            client,
            storage,
            RetryPolicy::from_config(&config.retry),
            config.ranking.scan_page_size,
        )
    }

    pub fn ranking(&self) -> &RankingStore {
        &self.ranking
    }

    pub fn names(&self) -> &NameCache {
        &self.names
    }

    /// Registers a user and caches their name.
    pub async fn register_user(&self, user: &NewUser) -> Result<UserRecord, LeaderboardError> {
        let record = self.storage.create_user(user).await?;
        self.names
            .set_with_retry(EntityKind::User, record.id, &record.username)
            .await?;
        tracing::info!(user_id = record.id, username = %record.username, "user registered");
        Ok(record)
    }

    /// Creates a game and caches its name.
    pub async fn create_game(&self, name: &str) -> Result<GameRecord, LeaderboardError> {
        let record = self.storage.create_game(name).await?;
        self.names
            .set_with_retry(EntityKind::Game, record.id, &record.name)
            .await?;
        tracing::info!(game_id = record.id, name = %record.name, "game created");
        Ok(record)
    }

    pub async fn list_games(&self) -> Result<Vec<GameRecord>, LeaderboardError> {
        Ok(self.storage.list_games().await?)
    }

    /// Records a score in the history, then makes it the user's live score.
    pub async fn submit_score(
        &self,
        user_id: UserId,
        game_id: GameId,
        score: f64,
    ) -> Result<ScoreRecord, LeaderboardError> {
        let record = self
            .storage
            .insert_score(&NewScore {
                user_id,
                game_id,
                score,
            })
            .await?;
        self.ranking.submit_score(game_id, user_id, score).await?;
        Ok(record)
    }

    /// Leaderboard rows at 0-based positions `start..=end`.
    pub async fn leaderboard(
        &self,
        game_id: GameId,
        start: usize,
        end: usize,
    ) -> Result<Leaderboard, LeaderboardError> {
        if start > end {
            return Err(LeaderboardError::InvalidRange { start, end });
        }

        let (entries, game) = try_join(
            async {
                self.ranking
                    .get_range(game_id, start, end)
                    .await
                    .map_err(LeaderboardError::from)
            },
            self.game_name(game_id),
        )
        .await?;

        let user_ids: Vec<UserId> = entries.iter().map(|entry| entry.user_id).collect();
        let usernames = self.resolver.resolve(EntityKind::User, &user_ids).await?;

        let entries = entries
            .into_iter()
            .zip(usernames)
            .map(|(entry, username)| LeaderboardRow {
                rank: entry.rank,
                user_id: entry.user_id,
                username,
                score: entry.score,
            })
            .collect();

        Ok(Leaderboard {
            game_id,
            game,
            entries,
        })
    }

    /// The user's rank and score in one game, `None` if they have no score.
    pub async fn user_ranking(
        &self,
        user_id: UserId,
        game_id: GameId,
    ) -> Result<Option<UserRanking>, LeaderboardError> {
        let RankLookup::Found { rank, score } = self.ranking.get_rank(game_id, user_id).await?
        else {
            return Ok(None);
        };
        let game = self.game_name(game_id).await?;
        Ok(Some(UserRanking {
            game_id,
            game,
            rank,
            score,
        }))
    }

    /// The user's rank in every game they have a score in.
    ///
    /// `None` when no game has a ranking yet.
    pub async fn user_rankings(
        &self,
        user_id: UserId,
    ) -> Result<Option<Vec<GameRank>>, LeaderboardError> {
        let Some(ranks) = self.ranking.rank_across_all_competitions(user_id).await? else {
            return Ok(None);
        };

        let game_ids: Vec<GameId> = ranks.keys().copied().collect();
        let games = self.resolver.resolve(EntityKind::Game, &game_ids).await?;

        Ok(Some(
            ranks
                .into_iter()
                .zip(games)
                .map(|((game_id, rank), game)| GameRank {
                    game_id,
                    game,
                    rank,
                })
                .collect(),
        ))
    }

    /// The best `limit` players of a game with their profiles.
    pub async fn top_players(
        &self,
        game_id: GameId,
        limit: usize,
    ) -> Result<Vec<TopPlayer>, LeaderboardError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let entries = self.ranking.get_range(game_id, 0, limit - 1).await?;
        let user_ids: Vec<UserId> = entries.iter().map(|entry| entry.user_id).collect();
        let profiles: HashMap<UserId, UserRecord> = self
            .storage
            .get_users(&user_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                let Some(profile) = profiles.get(&entry.user_id) else {
                    tracing::warn!(game_id, user_id = entry.user_id, "ranked user has no durable record");
                    return None;
                };
                Some(TopPlayer {
                    rank: entry.rank,
                    user_id: entry.user_id,
                    username: profile.username.clone(),
                    country: profile.country.clone(),
                    score: entry.score,
                    date_joined: profile.date_added,
                })
            })
            .collect())
    }

    pub async fn game_name(&self, game_id: GameId) -> Result<String, LeaderboardError> {
        self.reader.name(EntityKind::Game, game_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, StoreClient, leaderboard_key};
    use crate::testing::{FlakyStore, InMemoryStorage};
    use scoreboard_storage::StorageError;
    use std::sync::Arc;
    use std::time::Duration;

    fn service_with(
        client: DynStoreClient,
        storage: Arc<InMemoryStorage>,
    ) -> LeaderboardService {
        LeaderboardService::new(
            client,
            storage,
            RetryPolicy::new(3, Duration::from_millis(10)),
            100,
        )
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            country: "NZ".to_string(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn test_register_and_create_populate_name_cache() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage.clone());

        let user = service.register_user(&new_user("alice")).await.expect("user");
        let game = service.create_game("chess").await.expect("game");

        assert_eq!(
            service.names().get(EntityKind::User, user.id).await.expect("get"),
            Some("alice".to_string())
        );
        assert_eq!(service.game_name(game.id).await.expect("name"), "chess");
        assert_eq!(storage.get_by_id_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_game_is_storage_error() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage);

        service.create_game("chess").await.expect("game");
        let err = service.create_game("chess").await.expect_err("duplicate");
        assert!(matches!(
            err,
            LeaderboardError::Storage(StorageError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_and_names() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage.clone());

        let game = service.create_game("chess").await.expect("game");
        let alice = service.register_user(&new_user("alice")).await.expect("user");
        let bob = service.register_user(&new_user("bob")).await.expect("user");
        let carol = service.register_user(&new_user("carol")).await.expect("user");

        service.submit_score(alice.id, game.id, 50.0).await.expect("score");
        service.submit_score(bob.id, game.id, 80.0).await.expect("score");
        service.submit_score(carol.id, game.id, 65.0).await.expect("score");
        assert_eq!(storage.scores().len(), 3);

        let board = service.leaderboard(game.id, 0, 9).await.expect("board");
        assert_eq!(board.game, "chess");
        let rows: Vec<_> = board
            .entries
            .iter()
            .map(|row| (row.rank, row.username.as_str(), row.score))
            .collect();
        assert_eq!(
            rows,
            vec![(1, "bob", 80.0), (2, "carol", 65.0), (3, "alice", 50.0)]
        );

        let window = service.leaderboard(game.id, 1, 1).await.expect("board");
        assert_eq!(window.entries.len(), 1);
        assert_eq!(window.entries[0].rank, 2);
        assert_eq!(window.entries[0].username, "carol");
    }

    #[tokio::test]
    async fn test_leaderboard_ranks_survive_foreign_members() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = Arc::new(LocalStore::new());
        let service = service_with(store.clone(), storage);

        let game = service.create_game("chess").await.expect("game");
        let alice = service.register_user(&new_user("alice")).await.expect("user");
        let bob = service.register_user(&new_user("bob")).await.expect("user");
        service.submit_score(alice.id, game.id, 90.0).await.expect("score");
        service.submit_score(bob.id, game.id, 10.0).await.expect("score");
        // Written by some other client; sits between alice and bob.
        store
            .zadd(&leaderboard_key(game.id), "guest", 50.0)
            .await
            .expect("zadd");

        let board = service.leaderboard(game.id, 0, 9).await.expect("board");
        let rows: Vec<_> = board
            .entries
            .iter()
            .map(|row| (row.rank, row.username.as_str()))
            .collect();
        assert_eq!(rows, vec![(1, "alice"), (3, "bob")]);
        assert_eq!(
            service
                .user_ranking(bob.id, game.id)
                .await
                .expect("rank")
                .expect("ranked")
                .rank,
            3
        );

        let top = service.top_players(game.id, 3).await.expect("top");
        let ranks: Vec<_> = top.iter().map(|player| player.rank).collect();
        assert_eq!(ranks, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_inverted_window() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage);

        let err = service.leaderboard(1, 5, 2).await.expect_err("invalid");
        assert!(matches!(err, LeaderboardError::InvalidRange { start: 5, end: 2 }));
    }

    #[tokio::test]
    async fn test_leaderboard_for_unknown_game_is_not_found() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage);

        let err = service.leaderboard(42, 0, 9).await.expect_err("unknown game");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_user_ranking_and_rankings() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage);

        let user = service.register_user(&new_user("alice")).await.expect("user");
        assert_eq!(service.user_rankings(user.id).await.expect("ranks"), None);

        let chess = service.create_game("chess").await.expect("game");
        let go = service.create_game("go").await.expect("game");
        let other = service.register_user(&new_user("bob")).await.expect("user");

        assert_eq!(service.user_ranking(user.id, chess.id).await.expect("rank"), None);

        service.submit_score(user.id, chess.id, 10.0).await.expect("score");
        service.submit_score(other.id, chess.id, 20.0).await.expect("score");
        service.submit_score(other.id, go.id, 5.0).await.expect("score");

        let ranking = service
            .user_ranking(user.id, chess.id)
            .await
            .expect("rank")
            .expect("ranked");
        assert_eq!(ranking.rank, 2);
        assert_eq!(ranking.score, 10.0);
        assert_eq!(ranking.game, "chess");

        let ranks = service
            .user_rankings(user.id)
            .await
            .expect("ranks")
            .expect("games exist");
        assert_eq!(
            ranks,
            vec![GameRank {
                game_id: chess.id,
                game: "chess".to_string(),
                rank: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_top_players_skips_users_without_profile() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = service_with(Arc::new(LocalStore::new()), storage);

        let game = service.create_game("chess").await.expect("game");
        let alice = service.register_user(&new_user("alice")).await.expect("user");
        service.submit_score(alice.id, game.id, 10.0).await.expect("score");
        // A ranking entry with no durable user behind it.
        service.ranking().submit_score(game.id, 999, 50.0).await.expect("ranking");

        let top = service.top_players(game.id, 10).await.expect("top");
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].username, "alice");
        assert_eq!(top[0].rank, 2);
        assert_eq!(top[0].country, "NZ");

        assert!(service.top_players(game.id, 0).await.expect("top").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_fails_when_cache_write_exhausts_retries() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = Arc::new(FlakyStore::new());
        store.fail_writes(true);
        let service = service_with(store.clone(), storage);

        let err = service
            .register_user(&new_user("alice"))
            .await
            .expect_err("cache write is fatal");
        assert!(matches!(err, LeaderboardError::Cache(_)));
        assert_eq!(store.write_calls(), 3);
    }

    #[tokio::test]
    async fn test_submit_for_unknown_user_never_reaches_ranking() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = Arc::new(FlakyStore::new());
        let service = service_with(store.clone(), storage);

        let game = service.create_game("chess").await.expect("game");
        let writes_before = store.write_calls();
        let err = service
            .submit_score(12345, game.id, 1.0)
            .await
            .expect_err("unknown user");
        assert!(matches!(err, LeaderboardError::Storage(_)));
        assert_eq!(store.write_calls(), writes_before);
    }
}
