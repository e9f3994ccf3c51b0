//! Per-game rankings on the store client's sorted sets.
//!
//! Each game owns one set at `leaderboard:{game_id}`; members are user ids,
//! scores are the latest submitted score. Ranks are 1-based.

use scoreboard_storage::{GameId, UserId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::CacheError;
use crate::retry::RetryPolicy;
use crate::store::{
    DynStoreClient, LEADERBOARD_PREFIX, SORTED_SET_TYPE, leaderboard_key, parse_leaderboard_key,
};

/// Outcome of a rank lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankLookup {
    Found { rank: u64, score: f64 },
    /// The user has no score in this game.
    NotFound,
}

impl RankLookup {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// One row of a ranking window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position in the game's ranking.
    pub rank: u64,
    pub user_id: UserId,
    pub score: f64,
}

#[derive(Clone)]
pub struct RankingStore {
    client: DynStoreClient,
    retry: RetryPolicy,
    scan_page_size: usize,
}

impl RankingStore {
    pub fn new(client: DynStoreClient, retry: RetryPolicy, scan_page_size: usize) -> Self {
        Self {
            client,
            retry,
            scan_page_size: scan_page_size.max(1),
        }
    }

    /// Sets the user's score in the game, replacing any previous one.
    pub async fn submit_score(
        &self,
        game_id: GameId,
        user_id: UserId,
        score: f64,
    ) -> Result<(), CacheError> {
        let key = leaderboard_key(game_id);
        let member = user_id.to_string();
        self.retry
            .execute("submit_score", || self.client.zadd(&key, &member, score))
            .await?;
        tracing::debug!(game_id, user_id, score, "score submitted to ranking");
        Ok(())
    }

    /// 1-based rank and current score of the user in the game.
    pub async fn get_rank(&self, game_id: GameId, user_id: UserId) -> Result<RankLookup, CacheError> {
        let found = self
            .client
            .zrevrank_with_score(&leaderboard_key(game_id), &user_id.to_string())
            .await?;
        Ok(match found {
            Some((rank, score)) => RankLookup::Found {
                rank: rank + 1,
                score,
            },
            None => RankLookup::NotFound,
        })
    }

    /// Entries at 0-based positions `start..=end`, best score first.
    ///
    /// Members that are not user ids are dropped; the rest keep the rank of
    /// their position in the set.
    pub async fn get_range(
        &self,
        game_id: GameId,
        start: usize,
        end: usize,
    ) -> Result<Vec<RankedEntry>, CacheError> {
        if start > end {
            return Ok(Vec::new());
        }
        let key = leaderboard_key(game_id);
        let to_index = |n: usize| isize::try_from(n).unwrap_or(isize::MAX);
        let members = self
            .client
            .zrevrange_with_scores(&key, to_index(start), to_index(end))
            .await?;

        Ok(members
            .into_iter()
            .zip(start as u64 + 1..)
            .filter_map(|((member, score), rank)| match member.parse::<UserId>() {
                Ok(user_id) => Some(RankedEntry {
                    rank,
                    user_id,
                    score,
                }),
                Err(_) => {
                    tracing::warn!(key = %key, member = %member, "skipping non-numeric ranking member");
                    None
                }
            })
            .collect())
    }

    /// Every game that has a ranking set, found by draining a cursor scan.
    pub async fn list_all_competition_keys(&self) -> Result<BTreeSet<GameId>, CacheError> {
        let pattern = format!("{LEADERBOARD_PREFIX}*");
        let mut games = BTreeSet::new();
        let mut cursor = 0;
        loop {
            let page = self
                .client
                .scan(cursor, &pattern, self.scan_page_size, Some(SORTED_SET_TYPE))
                .await?;
            for key in page.keys {
                match parse_leaderboard_key(&key) {
                    Some(game_id) => {
                        games.insert(game_id);
                    }
                    None => tracing::warn!(key = %key, "skipping ranking key without a game id"),
                }
            }
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(games)
    }

    /// The user's 1-based rank in every game where they have a score.
    ///
    /// Returns `None` when no game has a ranking set at all.
    pub async fn rank_across_all_competitions(
        &self,
        user_id: UserId,
    ) -> Result<Option<BTreeMap<GameId, u64>>, CacheError> {
        let games: Vec<GameId> = self.list_all_competition_keys().await?.into_iter().collect();
        if games.is_empty() {
            tracing::warn!(user_id, "no ranking sets found");
            return Ok(None);
        }

        let keys: Vec<String> = games.iter().map(|&game_id| leaderboard_key(game_id)).collect();
        let ranks = self
            .client
            .zrevrank_pipelined(&keys, &user_id.to_string())
            .await?;

        let mut by_game = BTreeMap::new();
        for (game_id, reply) in games.into_iter().zip(ranks) {
            match reply {
                Ok(Some(rank)) => {
                    by_game.insert(game_id, rank + 1);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(game_id, user_id, error = %e, "skipping unreadable ranking set");
                }
            }
        }
        Ok(Some(by_game))
    }
}
