//! Test doubles for the store client and the durable store.

use async_trait::async_trait;
use dashmap::DashMap;
use scoreboard_storage::{
    EntityKind, GameRecord, LeaderboardStorage, NamedRecord, NewScore, NewUser, ScoreRecord,
    StorageError, UserId, UserRecord,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicUsize, Ordering};
use time::OffsetDateTime;

use crate::error::CacheError;
use crate::store::{LocalStore, Reply, ScanPage, StoreClient};

/// `LocalStore` with switchable failures and call counters.
#[derive(Default)]
pub struct FlakyStore {
    inner: LocalStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_next_writes: AtomicU32,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fails the next `n` writes, then lets writes through.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_next_writes.store(n, Ordering::SeqCst);
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<(), CacheError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::unavailable("injected read failure"));
        }
        Ok(())
    }

    fn write(&self) -> Result<(), CacheError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if self.fail_writes.load(Ordering::SeqCst) || pending.is_ok() {
            return Err(CacheError::unavailable("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for FlakyStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
        self.write()?;
        self.inner.zadd(key, member, score).await
    }

    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<u64>, CacheError> {
        self.read()?;
        self.inner.zrevrank(key, member).await
    }

    async fn zrevrank_with_score(
        &self,
        key: &str,
        member: &str,
    ) -> Result<Option<(u64, f64)>, CacheError> {
        self.read()?;
        self.inner.zrevrank_with_score(key, member).await
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, CacheError> {
        self.read()?;
        self.inner.zrevrange_with_scores(key, start, stop).await
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        type_filter: Option<&str>,
    ) -> Result<ScanPage, CacheError> {
        self.read()?;
        self.inner.scan(cursor, pattern, count, type_filter).await
    }

    async fn zrevrank_pipelined(
        &self,
        keys: &[String],
        member: &str,
    ) -> Result<Vec<Reply<Option<u64>>>, CacheError> {
        self.read()?;
        self.inner.zrevrank_pipelined(keys, member).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.read()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.write()?;
        self.inner.set(key, value).await
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Reply<Option<String>>>, CacheError> {
        self.read()?;
        self.inner.get_many(keys).await
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        self.write()?;
        self.inner.set_many(entries).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

/// Durable store in memory, recording the lookups made against it.
#[derive(Default)]
pub struct InMemoryStorage {
    users: DashMap<UserId, UserRecord>,
    games: DashMap<i64, GameRecord>,
    scores: Mutex<Vec<ScoreRecord>>,
    next_id: AtomicI64,
    fail_queries: AtomicBool,
    get_by_id_calls: AtomicUsize,
    get_many_calls: Mutex<Vec<Vec<i64>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user or game with the given id.
    pub fn insert_name(&self, kind: EntityKind, id: i64, name: &str) {
        let now = OffsetDateTime::now_utc();
        match kind {
            EntityKind::User => {
                self.users.insert(
                    id,
                    UserRecord {
                        id,
                        username: name.to_string(),
                        email: format!("{name}@example.com"),
                        country: "NZ".to_string(),
                        is_active: true,
                        is_admin: false,
                        date_added: now,
                    },
                );
            }
            EntityKind::Game => {
                self.games.insert(
                    id,
                    GameRecord {
                        id,
                        name: name.to_string(),
                        date_added: now,
                    },
                );
            }
        }
        self.next_id.fetch_max(id, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }

    /// Id lists passed to each `get_many_by_ids` call, in call order.
    pub fn get_many_calls(&self) -> Vec<Vec<i64>> {
        self.get_many_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn scores(&self) -> Vec<ScoreRecord> {
        self.scores
            .lock()
            .map(|scores| scores.clone())
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("injected durable failure"));
        }
        Ok(())
    }

    fn name_of(&self, kind: EntityKind, id: i64) -> Option<NamedRecord> {
        match kind {
            EntityKind::User => self.users.get(&id).map(|user| user.named()),
            EntityKind::Game => self.games.get(&id).map(|game| game.named()),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl LeaderboardStorage for InMemoryStorage {
    async fn get_by_id(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<NamedRecord>, StorageError> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.name_of(kind, id))
    }

    async fn get_many_by_ids(
        &self,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<NamedRecord>, StorageError> {
        if let Ok(mut calls) = self.get_many_calls.lock() {
            calls.push(ids.to_vec());
        }
        self.check()?;
        Ok(ids.iter().filter_map(|&id| self.name_of(kind, id)).collect())
    }

    async fn create_user(&self, user: &NewUser) -> Result<UserRecord, StorageError> {
        self.check()?;
        let taken = self
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(StorageError::already_exists(
                EntityKind::User,
                "username or email",
            ));
        }
        let record = UserRecord {
            id: self.allocate_id(),
            username: user.username.clone(),
            email: user.email.clone(),
            country: user.country.clone(),
            is_active: true,
            is_admin: user.is_admin,
            date_added: OffsetDateTime::now_utc(),
        };
        self.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_game(&self, name: &str) -> Result<GameRecord, StorageError> {
        self.check()?;
        if self.games.iter().any(|g| g.name == name) {
            return Err(StorageError::already_exists(EntityKind::Game, "name"));
        }
        let record = GameRecord {
            id: self.allocate_id(),
            name: name.to_string(),
            date_added: OffsetDateTime::now_utc(),
        };
        self.games.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_games(&self) -> Result<Vec<GameRecord>, StorageError> {
        self.check()?;
        let mut games: Vec<GameRecord> = self.games.iter().map(|g| g.clone()).collect();
        games.sort_by_key(|game| game.id);
        Ok(games)
    }

    async fn insert_score(&self, score: &NewScore) -> Result<ScoreRecord, StorageError> {
        self.check()?;
        if !self.users.contains_key(&score.user_id) || !self.games.contains_key(&score.game_id) {
            return Err(StorageError::invalid_input("unknown user or game"));
        }
        let record = ScoreRecord {
            id: self.allocate_id(),
            user_id: score.user_id,
            game_id: score.game_id,
            score: score.score,
            date_added: OffsetDateTime::now_utc(),
        };
        self.scores
            .lock()
            .map_err(|_| StorageError::internal("score log poisoned"))?
            .push(record.clone());
        Ok(record)
    }

    async fn get_users(&self, ids: &[UserId]) -> Result<Vec<UserRecord>, StorageError> {
        self.check()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|user| user.clone()))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
