//! Redis-backed store client.

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::aio::ConnectionLike;
use redis::{AsyncCommands, FromRedisValue, Pipeline, RedisError, Value};

use super::{Reply, ScanPage, StoreClient};
use crate::error::CacheError;

/// Store client on a `deadpool-redis` connection pool.
///
/// Every call checks a connection out of the pool; a pool that cannot hand
/// one out within its wait timeout surfaces as [`CacheError::Unavailable`].
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Connection, CacheError> {
        Ok(self.pool.get().await?)
    }

    /// Sends a non-atomic pipeline of `count` commands and decodes every
    /// reply on its own, so one error reply does not discard the others.
    async fn query_each<T: FromRedisValue>(
        &self,
        pipe: &Pipeline,
        count: usize,
    ) -> Result<Vec<Reply<T>>, CacheError> {
        let mut conn = self.conn().await?;
        let replies = conn.req_packed_commands(pipe, 0, count).await?;
        if replies.len() != count {
            return Err(CacheError::command(format!(
                "expected {count} pipeline replies, got {}",
                replies.len()
            )));
        }
        Ok(replies.into_iter().map(decode_reply).collect())
    }
}

fn decode_reply<T: FromRedisValue>(reply: Value) -> Reply<T> {
    match reply {
        Value::ServerError(err) => Err(RedisError::from(err).into()),
        value => Ok(redis::from_owned_redis_value(value)?),
    }
}

#[async_trait]
impl StoreClient for RedisStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = conn.zadd(key, member, score).await?;
        tracing::debug!(key = %key, member = %member, score, "ZADD");
        Ok(())
    }

    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<u64>, CacheError> {
        let mut conn = self.conn().await?;
        let rank: Option<u64> = conn.zrevrank(key, member).await?;
        Ok(rank)
    }

    async fn zrevrank_with_score(
        &self,
        key: &str,
        member: &str,
    ) -> Result<Option<(u64, f64)>, CacheError> {
        let mut conn = self.conn().await?;
        let (rank, score): (Option<u64>, Option<f64>) = redis::pipe()
            .atomic()
            .zrevrank(key, member)
            .zscore(key, member)
            .query_async(&mut conn)
            .await?;
        Ok(rank.zip(score))
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, CacheError> {
        let mut conn = self.conn().await?;
        let entries: Vec<(String, f64)> = conn.zrevrange_withscores(key, start, stop).await?;
        Ok(entries)
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        type_filter: Option<&str>,
    ) -> Result<ScanPage, CacheError> {
        let mut conn = self.conn().await?;
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);
        if let Some(value_type) = type_filter {
            cmd.arg("TYPE").arg(value_type);
        }
        let (cursor, keys): (u64, Vec<String>) = cmd.query_async(&mut conn).await?;
        Ok(ScanPage { cursor, keys })
    }

    async fn zrevrank_pipelined(
        &self,
        keys: &[String],
        member: &str,
    ) -> Result<Vec<Reply<Option<u64>>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.zrevrank(key, member);
        }
        self.query_each(&pipe, keys.len()).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let _: () = conn.set(key, value).await?;
        tracing::debug!(key = %key, "SET");
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Reply<Option<String>>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(key);
        }
        self.query_each(&pipe, keys.len()).await
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            pipe.set(key, value).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        tracing::debug!(count = entries.len(), "pipelined SET");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
