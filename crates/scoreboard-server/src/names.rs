//! Id → display name cache for users and games.

use scoreboard_storage::{EntityKind, NamedRecord};

use crate::error::CacheError;
use crate::metrics;
use crate::retry::RetryPolicy;
use crate::store::{DynStoreClient, name_key};

/// Cache-aside name cache. Entries never expire.
#[derive(Clone)]
pub struct NameCache {
    client: DynStoreClient,
    retry: RetryPolicy,
}

impl NameCache {
    pub fn new(client: DynStoreClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Cached name, or `None` on a miss.
    pub async fn get(&self, kind: EntityKind, id: i64) -> Result<Option<String>, CacheError> {
        let name = self.client.get(&name_key(kind, id)).await?;
        match name {
            Some(_) => metrics::record_name_hits(kind, 1),
            None => {
                tracing::debug!(kind = %kind, id, "name cache miss");
                metrics::record_name_misses(kind, 1);
            }
        }
        Ok(name)
    }

    /// Writes one name through the retry policy. A failure after the last
    /// attempt is returned to the caller.
    pub async fn set_with_retry(
        &self,
        kind: EntityKind,
        id: i64,
        name: &str,
    ) -> Result<(), CacheError> {
        let key = name_key(kind, id);
        self.retry
            .execute("name_cache_set", || self.client.set(&key, name))
            .await
    }

    /// Pipelined read of many names; the result lines up with `ids`.
    ///
    /// A key whose own reply is an error counts as a miss; only a failed
    /// round trip fails the whole batch.
    pub async fn batch_get(
        &self,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<Option<String>>, CacheError> {
        let keys: Vec<String> = ids.iter().map(|&id| name_key(kind, id)).collect();
        let replies = self.client.get_many(&keys).await?;
        let names: Vec<Option<String>> = replies
            .into_iter()
            .zip(&keys)
            .map(|(reply, key)| {
                reply.unwrap_or_else(|e| {
                    tracing::warn!(key = %key, error = %e, "unreadable name cache entry");
                    None
                })
            })
            .collect();

        let hits = names.iter().filter(|name| name.is_some()).count();
        metrics::record_name_hits(kind, hits);
        metrics::record_name_misses(kind, names.len() - hits);
        Ok(names)
    }

    /// Pipelined write of many names, attempted once.
    pub async fn batch_set(
        &self,
        kind: EntityKind,
        records: &[NamedRecord],
    ) -> Result<(), CacheError> {
        let entries: Vec<(String, String)> = records
            .iter()
            .map(|record| (name_key(kind, record.id), record.name.clone()))
            .collect();
        self.client.set_many(&entries).await
    }
}
