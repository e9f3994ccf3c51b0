//! Read-through lookups that repair the cache from the durable store.
//!
//! ```text
//! cache get ─ hit ──────────────────────────────► value
//!     │
//!     └ miss or error ─► durable get ─ found ─► repair (logged on failure) ─► value
//!                                   └ none ──► NotFound
//! ```

use scoreboard_storage::{DynStorage, EntityKind, StorageError};
use std::future::Future;

use crate::error::{CacheError, LeaderboardError};
use crate::metrics;
use crate::names::NameCache;

/// Runs one read-through lookup.
///
/// A cache miss and a cache error take the same durable path; only durable
/// failures reach the caller. `durable_get` is not polled on a hit.
pub async fn read_through<T, C, D, R, RF>(
    kind: EntityKind,
    id: i64,
    cache_get: C,
    durable_get: D,
    repair: R,
) -> Result<T, LeaderboardError>
where
    T: Clone,
    C: Future<Output = Result<Option<T>, CacheError>>,
    D: Future<Output = Result<Option<T>, StorageError>>,
    R: FnOnce(T) -> RF,
    RF: Future<Output = Result<(), CacheError>>,
{
    match cache_get.await {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(err) => {
            tracing::warn!(kind = %kind, id, error = %err, "cache read failed, reading durable store");
            metrics::record_name_misses(kind, 1);
        }
    }

    metrics::record_durable_fallback(kind);
    let value = durable_get
        .await?
        .ok_or_else(|| LeaderboardError::not_found(kind, id))?;

    if let Err(err) = repair(value.clone()).await {
        tracing::warn!(kind = %kind, id, error = %err, "cache repair failed");
    }
    Ok(value)
}

/// Single-name lookups backed by the name cache.
#[derive(Clone)]
pub struct ReconciliationReader {
    names: NameCache,
    storage: DynStorage,
}

impl ReconciliationReader {
    pub fn new(names: NameCache, storage: DynStorage) -> Self {
        Self { names, storage }
    }

    /// Display name of one user or game.
    pub async fn name(&self, kind: EntityKind, id: i64) -> Result<String, LeaderboardError> {
        read_through(
            kind,
            id,
            self.names.get(kind, id),
            async {
                self.storage
                    .get_by_id(kind, id)
                    .await
                    .map(|record| record.map(|record| record.name))
            },
            |name: String| async move { self.names.set_with_retry(kind, id, &name).await },
        )
        .await
    }
}
