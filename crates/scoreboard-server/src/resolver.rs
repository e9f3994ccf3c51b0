//! Bulk id → name resolution with durable fallback and cache back-fill.

use scoreboard_storage::{DynStorage, EntityKind, NamedRecord};
use std::collections::{HashMap, HashSet};

use crate::error::LeaderboardError;
use crate::metrics;
use crate::names::NameCache;

/// Resolves many ids in one cache round trip and at most one durable query.
#[derive(Clone)]
pub struct BatchResolver {
    names: NameCache,
    storage: DynStorage,
}

impl BatchResolver {
    pub fn new(names: NameCache, storage: DynStorage) -> Self {
        Self { names, storage }
    }

    /// Names for `ids`, position for position.
    ///
    /// Ids unknown to both the cache and the durable store come back as
    /// their decimal string. Cache failures degrade to durable reads; only a
    /// durable failure is returned as an error.
    pub async fn resolve(
        &self,
        kind: EntityKind,
        ids: &[i64],
    ) -> Result<Vec<String>, LeaderboardError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cached = match self.names.batch_get(kind, ids).await {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(kind = %kind, count = ids.len(), error = %err, "batch cache read failed, treating all as misses");
                metrics::record_name_misses(kind, ids.len());
                vec![None; ids.len()]
            }
        };

        let mut seen = HashSet::new();
        let missing: Vec<i64> = ids
            .iter()
            .zip(&cached)
            .filter(|(_, name)| name.is_none())
            .map(|(&id, _)| id)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut resolved: HashMap<i64, String> = HashMap::new();
        if !missing.is_empty() {
            metrics::record_durable_fallback(kind);
            let records = self.storage.get_many_by_ids(kind, &missing).await?;
            tracing::debug!(
                kind = %kind,
                missing = missing.len(),
                found = records.len(),
                "resolved cache misses from durable store"
            );
            self.backfill(kind, &records).await;
            resolved.extend(records.into_iter().map(|record| (record.id, record.name)));
        }

        Ok(ids
            .iter()
            .zip(cached)
            .map(|(id, name)| {
                name.or_else(|| resolved.get(id).cloned())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect())
    }

    async fn backfill(&self, kind: EntityKind, records: &[NamedRecord]) {
        if records.is_empty() {
            return;
        }
        if let Err(err) = self.names.batch_set(kind, records).await {
            tracing::warn!(kind = %kind, count = records.len(), error = %err, "name cache back-fill failed");
        }
    }
}
