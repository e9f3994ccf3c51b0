//! In-process store client on DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::{Reply, ScanPage, StoreClient};
use crate::error::CacheError;

const STRING_TYPE: &str = "string";

/// A member keyed for iteration in reverse rank order: score descending,
/// then member descending.
#[derive(Debug, Clone)]
struct RankedMember {
    score: f64,
    member: String,
}

impl Ord for RankedMember {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.member.as_bytes().cmp(self.member.as_bytes()))
    }
}

impl PartialOrd for RankedMember {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedMember {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedMember {}

/// One sorted set: member → score, plus the members in reverse rank order.
///
/// `order` is kept sorted, so a rank is a binary search and a range is a
/// slice. Writes shift the tail of the vector.
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, f64>,
    order: Vec<RankedMember>,
}

impl SortedSet {
    fn upsert(&mut self, member: &str, score: f64) {
        if let Some(previous) = self.scores.insert(member.to_string(), score) {
            let stale = RankedMember {
                score: previous,
                member: member.to_string(),
            };
            if let Ok(pos) = self.order.binary_search(&stale) {
                self.order.remove(pos);
            }
        }
        let entry = RankedMember {
            score,
            member: member.to_string(),
        };
        let pos = self.order.partition_point(|existing| *existing < entry);
        self.order.insert(pos, entry);
    }

    fn rev_rank(&self, member: &str) -> Option<(u64, f64)> {
        let score = *self.scores.get(member)?;
        let target = RankedMember {
            score,
            member: member.to_string(),
        };
        let rank = self.order.binary_search(&target).ok()? as u64;
        Some((rank, score))
    }

    /// Resolves Redis-style inclusive indexes (negative counts from the end).
    fn rev_range(&self, start: isize, stop: isize) -> Vec<(String, f64)> {
        let len = self.order.len() as isize;
        let start = if start < 0 { (start + len).max(0) } else { start };
        let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
        if len == 0 || start > stop || start >= len {
            return Vec::new();
        }
        self.order[start as usize..=stop as usize]
            .iter()
            .map(|entry| (entry.member.clone(), entry.score))
            .collect()
    }
}

/// Single-instance store: sorted sets and strings in DashMaps.
///
/// Orders equal scores exactly like Redis does, so rankings do not change
/// when a deployment moves between backends.
///
/// Every key gets an ordinal when it is first written. Keys are never
/// deleted, so scanning in ordinal order visits each key once no matter how
/// the keyspace changes between pages.
#[derive(Debug, Default)]
pub struct LocalStore {
    sets: DashMap<String, SortedSet>,
    values: DashMap<String, String>,
    ordinals: DashMap<String, u64>,
    next_ordinal: AtomicU64,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys of either type.
    pub fn len(&self) -> usize {
        self.sets.len() + self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn wrong_type(key: &str) -> CacheError {
        CacheError::command(format!(
            "WRONGTYPE Operation against a key holding the wrong kind of value: {key}"
        ))
    }

    fn register_key(&self, key: &str) {
        if !self.ordinals.contains_key(key) {
            self.ordinals
                .entry(key.to_string())
                .or_insert_with(|| self.next_ordinal.fetch_add(1, AtomicOrdering::Relaxed) + 1);
        }
    }

    fn ordinal(&self, key: &str) -> Option<u64> {
        self.ordinals.get(key).map(|ordinal| *ordinal)
    }
}

#[async_trait]
impl StoreClient for LocalStore {
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), CacheError> {
        if score.is_nan() {
            return Err(CacheError::command("resulting score is not a number (NaN)"));
        }
        if self.values.contains_key(key) {
            return Err(Self::wrong_type(key));
        }
        self.register_key(key);
        self.sets
            .entry(key.to_string())
            .or_default()
            .upsert(member, score);
        Ok(())
    }

    async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<u64>, CacheError> {
        Ok(self.zrevrank_with_score(key, member).await?.map(|(rank, _)| rank))
    }

    async fn zrevrank_with_score(
        &self,
        key: &str,
        member: &str,
    ) -> Result<Option<(u64, f64)>, CacheError> {
        if self.values.contains_key(key) {
            return Err(Self::wrong_type(key));
        }
        Ok(self.sets.get(key).and_then(|set| set.rev_rank(member)))
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<(String, f64)>, CacheError> {
        if self.values.contains_key(key) {
            return Err(Self::wrong_type(key));
        }
        Ok(self
            .sets
            .get(key)
            .map(|set| set.rev_range(start, stop))
            .unwrap_or_default())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
        type_filter: Option<&str>,
    ) -> Result<ScanPage, CacheError> {
        let include_sets = type_filter.is_none_or(|t| t == super::SORTED_SET_TYPE);
        let include_values = type_filter.is_none_or(|t| t == STRING_TYPE);

        // The cursor is the lowest ordinal not yet visited.
        let mut pending: Vec<(u64, String)> = Vec::new();
        let mut collect = |key: &String| {
            if let Some(ordinal) = self.ordinal(key)
                && ordinal >= cursor
                && glob_match(pattern, key)
            {
                pending.push((ordinal, key.clone()));
            }
        };
        if include_sets {
            self.sets.iter().for_each(|entry| collect(entry.key()));
        }
        if include_values {
            self.values.iter().for_each(|entry| collect(entry.key()));
        }
        pending.sort_unstable();

        let count = count.max(1);
        let cursor = match pending.get(count) {
            Some((ordinal, _)) => *ordinal,
            None => 0,
        };
        let keys = pending
            .into_iter()
            .take(count)
            .map(|(_, key)| key)
            .collect();
        Ok(ScanPage { cursor, keys })
    }

    async fn zrevrank_pipelined(
        &self,
        keys: &[String],
        member: &str,
    ) -> Result<Vec<Reply<Option<u64>>>, CacheError> {
        let mut ranks = Vec::with_capacity(keys.len());
        for key in keys {
            ranks.push(self.zrevrank(key, member).await);
        }
        Ok(ranks)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.sets.contains_key(key) {
            return Err(Self::wrong_type(key));
        }
        Ok(self.values.get(key).map(|value| value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        // SET replaces a key of any type.
        self.register_key(key);
        self.sets.remove(key);
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Reply<Option<String>>>, CacheError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await);
        }
        Ok(values)
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// Glob matching with `*` (any run) and `?` (any single byte).
fn glob_match(pattern: &str, text: &str) -> bool {
    let (pattern, text) = (pattern.as_bytes(), text.as_bytes());
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == b'?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
