//! Cache and fallback counters.
//!
//! Emitted through the `metrics` facade; whichever recorder the embedding
//! process installs receives them. Without a recorder they are no-ops.

use metrics::counter;
use scoreboard_storage::EntityKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const NAME_CACHE_HITS_TOTAL: &str = "name_cache_hits_total";
    pub const NAME_CACHE_MISSES_TOTAL: &str = "name_cache_misses_total";
    pub const CACHE_WRITE_RETRIES_TOTAL: &str = "cache_write_retries_total";
    pub const DURABLE_FALLBACKS_TOTAL: &str = "durable_fallbacks_total";
}

/// Record name cache hits.
pub fn record_name_hits(kind: EntityKind, count: usize) {
    if count > 0 {
        counter!(names::NAME_CACHE_HITS_TOTAL, "kind" => kind.as_str()).increment(count as u64);
    }
}

/// Record name cache misses (including reads degraded by a cache error).
pub fn record_name_misses(kind: EntityKind, count: usize) {
    if count > 0 {
        counter!(names::NAME_CACHE_MISSES_TOTAL, "kind" => kind.as_str())
            .increment(count as u64);
    }
}

/// Record one retried cache write.
pub fn record_write_retry(operation: &'static str) {
    counter!(names::CACHE_WRITE_RETRIES_TOTAL, "operation" => operation).increment(1);
}

/// Record a query against the durable store made on behalf of the cache.
pub fn record_durable_fallback(kind: EntityKind) {
    counter!(names::DURABLE_FALLBACKS_TOTAL, "kind" => kind.as_str()).increment(1);
}
