//! Metadata lookup cache.
//!
//! Keyed by rendered query text. Entries expire a fixed time after they were
//! stored and the least recently used entry is evicted once the capacity is
//! reached. Failed lookups are never stored.

use crate::config::CacheConfig;
use crate::error::QueryError;
use crate::query::Row;
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cached rows of one metadata query.
pub type CachedRows = Arc<Vec<Row>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
}

pub struct MetadataCache {
    entries: Cache<String, CachedRows>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCache")
            .field("stats", &self.stats())
            .finish()
    }
}

impl MetadataCache {
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.time_to_live)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached rows for `query`, or the rows produced by `load`.
    ///
    /// Concurrent misses for the same query share one `load`. If `load`
    /// fails nothing is stored and the error is returned.
    pub async fn get_or_load<F, Fut>(&self, query: &str, load: F) -> Result<CachedRows, QueryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Row>, QueryError>>,
    {
        if let Some(rows) = self.entries.get(query).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(rows = rows.len(), "metadata cache hit");
            return Ok(rows);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("metadata cache miss");
        self.entries
            .try_get_with(query.to_string(), async move { load().await.map(Arc::new) })
            .await
            .map_err(|e| QueryError::clone(&e))
    }

    pub async fn invalidate_all(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }

    /// Apply pending expirations and evictions.
    pub async fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks().await;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.entry_count(),
        }
    }
}
