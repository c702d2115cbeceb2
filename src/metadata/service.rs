//! Explorer and search lookups.
//!
//! Each lookup renders a query from [`queries`](crate::metadata::queries),
//! answers it from the [`MetadataCache`] when possible and decodes the rows
//! into [`ExplorerItem`]s. Tree expansion reads every row; search results
//! are capped like ordinary statements.

use crate::config::CacheConfig;
use crate::error::QueryError;
use crate::metadata::cache::{CacheStats, CachedRows, MetadataCache};
use crate::metadata::explorer::{ExplorerItem, ExplorerNode, ItemKind, SearchKind, TableRef};
use crate::metadata::queries;
use crate::query::{ExecuteOptions, QueryExecutor};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct MetadataService {
    executor: Arc<QueryExecutor>,
    cache: MetadataCache,
}

impl MetadataService {
    pub fn new(executor: Arc<QueryExecutor>, config: &CacheConfig) -> Self {
        Self {
            executor,
            cache: MetadataCache::new(config),
        }
    }

    /// Rows of a rendered metadata query, from the cache if present.
    pub async fn cached_query(
        &self,
        query: &str,
        full_results: bool,
    ) -> Result<CachedRows, QueryError> {
        self.cache
            .get_or_load(query, || async {
                let options = ExecuteOptions::default().full_results(full_results);
                let result = self.executor.execute_statement(query, &options).await?;
                Ok(result.rows)
            })
            .await
            .map_err(|source| QueryError::Metadata {
                query: query.to_string(),
                source: Box::new(source),
            })
    }

    pub async fn children(&self, node: &ExplorerNode) -> Result<Vec<ExplorerItem>, QueryError> {
        let query = match node {
            ExplorerNode::Connection => queries::fetch_schemas(),
            ExplorerNode::Schema { schema } => return Ok(ExplorerItem::schema_groups(schema)),
            ExplorerNode::Group { schema, child_type } => match child_type {
                ItemKind::Table => queries::fetch_tables(schema),
                ItemKind::View => queries::fetch_views(schema),
                _ => return Ok(Vec::new()),
            },
            ExplorerNode::Table(table) | ExplorerNode::View(table) => {
                queries::fetch_columns(table)
            }
            ExplorerNode::Column => return Ok(Vec::new()),
        };

        self.items(query, true).await
    }

    /// Search tables and views, or columns of `tables`.
    ///
    /// A column search without tables finds nothing and does not touch the
    /// connection.
    pub async fn search(
        &self,
        kind: SearchKind,
        text: &str,
        tables: &[TableRef],
    ) -> Result<Vec<ExplorerItem>, QueryError> {
        let query = match kind {
            SearchKind::Table | SearchKind::View => queries::search_tables(text),
            SearchKind::Column if tables.is_empty() => {
                debug!("column search without tables");
                return Ok(Vec::new());
            }
            SearchKind::Column => queries::search_columns(text, tables),
        };

        self.items(query, false).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn clear_cache(&self) {
        self.cache.invalidate_all().await;
    }

    async fn items(&self, query: String, full_results: bool) -> Result<Vec<ExplorerItem>, QueryError> {
        let rows = self.cached_query(&query, full_results).await?;
        rows.iter()
            .map(ExplorerItem::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| QueryError::Metadata {
                query,
                source: Box::new(QueryError::UnexpectedResult(format!(
                    "Malformed metadata row: {e}"
                ))),
            })
    }
}
