//! Caller-facing driver.
//!
//! [`Driver`] ties the pieces together: one [`ConnectionManager`] holding the
//! connection, one [`QueryExecutor`] running statements over it, and one
//! [`MetadataService`] answering explorer and search lookups through the
//! metadata cache.

use crate::config::DriverConfig;
use crate::connection::ConnectionManager;
use crate::error::{ConnectionError, QueryError};
use crate::logging::init_logging;
use crate::metadata::{
    keyword_completions, queries, CacheStats, CompletionItem, ExplorerItem, ExplorerNode,
    MetadataService, SearchKind, TableRef,
};
use crate::query::{ExecuteOptions, MaterializedResult, QueryExecutor, StatementResult};
use crate::transport::protocol::TransportFactory;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Query driver for one Exasol connection.
///
/// The connection is opened lazily by the first operation that needs it and
/// shared by every operation afterwards.
///
/// # Example
///
/// ```no_run
/// use exaquery::{Driver, DriverConfig, ExecuteOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let driver = Driver::new(DriverConfig::from_env()?);
///
/// for result in driver.execute("SELECT 1; SELECT 2", &ExecuteOptions::default()).await? {
///     println!("{}", result?.message);
/// }
///
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Driver {
    connection: Arc<ConnectionManager>,
    executor: Arc<QueryExecutor>,
    metadata: MetadataService,
    connection_id: Uuid,
}

impl Driver {
    /// Create a driver that connects over WebSocket.
    ///
    /// Also initializes logging from `config.logging` unless a subscriber
    /// was installed before.
    pub fn new(config: DriverConfig) -> Self {
        let connection = Arc::new(ConnectionManager::new(config.connection.clone()));
        Self::from_parts(config, connection)
    }

    /// Create a driver whose connections use transports from `factory`.
    pub fn with_transport_factory(config: DriverConfig, factory: TransportFactory) -> Self {
        let connection = Arc::new(ConnectionManager::with_factory(
            config.connection.clone(),
            factory,
        ));
        Self::from_parts(config, connection)
    }

    fn from_parts(config: DriverConfig, connection: Arc<ConnectionManager>) -> Self {
        init_logging(&config.logging);

        let connection_id = Uuid::new_v4();
        let executor = Arc::new(QueryExecutor::new(
            Arc::clone(&connection),
            config.executor,
            connection_id,
        ));
        let metadata = MetadataService::new(Arc::clone(&executor), &config.cache);

        Self {
            connection,
            executor,
            metadata,
            connection_id,
        }
    }

    /// Identifier stamped on every result of this driver.
    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Open the connection if it is not open yet.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` if connecting, logging in or applying the
    /// session attributes fails. Nothing is kept in that case, so the next
    /// call tries again.
    pub async fn open(&self) -> Result<(), ConnectionError> {
        self.connection.open().await.map(|_| ())
    }

    /// Disconnect. Succeeds trivially if nothing is open.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        self.connection.close().await
    }

    pub async fn is_open(&self) -> bool {
        self.connection.is_open().await
    }

    /// Execute a script of one or more statements.
    ///
    /// # Arguments
    ///
    /// * `sql_text` - Statements separated by `;`
    /// * `options` - Request id to echo and whether to read all rows
    ///
    /// # Returns
    ///
    /// One entry per statement, in script order. Each entry is either the
    /// materialized result or the error of that statement alone.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Connection` if the connection cannot be opened.
    pub async fn execute(
        &self,
        sql_text: &str,
        options: &ExecuteOptions,
    ) -> Result<Vec<StatementResult>, QueryError> {
        self.executor.execute(sql_text, options).await
    }

    /// Search tables and views by name, or columns of the given tables.
    ///
    /// # Arguments
    ///
    /// * `kind` - What to look for; `Table` and `View` both return tables and views
    /// * `text` - Case-insensitive substring of the name
    /// * `tables` - Tables to search in; required for `Column`
    pub async fn search(
        &self,
        kind: SearchKind,
        text: &str,
        tables: &[TableRef],
    ) -> Result<Vec<ExplorerItem>, QueryError> {
        self.metadata.search(kind, text, tables).await
    }

    /// Child items of an explorer tree node.
    pub async fn get_children(&self, node: &ExplorerNode) -> Result<Vec<ExplorerItem>, QueryError> {
        self.metadata.children(node).await
    }

    /// Open the connection and run `SELECT 1`.
    pub async fn test_connection(&self) -> Result<(), QueryError> {
        self.connection.open().await?;
        self.executor
            .execute_statement("SELECT 1", &ExecuteOptions::default())
            .await?;
        info!(connection_id = %self.connection_id, "connection test passed");
        Ok(())
    }

    /// Read a page of records of a table or view.
    ///
    /// # Arguments
    ///
    /// * `table` - Table or view to read
    /// * `limit` - Page size, 50 if `None`
    /// * `offset` - Rows to skip, 0 if `None`
    pub async fn fetch_records(
        &self,
        table: &TableRef,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<MaterializedResult, QueryError> {
        let sql = queries::fetch_records(
            table,
            limit.unwrap_or(queries::DEFAULT_RECORD_LIMIT),
            offset.unwrap_or(0),
        );
        self.executor
            .execute_statement(&sql, &ExecuteOptions::default())
            .await
    }

    /// Number of records in a table or view.
    pub async fn count_records(&self, table: &TableRef) -> Result<u64, QueryError> {
        let sql = queries::count_records(table);
        let result = self
            .executor
            .execute_statement(&sql, &ExecuteOptions::default())
            .await?;

        let total = result.rows.first().and_then(|row| row.get("total"));
        match total {
            Some(Value::Number(n)) => n.as_u64(),
            // Exasol may send large DECIMAL values as strings.
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            QueryError::UnexpectedResult(format!("No record count in result of {sql}: {total:?}"))
        })
    }

    pub fn static_completions(&self) -> Vec<CompletionItem> {
        keyword_completions()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.metadata.cache_stats()
    }

    /// Drop every cached metadata lookup.
    pub async fn clear_metadata_cache(&self) {
        self.metadata.clear_cache().await;
    }
}
