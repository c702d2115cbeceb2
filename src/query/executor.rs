//! Statement execution and result materialization.
//!
//! Every statement goes through the same steps: `execute`, then for result
//! sets the inline rows plus as many `fetch` round-trips as needed, then a
//! single `closeResultSet` if the server handed out a cursor. All
//! round-trips go through the connection's [`CommandQueue`].

use crate::config::ExecutorConfig;
use crate::connection::{CommandQueue, ConnectionManager};
use crate::error::{QueryError, TransportError};
use crate::query::normalize::{to_rows, unique_column_names, BatchShapeError, Row};
use crate::query::results::{ExecuteOptions, MaterializedResult};
use crate::query::splitter::split_statements;
use crate::transport::messages::{RawResult, ResultSetData};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Outcome of one statement of a script.
pub type StatementResult = Result<MaterializedResult, QueryError>;

#[derive(Debug)]
pub struct QueryExecutor {
    connection: Arc<ConnectionManager>,
    config: ExecutorConfig,
    connection_id: Uuid,
}

impl QueryExecutor {
    pub fn new(
        connection: Arc<ConnectionManager>,
        config: ExecutorConfig,
        connection_id: Uuid,
    ) -> Self {
        Self {
            connection,
            config,
            connection_id,
        }
    }

    /// Split `sql_text` into statements and run all of them.
    ///
    /// Returns one entry per statement, in script order. A failing statement
    /// only affects its own entry. The outer error is reserved for failures
    /// that prevent running anything at all, i.e. opening the connection.
    pub async fn execute(
        &self,
        sql_text: &str,
        options: &ExecuteOptions,
    ) -> Result<Vec<StatementResult>, QueryError> {
        let statements = split_statements(sql_text);
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let queue = self.connection.open().await?;
        debug!(statements = statements.len(), "executing script");

        // `execute` enqueues eagerly, so the statements hit the wire in order
        // even though their fetch loops are driven concurrently.
        let pending: Vec<_> = statements
            .into_iter()
            .map(|statement| {
                let executed = queue.execute(&statement);
                self.materialize(&queue, statement, executed, options)
            })
            .collect();

        Ok(join_all(pending).await)
    }

    /// Run one already split statement.
    pub async fn execute_statement(
        &self,
        statement: &str,
        options: &ExecuteOptions,
    ) -> StatementResult {
        let queue = self.connection.open().await?;
        let executed = queue.execute(statement);
        self.materialize(&queue, statement.to_string(), executed, options)
            .await
    }

    async fn materialize(
        &self,
        queue: &CommandQueue,
        statement: String,
        executed: impl Future<Output = Result<RawResult, TransportError>>,
        options: &ExecuteOptions,
    ) -> StatementResult {
        let raw = match executed.await {
            Ok(raw) => raw,
            Err(source) => {
                debug!(%statement, error = %source, "statement failed");
                return Err(QueryError::Transport { statement, source });
            }
        };

        match raw {
            RawResult::RowCount { count } => {
                debug!(%statement, rows_affected = count, "row count result");
                Ok(MaterializedResult::row_count(
                    &statement,
                    count,
                    options,
                    self.connection_id,
                ))
            }
            RawResult::ResultSet(result_set) => {
                self.read_result_set(queue, statement, result_set, options)
                    .await
            }
            RawResult::Unrecognized { result_type } => Err(QueryError::ProtocolViolation {
                statement,
                message: format!("Unknown result type '{result_type}'"),
            }),
        }
    }

    async fn read_result_set(
        &self,
        queue: &CommandQueue,
        statement: String,
        result_set: ResultSetData,
        options: &ExecuteOptions,
    ) -> StatementResult {
        let columns = unique_column_names(&result_set.column_names());
        let rows = self
            .read_rows(queue, &statement, &columns, &result_set, options.full_results)
            .await;

        if let Some(handle) = result_set.result_set_handle {
            if let Err(e) = queue.close_result_set(handle).await {
                warn!(%handle, error = %e, "failed to close result set");
            }
        }

        let rows = rows?;
        debug!(
            %statement,
            rows = rows.len(),
            available = result_set.num_rows,
            "result set read"
        );
        Ok(MaterializedResult::result_set(
            &statement,
            columns,
            rows,
            result_set.num_rows,
            options,
            self.connection_id,
        ))
    }

    /// Inline rows plus fetched chunks, cut to exactly the expected count.
    async fn read_rows(
        &self,
        queue: &CommandQueue,
        statement: &str,
        columns: &[String],
        result_set: &ResultSetData,
        full_results: bool,
    ) -> Result<Vec<Row>, QueryError> {
        let available = result_set.num_rows;
        let expected = if full_results {
            available
        } else {
            available.min(self.config.max_results as u64)
        };

        let malformed = |batch: &str, e: BatchShapeError| QueryError::ProtocolViolation {
            statement: statement.to_string(),
            message: format!("malformed {batch}: {e}"),
        };

        let mut rows = to_rows(
            result_set.num_rows_in_message as usize,
            columns,
            &result_set.data,
        )
        .map_err(|e| malformed("inline batch", e))?;
        rows.truncate(expected as usize);

        while (rows.len() as u64) < expected {
            let Some(handle) = result_set.result_set_handle else {
                debug!(
                    statement,
                    read = rows.len(),
                    expected,
                    "no cursor for remaining rows"
                );
                break;
            };

            let offset = rows.len() as u64;
            let chunk = queue
                .fetch(handle, offset, self.config.fetch_bytes)
                .await
                .map_err(|source| QueryError::PartialResult {
                    statement: statement.to_string(),
                    rows_discarded: rows.len(),
                    source,
                })?;

            if chunk.num_rows == 0 {
                return Err(QueryError::ProtocolViolation {
                    statement: statement.to_string(),
                    message: format!(
                        "fetch at offset {offset} returned no rows, expected {expected}"
                    ),
                });
            }

            let fetched = to_rows(chunk.num_rows as usize, columns, &chunk.data)
                .map_err(|e| malformed(&format!("fetch at offset {offset}"), e))?;
            rows.extend(fetched);
        }
        rows.truncate(expected as usize);

        Ok(rows)
    }
}
