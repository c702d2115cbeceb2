//! Materialized statement results.

use crate::query::normalize::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller options for [`QueryExecutor::execute`](crate::query::QueryExecutor::execute).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOptions {
    /// Opaque correlation id echoed into every result.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Read every row instead of stopping at the configured maximum.
    #[serde(default)]
    pub full_results: bool,
}

impl ExecuteOptions {
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn full_results(mut self, full_results: bool) -> Self {
        self.full_results = full_results;
        self
    }
}

/// Fully read result of one statement.
///
/// For row-count statements `columns` and `rows` are empty and
/// `rows_returned`/`rows_available` are zero; the affected row count is
/// reported in `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub message: String,
    pub rows_returned: usize,
    /// Rows the server reported for the statement.
    pub rows_available: u64,
    /// Set when fewer rows were read than the server had.
    pub truncated: bool,
    /// Statement text as sent to the server.
    pub query: String,
    pub request_id: Option<String>,
    pub result_id: Uuid,
    pub connection_id: Uuid,
}

impl MaterializedResult {
    pub(crate) fn row_count(
        statement: &str,
        affected: u64,
        options: &ExecuteOptions,
        connection_id: Uuid,
    ) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            message: format!("Query ok with {affected} rows affected"),
            rows_returned: 0,
            rows_available: 0,
            truncated: false,
            query: statement.to_string(),
            request_id: options.request_id.clone(),
            result_id: Uuid::new_v4(),
            connection_id,
        }
    }

    pub(crate) fn result_set(
        statement: &str,
        columns: Vec<String>,
        rows: Vec<Row>,
        rows_available: u64,
        options: &ExecuteOptions,
        connection_id: Uuid,
    ) -> Self {
        let rows_returned = rows.len();
        let truncated = (rows_returned as u64) < rows_available;
        let message = if truncated {
            format!("Query ok with {rows_available} results, showing first {rows_returned}")
        } else {
            format!("Query ok with {rows_returned} results")
        };

        Self {
            columns,
            rows,
            message,
            rows_returned,
            rows_available,
            truncated,
            query: statement.to_string(),
            request_id: options.request_id.clone(),
            result_id: Uuid::new_v4(),
            connection_id,
        }
    }
}
