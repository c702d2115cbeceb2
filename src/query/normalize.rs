//! Column-oriented to row-oriented conversion.

use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// One result row: column name to cell value, in column declaration order.
pub type Row = Map<String, Value>;

/// A batch whose `data` does not match its declared shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchShapeError {
    #[error("batch carries {actual} columns, expected {expected}")]
    ColumnCount { expected: usize, actual: usize },

    #[error("column '{column}' carries {actual} values, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Column names with repeats made distinct, so every column keeps its own
/// field in a [`Row`].
///
/// The first occurrence keeps its name. Later ones get a `_2`, `_3`, ...
/// suffix, skipping any name another column already uses.
///
/// ```
/// use exaquery::query::normalize::unique_column_names;
///
/// let names = vec!["A".to_string(), "A".to_string(), "B".to_string()];
/// assert_eq!(unique_column_names(&names), vec!["A", "A_2", "B"]);
/// ```
pub fn unique_column_names(names: &[String]) -> Vec<String> {
    let declared: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());

    names
        .iter()
        .map(|name| {
            if used.insert(name.clone()) {
                return name.clone();
            }
            let mut n = 2;
            loop {
                let candidate = format!("{name}_{n}");
                if !declared.contains(candidate.as_str()) && used.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Zip `row_count` rows out of column-oriented `data`.
///
/// `data[c][i]` is the value of column `c` in row `i`. Every column array
/// must hold exactly `row_count` values; anything else is a malformed batch.
/// Names are expected to be distinct (see [`unique_column_names`]), so each
/// row has one field per column.
pub fn to_rows(
    row_count: usize,
    column_names: &[String],
    data: &[Vec<Value>],
) -> Result<Vec<Row>, BatchShapeError> {
    if row_count == 0 {
        return Ok(Vec::new());
    }
    if data.len() != column_names.len() {
        return Err(BatchShapeError::ColumnCount {
            expected: column_names.len(),
            actual: data.len(),
        });
    }
    if let Some((name, column)) = column_names
        .iter()
        .zip(data)
        .find(|(_, column)| column.len() != row_count)
    {
        return Err(BatchShapeError::ColumnLength {
            column: name.clone(),
            expected: row_count,
            actual: column.len(),
        });
    }

    Ok((0..row_count)
        .map(|i| {
            column_names
                .iter()
                .zip(data)
                .map(|(name, column)| (name.clone(), column[i].clone()))
                .collect()
        })
        .collect())
}
