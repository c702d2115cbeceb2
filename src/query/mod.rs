//! Query execution and result handling.
//!
//! The query module is organized into:
//! - `splitter` - splitting caller scripts into statements
//! - `executor` - running statements and reading their results
//! - `normalize` - column-oriented to row-oriented conversion
//! - `results` - materialized per-statement results

pub mod executor;
pub mod normalize;
pub mod results;
pub mod splitter;

pub use executor::{QueryExecutor, StatementResult};
pub use normalize::{to_rows, unique_column_names, BatchShapeError, Row};
pub use results::{ExecuteOptions, MaterializedResult};
pub use splitter::split_statements;
