//! Rendered metadata and record-browsing queries.
//!
//! Lookups against the `EXA_ALL_*` system views start with the
//! `/*snapshot execution*/` hint so Exasol reads them in snapshot mode and
//! does not take locks. Every function returns the final SQL text, which is
//! also the metadata cache key.

use crate::metadata::explorer::{ItemKind, TableRef};

pub const SNAPSHOT_EXECUTION: &str = "/*snapshot execution*/";

/// Default page size for [`fetch_records`].
pub const DEFAULT_RECORD_LIMIT: u64 = 50;

/// Quote `value` as a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote `name` as a case-sensitive identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn like_contains(search: &str) -> String {
    quote_literal(&format!("%{}%", search.to_lowercase()))
}

pub fn fetch_schemas() -> String {
    format!(
        r#"{SNAPSHOT_EXECUTION} SELECT
  "SCHEMA_NAME" AS "label",
  "SCHEMA_NAME" AS "schema",
  '{schema}' AS "type"
FROM "EXA_ALL_SCHEMAS"
ORDER BY "SCHEMA_NAME""#,
        schema = ItemKind::Schema.as_str(),
    )
}

pub fn fetch_tables(schema: &str) -> String {
    format!(
        r#"{SNAPSHOT_EXECUTION} SELECT
  "TABLE_NAME" AS "label",
  "TABLE_SCHEMA" AS "schema",
  '{table}' AS "type",
  FALSE AS "isView"
FROM "EXA_ALL_TABLES"
WHERE "TABLE_SCHEMA" = {schema}
ORDER BY "TABLE_NAME""#,
        table = ItemKind::Table.as_str(),
        schema = quote_literal(schema),
    )
}

pub fn fetch_views(schema: &str) -> String {
    format!(
        r#"{SNAPSHOT_EXECUTION} SELECT
  "VIEW_NAME" AS "label",
  "VIEW_SCHEMA" AS "schema",
  '{view}' AS "type",
  TRUE AS "isView"
FROM "EXA_ALL_VIEWS"
WHERE "VIEW_SCHEMA" = {schema}
ORDER BY "VIEW_NAME""#,
        view = ItemKind::View.as_str(),
        schema = quote_literal(schema),
    )
}

pub fn fetch_columns(table: &TableRef) -> String {
    format!(
        r#"{SNAPSHOT_EXECUTION} SELECT
  "COLUMN_NAME" AS "label",
  "COLUMN_TYPE" AS "dataType",
  "COLUMN_IS_NULLABLE" AS "isNullable",
  "COLUMN_TABLE" AS "table",
  "COLUMN_SCHEMA" AS "schema",
  '{column}' AS "type",
  'column' AS "iconName"
FROM "EXA_ALL_COLUMNS"
WHERE "COLUMN_SCHEMA" = {schema}
  AND "COLUMN_TABLE" = {table}
ORDER BY "COLUMN_ORDINAL_POSITION""#,
        column = ItemKind::Column.as_str(),
        schema = quote_literal(&table.schema),
        table = quote_literal(&table.name),
    )
}

/// Tables and views whose name contains `search`, ignoring case.
pub fn search_tables(search: &str) -> String {
    let pattern = like_contains(search);
    format!(
        r#"{SNAPSHOT_EXECUTION} SELECT
  "VIEW_SCHEMA" || '.' || "VIEW_NAME" AS "label",
  "VIEW_SCHEMA" AS "schema",
  '{view}' AS "type",
  TRUE AS "isView"
FROM "EXA_ALL_VIEWS"
WHERE LOWER("VIEW_NAME") LIKE {pattern}
UNION ALL
SELECT
  "TABLE_SCHEMA" || '.' || "TABLE_NAME" AS "label",
  "TABLE_SCHEMA" AS "schema",
  '{table}' AS "type",
  FALSE AS "isView"
FROM "EXA_ALL_TABLES"
WHERE LOWER("TABLE_NAME") LIKE {pattern}"#,
        view = ItemKind::View.as_str(),
        table = ItemKind::Table.as_str(),
    )
}

/// Columns of `tables` whose name contains `search`, ignoring case.
///
/// `tables` must not be empty.
pub fn search_columns(search: &str, tables: &[TableRef]) -> String {
    let restriction = tables
        .iter()
        .map(|t| {
            format!(
                r#"("COLUMN_SCHEMA" = {} AND "COLUMN_TABLE" = {})"#,
                quote_literal(&t.schema),
                quote_literal(&t.name)
            )
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        r#"{SNAPSHOT_EXECUTION} SELECT
  "COLUMN_NAME" AS "label",
  "COLUMN_TABLE" AS "table",
  "COLUMN_SCHEMA" AS "schema",
  "COLUMN_TYPE" AS "dataType",
  "COLUMN_IS_NULLABLE" AS "isNullable",
  '{column}' AS "type"
FROM "EXA_ALL_COLUMNS"
WHERE LOWER("COLUMN_NAME") LIKE {pattern}
  AND ({restriction})
ORDER BY "COLUMN_TABLE", "COLUMN_ORDINAL_POSITION""#,
        column = ItemKind::Column.as_str(),
        pattern = like_contains(search),
    )
}

pub fn fetch_records(table: &TableRef, limit: u64, offset: u64) -> String {
    format!(
        "SELECT * FROM {}.{} ORDER BY NULL LIMIT {limit} OFFSET {offset}",
        quote_identifier(&table.schema),
        quote_identifier(&table.name)
    )
}

pub fn count_records(table: &TableRef) -> String {
    format!(
        r#"SELECT COUNT(1) AS "total" FROM {}.{}"#,
        quote_identifier(&table.schema),
        quote_identifier(&table.name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(schema: &str, name: &str) -> TableRef {
        TableRef::new(schema, name)
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_identifier(r#"my"table"#), r#""my""table""#);
    }

    #[test]
    fn test_system_queries_use_snapshot_mode() {
        let t = table("S", "T");
        for sql in [
            fetch_schemas(),
            fetch_tables("S"),
            fetch_views("S"),
            fetch_columns(&t),
            search_tables("x"),
            search_columns("x", &[t.clone()]),
        ] {
            assert!(sql.starts_with(SNAPSHOT_EXECUTION), "{sql}");
        }
    }

    #[test]
    fn test_schema_parameter_is_escaped() {
        let sql = fetch_tables("O'BRIEN");
        assert!(sql.contains(r#""TABLE_SCHEMA" = 'O''BRIEN'"#));
    }

    #[test]
    fn test_search_is_lowercased() {
        let sql = search_tables("Cust");
        assert!(sql.contains("LIKE '%cust%'"));
        assert!(sql.contains("UNION ALL"));
    }

    #[test]
    fn test_search_columns_restricts_to_tables() {
        let sql = search_columns("id", &[table("S", "A"), table("S", "B")]);
        assert!(sql.contains(
            r#"("COLUMN_SCHEMA" = 'S' AND "COLUMN_TABLE" = 'A') OR ("COLUMN_SCHEMA" = 'S' AND "COLUMN_TABLE" = 'B')"#
        ));
    }

    #[test]
    fn test_record_queries() {
        let t = table("RETAIL", "SALES");
        assert_eq!(
            fetch_records(&t, 50, 100),
            r#"SELECT * FROM "RETAIL"."SALES" ORDER BY NULL LIMIT 50 OFFSET 100"#
        );
        assert_eq!(
            count_records(&t),
            r#"SELECT COUNT(1) AS "total" FROM "RETAIL"."SALES""#
        );
    }
}
