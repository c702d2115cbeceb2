//! Static SQL keyword completions.

use serde::Serialize;

/// One completion suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: &'static str,
    pub detail: &'static str,
    /// Lower sorts first.
    pub priority: u8,
}

// Statement starters rank ahead of clauses, clauses ahead of the rest.
const STATEMENTS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP", "TRUNCATE",
    "GRANT", "REVOKE", "COMMIT", "ROLLBACK", "IMPORT", "EXPORT", "EXPLAIN", "OPEN SCHEMA",
    "CLOSE SCHEMA", "DESCRIBE", "EXECUTE SCRIPT", "RECOMPRESS", "REORGANIZE", "PRELOAD",
];

const CLAUSES: &[&str] = &[
    "FROM", "WHERE", "GROUP BY", "HAVING", "QUALIFY", "ORDER BY", "LIMIT", "OFFSET", "JOIN",
    "INNER JOIN", "LEFT JOIN", "RIGHT JOIN", "FULL OUTER JOIN", "CROSS JOIN", "ON", "USING",
    "UNION", "UNION ALL", "INTERSECT", "MINUS", "EXCEPT", "VALUES", "SET", "INTO", "WITH",
    "CONNECT BY", "START WITH", "PREFERRING",
];

const OTHER: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "DEFAULT", "DESC",
    "DISTINCT", "ELSE", "END", "EXISTS", "FALSE", "FOR", "IF", "IN", "IS", "LIKE", "LOCAL",
    "NOT", "NULL", "NULLS FIRST", "NULLS LAST", "OR", "OVER", "PARTITION BY", "PRIOR", "REGEXP_LIKE",
    "SCHEMA", "TABLE", "THEN", "TRUE", "VIEW", "WHEN", "DECIMAL", "DOUBLE", "VARCHAR", "CHAR",
    "BOOLEAN", "DATE", "TIMESTAMP", "TIMESTAMP WITH LOCAL TIME ZONE", "INTERVAL", "GEOMETRY",
    "HASHTYPE",
];

/// Keyword completions, highest priority first.
pub fn keyword_completions() -> Vec<CompletionItem> {
    [(STATEMENTS, 1), (CLAUSES, 2), (OTHER, 3)]
        .into_iter()
        .flat_map(|(words, priority)| {
            words.iter().map(move |&label| CompletionItem {
                label,
                detail: "KEYWORD",
                priority,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keywords_are_unique() {
        let items = keyword_completions();
        let labels: HashSet<_> = items.iter().map(|i| i.label).collect();
        assert_eq!(labels.len(), items.len());
    }

    #[test]
    fn test_all_items_are_keywords() {
        let items = keyword_completions();
        assert!(items.iter().all(|i| i.detail == "KEYWORD"));
        assert_eq!(items[0].label, "SELECT");
        assert_eq!(items[0].priority, 1);
    }
}
