//! Database explorer tree types.

use crate::query::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of an explorer item, as rendered into the `type` column of
/// metadata queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Connection,
    Schema,
    Group,
    Table,
    View,
    Column,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Connection => "connection",
            ItemKind::Schema => "schema",
            ItemKind::Group => "group",
            ItemKind::Table => "table",
            ItemKind::View => "view",
            ItemKind::Column => "column",
        }
    }
}

/// Objects that [`search`](crate::Driver::search) can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    /// Tables and views.
    Table,
    /// Same as [`SearchKind::Table`].
    View,
    Column,
}

/// Schema-qualified table or view name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Position in the explorer tree whose children are requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerNode {
    Connection,
    Schema { schema: String },
    /// "Tables" or "Views" folder below a schema.
    Group { schema: String, child_type: ItemKind },
    Table(TableRef),
    View(TableRef),
    Column,
}

/// One child entry of the explorer tree or one search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerItem {
    pub label: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_type: Option<ItemKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
}

impl ExplorerItem {
    /// Static "Tables" / "Views" folders shown below every schema.
    pub fn schema_groups(schema: &str) -> Vec<ExplorerItem> {
        [("Tables", ItemKind::Table), ("Views", ItemKind::View)]
            .into_iter()
            .map(|(label, child_type)| ExplorerItem {
                label: label.to_string(),
                schema: Some(schema.to_string()),
                kind: ItemKind::Group,
                table: None,
                data_type: None,
                is_nullable: None,
                is_view: None,
                child_type: Some(child_type),
                icon_name: Some("folder".to_string()),
            })
            .collect()
    }

    /// Decode a metadata query row.
    pub fn from_row(row: &Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row.clone()))
    }

    /// Tree node to expand this item, if it can be expanded.
    ///
    /// Search hits for tables are labelled `schema.name`; the node is built
    /// from the label with the schema prefix removed.
    pub fn node(&self) -> Option<ExplorerNode> {
        let schema = self.schema.clone()?;
        match self.kind {
            ItemKind::Schema => Some(ExplorerNode::Schema { schema }),
            ItemKind::Group => Some(ExplorerNode::Group {
                schema,
                child_type: self.child_type?,
            }),
            ItemKind::Table | ItemKind::View => {
                let prefix = format!("{schema}.");
                let name = self
                    .label
                    .strip_prefix(&prefix)
                    .unwrap_or(&self.label)
                    .to_string();
                let table = TableRef { schema, name };
                Some(if self.kind == ItemKind::View {
                    ExplorerNode::View(table)
                } else {
                    ExplorerNode::Table(table)
                })
            }
            ItemKind::Connection | ItemKind::Column => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_schema_groups() {
        let groups = ExplorerItem::schema_groups("RETAIL");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Tables");
        assert_eq!(groups[1].child_type, Some(ItemKind::View));
        assert!(groups.iter().all(|g| g.icon_name.as_deref() == Some("folder")));
    }

    #[test]
    fn test_decode_column_row() {
        let item = ExplorerItem::from_row(&row(json!({
            "label": "ID",
            "dataType": "DECIMAL(18,0)",
            "isNullable": false,
            "table": "SALES",
            "schema": "RETAIL",
            "type": "column",
            "iconName": "column"
        })))
        .unwrap();

        assert_eq!(item.kind, ItemKind::Column);
        assert_eq!(item.data_type.as_deref(), Some("DECIMAL(18,0)"));
        assert_eq!(item.is_nullable, Some(false));
        assert!(item.node().is_none());
    }

    #[test]
    fn test_search_hit_node_strips_schema() {
        let item = ExplorerItem::from_row(&row(json!({
            "label": "RETAIL.SALES_V",
            "schema": "RETAIL",
            "type": "view",
            "isView": true
        })))
        .unwrap();

        assert_eq!(
            item.node(),
            Some(ExplorerNode::View(TableRef::new("RETAIL", "SALES_V")))
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(ExplorerItem::from_row(&row(json!({"label": "x", "type": "index"}))).is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(&ExplorerItem::schema_groups("S")[0]).unwrap();
        assert_eq!(value["type"], "group");
        assert_eq!(value["childType"], "table");
        assert_eq!(value["iconName"], "folder");
    }
}
