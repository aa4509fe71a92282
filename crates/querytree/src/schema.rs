//! Read-only table catalog used for loading and validating queries.
//!
//! The catalog is supplied by the surrounding application (usually from a
//! schema service) and never changes while a query is being edited.
//!
//! # Example
//! ```
//! use querytree::{Schema, TableSchema};
//!
//! let schema = Schema::new()
//!     .with_table(TableSchema::new("person").with_columns(&["id", "name"]).with_primary_key("id"));
//! assert!(schema.find_table("person").unwrap().has_column("name"));
//! ```

use crate::error::ModelResult;
use serde::{Deserialize, Serialize};

/// A single column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    pub name: String,
    /// Declared column type, kept verbatim (e.g. `INTEGER`, `TEXT`).
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub not_null: bool,
    /// Default value expression, if the column has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            not_null: false,
            default: None,
            is_primary: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// An INSERT has to provide a value for this column.
    pub fn requires_value(&self) -> bool {
        self.not_null && self.default.is_none() && !self.is_primary
    }
}

/// A table and its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Add untyped, nullable columns.
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        for col in columns {
            self.columns.push(ColumnSchema::new(*col, ""));
        }
        self
    }

    /// Mark `pk` as primary key, adding the column if it does not exist yet.
    pub fn with_primary_key(mut self, pk: &str) -> Self {
        for col in &mut self.columns {
            col.is_primary = col.name == pk;
        }
        if !self.has_column(pk) {
            self.columns.push(ColumnSchema::new(pk, "").primary());
        }
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Position of `name` in declaration order.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// The catalog of all tables a query may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    /// Parse a catalog from its JSON form (`{ "tables": [...] }`).
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add a table, replacing an existing table of the same name.
    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.register_table(table);
        self
    }

    pub fn register_table(&mut self, table: TableSchema) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn find_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.find_table(name).is_some()
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.find_table(table).is_some_and(|t| t.has_column(column))
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
