//! Schema-aware validation of a query.
//!
//! Validation never fails: it collects every problem it finds into a
//! [`ValidationResult`]. Each [`ValidationError`] carries the [`Location`] of the
//! clause it was found in so an editor can highlight it.

use crate::expr::{ColumnRef, ExprArena, ExprId, Expression};
use crate::model::TableNameDefinition;
use crate::schema::{Schema, TableSchema};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clause a validation error points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Location {
    Select,
    From,
    Where,
    Insert,
    Update,
    Delete,
}

impl Location {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::From => "FROM",
            Self::Where => "WHERE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// Referenced table does not exist in the schema.
    UnknownTable,
    /// Referenced column does not exist in its table.
    UnknownColumn,
    /// Qualifier alias is not declared in FROM.
    UnknownAlias,
    /// Table exists but is not part of FROM.
    TableNotInFrom,
    /// Unqualified column found in more than one visible table.
    AmbiguousColumn,
    /// DELETE statements can not join.
    JoinInDelete,
    /// The same table appears twice without telling both apart by alias.
    MissingSelfJoinAlias,
    /// Two FROM entries share an alias.
    DuplicateAlias,
    /// A column is assigned more than once.
    DuplicateAssignment,
    /// A NOT NULL column without default receives no value.
    MissingRequiredColumn,
    /// An UPDATE without any `SET` entry.
    NoAssignments,
}

/// A single located problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    pub location: Location,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.location, self.message)
    }
}

/// All problems found in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push(
        &mut self,
        kind: ValidationErrorKind,
        location: Location,
        message: impl Into<String>,
    ) {
        self.errors.push(ValidationError {
            kind,
            message: message.into(),
            location,
        });
    }

    /// Append the errors of another result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    /// Errors reported for one clause.
    pub fn at(&self, location: Location) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.location == location)
    }

    pub fn has_kind(&self, kind: ValidationErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }
}

/// Switches for optional checks.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Report NOT NULL columns without default that an INSERT leaves inactive.
    pub require_not_null_columns: bool,
    /// Report unqualified columns found in several FROM tables.
    pub report_ambiguous_columns: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_not_null_columns: true,
            report_ambiguous_columns: true,
        }
    }
}

impl ValidationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_columns(mut self, enabled: bool) -> Self {
        self.require_not_null_columns = enabled;
        self
    }

    pub fn with_ambiguity_check(mut self, enabled: bool) -> Self {
        self.report_ambiguous_columns = enabled;
        self
    }
}

#[derive(Debug)]
struct ScopeTable<'s> {
    name: String,
    alias: Option<String>,
    schema: Option<&'s TableSchema>,
}

/// Tables visible to the expressions of a statement.
#[derive(Debug)]
pub(crate) struct Scope<'s> {
    schema: &'s Schema,
    tables: Vec<ScopeTable<'s>>,
}

impl<'s> Scope<'s> {
    pub(crate) fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            tables: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, table: &TableNameDefinition) {
        self.tables.push(ScopeTable {
            name: table.name.clone(),
            alias: table.alias.clone(),
            schema: self.schema.find_table(&table.name),
        });
    }

    pub(crate) fn with_table(mut self, name: &str) -> Self {
        self.push(&TableNameDefinition::new(name));
        self
    }

    /// Check all column and star references below `id`.
    pub(crate) fn check_expression(
        &self,
        exprs: &ExprArena,
        id: ExprId,
        location: Location,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        exprs.walk(id, &mut |_, expr| match expr {
            Expression::Column(c) => self.check_column(c, location, config, result),
            Expression::Star {
                limited_to: Some(t),
            } => self.check_star(t, location, result),
            _ => {}
        });
    }

    fn check_column(
        &self,
        c: &ColumnRef,
        location: Location,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        if let Some(alias) = &c.alias {
            match self.tables.iter().find(|t| t.alias.as_deref() == Some(alias.as_str())) {
                Some(t) => self.check_column_in(t, &c.column, location, result),
                None => result.push(
                    ValidationErrorKind::UnknownAlias,
                    location,
                    format!("Unknown table alias: {alias}"),
                ),
            }
            return;
        }

        if let Some(table) = &c.table {
            match self.tables.iter().find(|t| &t.name == table) {
                Some(t) => self.check_column_in(t, &c.column, location, result),
                None => self.report_missing_table(table, location, result),
            }
            return;
        }

        let matches = self
            .tables
            .iter()
            .filter(|t| t.schema.is_some_and(|s| s.has_column(&c.column)))
            .count();
        match matches {
            0 => result.push(
                ValidationErrorKind::UnknownColumn,
                location,
                format!("Column not found: {}", c.column),
            ),
            1 => {}
            _ if config.report_ambiguous_columns => result.push(
                ValidationErrorKind::AmbiguousColumn,
                location,
                format!(
                    "Ambiguous column reference: {} (found in multiple tables)",
                    c.column
                ),
            ),
            _ => {}
        }
    }

    fn check_column_in(
        &self,
        table: &ScopeTable<'_>,
        column: &str,
        location: Location,
        result: &mut ValidationResult,
    ) {
        // Unknown tables are reported where they are declared.
        let Some(schema) = table.schema else {
            return;
        };
        if !schema.has_column(column) {
            result.push(
                ValidationErrorKind::UnknownColumn,
                location,
                format!("Column not found: {}.{column}", table.name),
            );
        }
    }

    fn check_star(&self, t: &TableNameDefinition, location: Location, result: &mut ValidationResult) {
        if let Some(alias) = &t.alias {
            if !self.tables.iter().any(|s| s.alias.as_deref() == Some(alias.as_str())) {
                result.push(
                    ValidationErrorKind::UnknownAlias,
                    location,
                    format!("Unknown table alias: {alias}"),
                );
            }
            return;
        }
        if !self.tables.iter().any(|s| s.name == t.name) {
            self.report_missing_table(&t.name, location, result);
        }
    }

    fn report_missing_table(&self, table: &str, location: Location, result: &mut ValidationResult) {
        if self.schema.has_table(table) {
            result.push(
                ValidationErrorKind::TableNotInFrom,
                location,
                format!("Table {table} is not part of FROM"),
            );
        } else {
            result.push(
                ValidationErrorKind::UnknownTable,
                location,
                format!("Table not found: {table}"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_collects_and_filters() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid());

        result.push(ValidationErrorKind::UnknownTable, Location::From, "Table not found: x");
        let mut other = ValidationResult::new();
        other.push(ValidationErrorKind::UnknownColumn, Location::Where, "Column not found: y");
        result.merge(other);

        assert!(!result.is_valid());
        assert_eq!(result.len(), 2);
        assert_eq!(result.at(Location::Where).count(), 1);
        assert!(result.has_kind(ValidationErrorKind::UnknownTable));
        assert!(!result.has_kind(ValidationErrorKind::JoinInDelete));
        assert_eq!(result.errors()[0].to_string(), "[FROM] Table not found: x");
    }

    #[test]
    fn location_serializes_uppercase() {
        let error = ValidationError {
            kind: ValidationErrorKind::AmbiguousColumn,
            message: "m".to_string(),
            location: Location::Select,
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            serde_json::json!({ "kind": "ambiguous_column", "message": "m", "location": "SELECT" })
        );
    }

    #[test]
    fn config_builder() {
        let config = ValidationConfig::new()
            .with_required_columns(false)
            .with_ambiguity_check(false);
        assert!(!config.require_not_null_columns);
        assert!(!config.report_ambiguous_columns);
        assert!(ValidationConfig::default().require_not_null_columns);
    }
}
