use super::{ClauseMut, swap_child};
use crate::error::{ModelError, ModelResult};
use crate::expr::{ExprArena, ExprId, ExprParent};
use crate::model::{
    AssignmentDescription, ExpressionDescription, InsertDescription, UpdateDescription,
};
use crate::schema::Schema;
use crate::validate::{Location, Scope, ValidationConfig, ValidationErrorKind, ValidationResult};
use std::collections::HashSet;

/// `column = expr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub column: String,
    pub expr: ExprId,
}

/// Target table plus the column values written to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignments {
    table: String,
    entries: Vec<Assignment>,
}

impl Assignments {
    fn load(
        table: &str,
        descs: &[AssignmentDescription],
        exprs: &mut ExprArena,
    ) -> ModelResult<Self> {
        let mut entries = Vec::with_capacity(descs.len());
        for desc in descs {
            match exprs.load(&desc.expr, ExprParent::Assignment) {
                Ok(expr) => entries.push(Assignment {
                    column: desc.column.clone(),
                    expr,
                }),
                Err(e) => {
                    for entry in entries {
                        exprs.release(entry.expr);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self {
            table: table.to_string(),
            entries,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn entries(&self) -> &[Assignment] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|a| a.column.as_str())
    }

    /// Value expressions in assignment order.
    pub fn values(&self) -> Vec<ExprId> {
        self.entries.iter().map(|a| a.expr).collect()
    }

    pub fn value_for_column(&self, column: &str) -> Option<ExprId> {
        self.entries.iter().find(|a| a.column == column).map(|a| a.expr)
    }

    pub(crate) fn replace_child(&mut self, old: ExprId, new: ExprId) -> ModelResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|a| a.expr == old)
            .ok_or_else(|| ModelError::not_a_child("assignment", old))?;
        entry.expr = new;
        Ok(())
    }

    fn to_model(&self, exprs: &ExprArena) -> ModelResult<Vec<AssignmentDescription>> {
        self.entries
            .iter()
            .map(|a| {
                Ok(AssignmentDescription {
                    column: a.column.clone(),
                    expr: exprs.to_model(a.expr)?,
                })
            })
            .collect()
    }

    /// Checks shared by INSERT and UPDATE; returns whether the table is known.
    fn validate(
        &self,
        exprs: &ExprArena,
        schema: &Schema,
        location: Location,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) -> bool {
        let Some(table) = schema.find_table(&self.table) else {
            result.push(
                ValidationErrorKind::UnknownTable,
                location,
                format!("Table not found: {}", self.table),
            );
            return false;
        };

        let scope = Scope::new(schema).with_table(&self.table);
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !table.has_column(&entry.column) {
                result.push(
                    ValidationErrorKind::UnknownColumn,
                    location,
                    format!("Column not found: {}.{}", self.table, entry.column),
                );
            }
            if !seen.insert(entry.column.as_str()) {
                result.push(
                    ValidationErrorKind::DuplicateAssignment,
                    location,
                    format!("Column {} is assigned more than once", entry.column),
                );
            }
            scope.check_expression(exprs, entry.expr, location, config, result);
        }
        true
    }
}

/// `INSERT INTO t (columns) VALUES (values)`.
///
/// A column of the target table is active when it has an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    assignments: Assignments,
}

impl Insert {
    /// Each column may be assigned at most once; activation is keyed by column.
    pub(crate) fn load(desc: &InsertDescription, exprs: &mut ExprArena) -> ModelResult<Self> {
        let mut seen = HashSet::new();
        if let Some(dup) = desc.assignments.iter().find(|a| !seen.insert(a.column.as_str())) {
            return Err(ModelError::DuplicateInsertColumn(dup.column.clone()));
        }
        Ok(Self {
            assignments: Assignments::load(&desc.table, &desc.assignments, exprs)?,
        })
    }

    pub fn table(&self) -> &str {
        self.assignments.table()
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn is_active(&self, column: &str) -> bool {
        self.assignments.value_for_column(column).is_some()
    }

    pub fn value_for_column(&self, column: &str) -> Option<ExprId> {
        self.assignments.value_for_column(column)
    }

    pub fn values(&self) -> Vec<ExprId> {
        self.assignments.values()
    }

    /// Active columns in table order, then any the schema does not know.
    pub fn active_columns(&self, schema: &Schema) -> Vec<String> {
        let mut columns: Vec<String> = match schema.find_table(self.table()) {
            Some(table) => table
                .columns
                .iter()
                .filter(|c| self.is_active(&c.name))
                .map(|c| c.name.clone())
                .collect(),
            None => Vec::new(),
        };
        for column in self.assignments.columns() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }

    pub fn to_model(&self, exprs: &ExprArena) -> ModelResult<InsertDescription> {
        Ok(InsertDescription {
            table: self.table().to_string(),
            assignments: self.assignments.to_model(exprs)?,
        })
    }

    pub fn to_sql(&self, exprs: &ExprArena) -> ModelResult<String> {
        let columns: Vec<&str> = self.assignments.columns().collect();
        let values = self
            .assignments
            .entries()
            .iter()
            .map(|a| exprs.to_sql(a.expr))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(format!(
            "INSERT INTO {} ({})\nVALUES ({})",
            self.table(),
            columns.join(", "),
            values.join(", ")
        ))
    }

    pub(crate) fn validate(
        &self,
        exprs: &ExprArena,
        schema: &Schema,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        let known = self
            .assignments
            .validate(exprs, schema, Location::Insert, config, result);
        if !known || !config.require_not_null_columns {
            return;
        }
        let Some(table) = schema.find_table(self.table()) else {
            return;
        };
        for column in table.columns.iter().filter(|c| c.requires_value()) {
            if !self.is_active(&column.name) {
                result.push(
                    ValidationErrorKind::MissingRequiredColumn,
                    Location::Insert,
                    format!("Column {}.{} requires a value", table.name, column.name),
                );
            }
        }
    }
}

/// `UPDATE t SET column = value, ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    assignments: Assignments,
}

impl Update {
    pub(crate) fn load(desc: &UpdateDescription, exprs: &mut ExprArena) -> ModelResult<Self> {
        Ok(Self {
            assignments: Assignments::load(&desc.table, &desc.assignments, exprs)?,
        })
    }

    pub fn table(&self) -> &str {
        self.assignments.table()
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn value_for_column(&self, column: &str) -> Option<ExprId> {
        self.assignments.value_for_column(column)
    }

    pub fn to_model(&self, exprs: &ExprArena) -> ModelResult<UpdateDescription> {
        Ok(UpdateDescription {
            table: self.table().to_string(),
            assignments: self.assignments.to_model(exprs)?,
        })
    }

    pub fn to_sql(&self, exprs: &ExprArena) -> ModelResult<String> {
        let sets = self
            .assignments
            .entries()
            .iter()
            .map(|a| Ok(format!("{} = {}", a.column, exprs.to_sql(a.expr)?)))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(format!("UPDATE {}\nSET {}", self.table(), sets.join(", ")))
    }

    pub(crate) fn validate(
        &self,
        exprs: &ExprArena,
        schema: &Schema,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        let known = self
            .assignments
            .validate(exprs, schema, Location::Update, config, result);
        if known && self.assignments.is_empty() {
            result.push(
                ValidationErrorKind::NoAssignments,
                Location::Update,
                format!("UPDATE {} sets no columns", self.table()),
            );
        }
    }
}

/// Swap the value `old` of one of `assignments` for a tree loaded from `desc`.
fn replace_value(
    assignments: &mut Assignments,
    exprs: &mut ExprArena,
    old: ExprId,
    desc: &ExpressionDescription,
) -> ModelResult<ExprId> {
    swap_child(exprs, ExprParent::Assignment, old, desc, |_, new| {
        assignments.replace_child(old, new)
    })
}

impl ClauseMut<'_, Insert> {
    pub fn replace_child(&mut self, old: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        let new = replace_value(&mut self.clause.assignments, self.exprs, old, desc)?;
        self.touch();
        Ok(new)
    }

    /// Reset the value `old` to a placeholder; the column stays active.
    pub fn remove_child(&mut self, old: ExprId) -> ModelResult<ExprId> {
        self.replace_child(old, &ExpressionDescription::missing())
    }

    /// Activate a column with a placeholder value, or deactivate it and drop its value.
    pub fn change_activation_state(&mut self, column: &str, active: bool) -> ModelResult<()> {
        let entries = &mut self.clause.assignments.entries;
        let position = entries.iter().position(|a| a.column == column);
        match (position, active) {
            (Some(_), true) => return Err(ModelError::ColumnAlreadyActive(column.to_string())),
            (None, false) => return Err(ModelError::ColumnAlreadyInactive(column.to_string())),
            (None, true) => {
                let expr = self
                    .exprs
                    .load(&ExpressionDescription::missing(), ExprParent::Assignment)?;
                entries.push(Assignment {
                    column: column.to_string(),
                    expr,
                });
            }
            (Some(index), false) => {
                let removed = entries.remove(index);
                self.exprs.release(removed.expr);
            }
        }
        self.touch();
        Ok(())
    }
}

impl ClauseMut<'_, Update> {
    pub fn replace_child(&mut self, old: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        let new = replace_value(&mut self.clause.assignments, self.exprs, old, desc)?;
        self.touch();
        Ok(new)
    }

    pub fn remove_child(&mut self, old: ExprId) -> ModelResult<ExprId> {
        self.replace_child(old, &ExpressionDescription::missing())
    }

    pub fn append_assignment(
        &mut self,
        column: &str,
        desc: &ExpressionDescription,
    ) -> ModelResult<ExprId> {
        let expr = self.exprs.load(desc, ExprParent::Assignment)?;
        self.clause.assignments.entries.push(Assignment {
            column: column.to_string(),
            expr,
        });
        self.touch();
        Ok(expr)
    }

    /// Drop the assignment of `column` and its value.
    pub fn remove_assignment(&mut self, column: &str) -> ModelResult<()> {
        let entries = &mut self.clause.assignments.entries;
        let index = entries
            .iter()
            .position(|a| a.column == column)
            .ok_or_else(|| ModelError::ColumnNotAssigned(column.to_string()))?;
        let removed = entries.remove(index);
        self.exprs.release(removed.expr);
        self.touch();
        Ok(())
    }
}
