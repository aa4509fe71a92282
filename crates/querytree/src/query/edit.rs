//! Mutations of a loaded query.

use super::{Query, Statement, StatementKind};
use crate::clause::{ClauseMut, FromClause, Insert, Select, Update, WhereMut, swap_child};
use crate::error::{ModelError, ModelResult};
use crate::expr::{ColumnRef, ExprId, ExprParent, Expression, is_valid_parameter_key};
use crate::model::{ColumnDescription, ConstantType, ExpressionDescription, WhereDescription};

/// Log the outcome of an edit addressed to `id`.
fn traced<T>(op: &'static str, id: ExprId, result: ModelResult<T>) -> ModelResult<T> {
    match &result {
        Ok(_) => tracing::debug!(target: "querytree.edit", op, expr = %id, "applied edit"),
        Err(e) if e.is_contract_violation() => {
            tracing::warn!(target: "querytree.edit", op, expr = %id, error = %e, "rejected edit");
        }
        Err(e) => tracing::debug!(target: "querytree.edit", op, expr = %id, error = %e, "edit failed"),
    }
    result
}

impl Query {
    pub fn select_mut(&mut self) -> ModelResult<ClauseMut<'_, Select>> {
        match &mut self.statement {
            Statement::Select { select, .. } => {
                Ok(ClauseMut::new(select, &mut self.exprs, &mut self.dirty))
            }
            _ => Err(ModelError::ClauseNotPresent("SELECT")),
        }
    }

    pub fn from_mut(&mut self) -> ModelResult<ClauseMut<'_, FromClause>> {
        match &mut self.statement {
            Statement::Select { from, .. } | Statement::Delete { from, .. } => {
                Ok(ClauseMut::new(from, &mut self.exprs, &mut self.dirty))
            }
            _ => Err(ModelError::ClauseNotPresent("FROM")),
        }
    }

    /// The WHERE slot of a SELECT or DELETE, present or not.
    pub fn where_mut(&mut self) -> ModelResult<WhereMut<'_>> {
        match &mut self.statement {
            Statement::Select { where_, .. } | Statement::Delete { where_, .. } => {
                Ok(ClauseMut::new(where_, &mut self.exprs, &mut self.dirty))
            }
            _ => Err(ModelError::ClauseNotPresent("WHERE")),
        }
    }

    pub fn insert_mut(&mut self) -> ModelResult<ClauseMut<'_, Insert>> {
        match &mut self.statement {
            Statement::Insert(insert) => {
                Ok(ClauseMut::new(insert, &mut self.exprs, &mut self.dirty))
            }
            _ => Err(ModelError::ClauseNotPresent("INSERT")),
        }
    }

    pub fn update_mut(&mut self) -> ModelResult<ClauseMut<'_, Update>> {
        match &mut self.statement {
            Statement::Update(update) => {
                Ok(ClauseMut::new(update, &mut self.exprs, &mut self.dirty))
            }
            _ => Err(ModelError::ClauseNotPresent("UPDATE")),
        }
    }

    /// Install `desc` as the WHERE clause, replacing any current one.
    pub fn set_where(&mut self, desc: &WhereDescription) -> ModelResult<()> {
        self.where_mut()?.set(desc)
    }

    pub fn parent_of(&self, id: ExprId) -> ModelResult<ExprParent> {
        self.exprs.parent_of(id)
    }

    /// Replace expression `id` with a tree built from `desc`, wherever it sits.
    ///
    /// Returns the handle of the new tree; `id` and its subtree become stale.
    pub fn replace_expr(&mut self, id: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        let result = self.replace_expr_inner(id, desc);
        traced("replace_expr", id, result)
    }

    fn replace_expr_inner(&mut self, id: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        match self.exprs.parent_of(id)? {
            ExprParent::Expr(parent) => self.replace_operand(parent, id, desc),
            ExprParent::Select => self.select_mut()?.replace_child(id, desc),
            ExprParent::Join => self.from_mut()?.replace_child(id, desc),
            ExprParent::Where => self.where_mut()?.replace_child(id, desc),
            ExprParent::Assignment => match self.kind() {
                StatementKind::Insert => self.insert_mut()?.replace_child(id, desc),
                _ => self.update_mut()?.replace_child(id, desc),
            },
        }
    }

    /// Remove expression `id`; what that means is up to its parent.
    ///
    /// Operands, join conditions and assigned values become `Missing`. WHERE
    /// conditions are dropped, taking the clause with them when it was the
    /// last one. Projected SELECT columns can not be removed this way.
    pub fn remove_expr(&mut self, id: ExprId) -> ModelResult<()> {
        let result = self.remove_expr_inner(id);
        traced("remove_expr", id, result)
    }

    fn remove_expr_inner(&mut self, id: ExprId) -> ModelResult<()> {
        let missing = ExpressionDescription::missing();
        match self.exprs.parent_of(id)? {
            ExprParent::Expr(parent) => self.replace_operand(parent, id, &missing).map(drop),
            ExprParent::Select => self.select_mut()?.remove_child(id),
            ExprParent::Join => self.from_mut()?.remove_child(id).map(drop),
            ExprParent::Where => self.where_mut()?.remove_child(id).map(drop),
            ExprParent::Assignment => match self.kind() {
                StatementKind::Insert => self.insert_mut()?.remove_child(id).map(drop),
                _ => self.update_mut()?.remove_child(id).map(drop),
            },
        }
    }

    /// Replace operand `old` of expression `parent`.
    pub fn replace_child(
        &mut self,
        parent: ExprId,
        old: ExprId,
        desc: &ExpressionDescription,
    ) -> ModelResult<ExprId> {
        let result = self.replace_operand(parent, old, desc);
        traced("replace_child", old, result)
    }

    /// Reset operand `old` of expression `parent` to `Missing`.
    pub fn remove_child(&mut self, parent: ExprId, old: ExprId) -> ModelResult<ExprId> {
        let result = self.replace_operand(parent, old, &ExpressionDescription::missing());
        traced("remove_child", old, result)
    }

    fn replace_operand(
        &mut self,
        parent: ExprId,
        old: ExprId,
        desc: &ExpressionDescription,
    ) -> ModelResult<ExprId> {
        self.exprs.check_operand(parent, old)?;
        let new = swap_child(
            &mut self.exprs,
            ExprParent::Expr(parent),
            old,
            desc,
            |exprs, new| exprs.replace_operand(parent, old, new),
        )?;
        self.dirty = true;
        Ok(new)
    }

    pub fn set_parameter_key(&mut self, id: ExprId, key: &str) -> ModelResult<()> {
        let result = self.edit_node(id, |expr| match expr {
            Expression::Parameter { key: current } => {
                if !is_valid_parameter_key(key) {
                    return Err(ModelError::InvalidParameterKey(key.to_string()));
                }
                *current = key.to_string();
                Ok(())
            }
            other => Err(wrong_kind("Parameter", other)),
        });
        traced("set_parameter_key", id, result)
    }

    pub fn set_constant(&mut self, id: ExprId, ty: ConstantType, value: &str) -> ModelResult<()> {
        let result = self.edit_node(id, |expr| match expr {
            Expression::Constant {
                ty: current_ty,
                value: current,
            } => {
                *current_ty = ty;
                *current = value.to_string();
                Ok(())
            }
            other => Err(wrong_kind("Constant", other)),
        });
        traced("set_constant", id, result)
    }

    pub fn set_binary_operator(&mut self, id: ExprId, operator: &str) -> ModelResult<()> {
        let result = self.edit_node(id, |expr| match expr {
            Expression::Binary {
                operator: current, ..
            } => {
                *current = operator.to_string();
                Ok(())
            }
            other => Err(wrong_kind("Binary", other)),
        });
        traced("set_binary_operator", id, result)
    }

    /// Point a column expression at another column.
    pub fn set_column_reference(&mut self, id: ExprId, column: &ColumnDescription) -> ModelResult<()> {
        let result = self.edit_node(id, |expr| match expr {
            Expression::Column(current) => {
                *current = ColumnRef {
                    column: column.column.clone(),
                    table: column.table.clone(),
                    alias: column.alias.clone(),
                };
                Ok(())
            }
            other => Err(wrong_kind("Column", other)),
        });
        traced("set_column_reference", id, result)
    }

    fn edit_node(
        &mut self,
        id: ExprId,
        edit: impl FnOnce(&mut Expression) -> ModelResult<()>,
    ) -> ModelResult<()> {
        edit(self.exprs.get_mut(id)?)?;
        self.dirty = true;
        Ok(())
    }
}

fn wrong_kind(expected: &'static str, found: &Expression) -> ModelError {
    ModelError::WrongExpressionKind {
        expected,
        found: found.kind_name(),
    }
}
