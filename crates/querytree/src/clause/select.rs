use super::{ClauseMut, swap_child};
use crate::error::{ModelError, ModelResult};
use crate::expr::{ExprArena, ExprId, ExprParent};
use crate::model::{ExpressionDescription, SelectColumnDescription, SelectDescription};
use crate::validate::{Location, Scope, ValidationConfig, ValidationResult};

/// One projected expression, optionally renamed with `AS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub expr: ExprId,
    pub alias: Option<String>,
}

/// The projection list of a SELECT statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    columns: Vec<SelectColumn>,
    all_data: bool,
}

impl Select {
    pub(crate) fn load(desc: &SelectDescription, exprs: &mut ExprArena) -> ModelResult<Self> {
        let mut columns = Vec::with_capacity(desc.columns.len());
        for column in &desc.columns {
            columns.push(SelectColumn {
                expr: exprs.load(&column.expr, ExprParent::Select)?,
                alias: column.alias.clone(),
            });
        }
        Ok(Self {
            columns,
            all_data: desc.all_data,
        })
    }

    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    pub fn number_of_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether a leading `*` is printed.
    pub fn all_data(&self) -> bool {
        self.all_data
    }

    pub fn column(&self, index: usize) -> ModelResult<&SelectColumn> {
        self.columns
            .get(index)
            .ok_or_else(|| ModelError::out_of_range("SELECT column", index, self.columns.len()))
    }

    pub(crate) fn expressions(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.columns.iter().map(|c| c.expr)
    }

    pub(crate) fn replace_child(&mut self, old: ExprId, new: ExprId) -> ModelResult<()> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.expr == old)
            .ok_or_else(|| ModelError::not_a_child("SELECT", old))?;
        column.expr = new;
        Ok(())
    }

    pub fn to_model(&self, exprs: &ExprArena) -> ModelResult<SelectDescription> {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Ok(SelectColumnDescription {
                    expr: exprs.to_model(c.expr)?,
                    alias: c.alias.clone(),
                })
            })
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(SelectDescription {
            columns,
            all_data: self.all_data,
        })
    }

    pub fn to_sql(&self, exprs: &ExprArena) -> ModelResult<String> {
        if self.columns.is_empty() && !self.all_data {
            return Err(ModelError::EmptySelect);
        }

        let mut items = Vec::with_capacity(self.columns.len() + 1);
        if self.all_data {
            items.push("*".to_string());
        }
        for column in &self.columns {
            let sql = exprs.to_sql(column.expr)?;
            items.push(match &column.alias {
                Some(alias) => format!("{sql} AS {alias}"),
                None => sql,
            });
        }
        Ok(format!("SELECT {}", items.join(", ")))
    }

    pub(crate) fn validate(
        &self,
        exprs: &ExprArena,
        scope: &Scope<'_>,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        for column in &self.columns {
            scope.check_expression(exprs, column.expr, Location::Select, config, result);
        }
    }
}

impl ClauseMut<'_, Select> {
    /// Append `table.column` as a new projected column.
    pub fn append_column(
        &mut self,
        table: &str,
        column: &str,
        alias: Option<&str>,
    ) -> ModelResult<ExprId> {
        self.append_expression(&ExpressionDescription::column(table, column), alias)
    }

    pub fn append_expression(
        &mut self,
        desc: &ExpressionDescription,
        alias: Option<&str>,
    ) -> ModelResult<ExprId> {
        let expr = self.exprs.load(desc, ExprParent::Select)?;
        self.clause.columns.push(SelectColumn {
            expr,
            alias: alias.map(str::to_string),
        });
        self.touch();
        Ok(expr)
    }

    pub fn set_all_data(&mut self, all_data: bool) {
        self.clause.all_data = all_data;
        self.touch();
    }

    pub fn set_alias(&mut self, index: usize, alias: Option<&str>) -> ModelResult<()> {
        let len = self.clause.columns.len();
        let column = self
            .clause
            .columns
            .get_mut(index)
            .ok_or_else(|| ModelError::out_of_range("SELECT column", index, len))?;
        column.alias = alias.map(str::to_string);
        self.touch();
        Ok(())
    }

    pub fn replace_child(&mut self, old: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        let select = &mut *self.clause;
        let new = swap_child(self.exprs, ExprParent::Select, old, desc, |_, new| {
            select.replace_child(old, new)
        })?;
        self.touch();
        Ok(new)
    }

    /// Projected columns can not be removed through the expression tree.
    pub fn remove_child(&mut self, _old: ExprId) -> ModelResult<()> {
        Err(ModelError::NotImplemented("removing a SELECT column"))
    }
}
