use super::{ClauseMut, swap_child};
use crate::error::{ModelError, ModelResult};
use crate::expr::{ExprArena, ExprId, ExprParent};
use crate::model::{
    CrossJoinStyle, ExpressionDescription, FromDescription, InnerJoinDescription, JoinDescription,
    TableNameDefinition,
};
use crate::schema::Schema;
use crate::validate::{Location, Scope, ValidationConfig, ValidationErrorKind, ValidationResult};
use std::collections::HashSet;

/// How a joined table is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinKind {
    /// Cartesian product, written `JOIN t` or `, t`.
    Cross { via_comma: bool },
    /// `INNER JOIN t ON(expr)`.
    InnerOn(ExprId),
    /// `INNER JOIN t USING(column)`.
    InnerUsing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: TableNameDefinition,
    pub kind: JoinKind,
}

impl Join {
    pub(crate) fn load(desc: &JoinDescription, exprs: &mut ExprArena) -> ModelResult<Self> {
        let kind = match (&desc.cross, &desc.inner) {
            (Some(style), None) => JoinKind::Cross {
                via_comma: *style == CrossJoinStyle::Comma,
            },
            (None, Some(inner)) => match (&inner.on, &inner.using) {
                (Some(on), None) => JoinKind::InnerOn(exprs.load(on, ExprParent::Join)?),
                (None, Some(using)) => JoinKind::InnerUsing(using.clone()),
                (Some(_), Some(_)) => {
                    return Err(ModelError::invalid_join(format!(
                        "inner join on {} has both ON and USING",
                        desc.table.name
                    )));
                }
                (None, None) => {
                    return Err(ModelError::invalid_join(format!(
                        "inner join on {} has neither ON nor USING",
                        desc.table.name
                    )));
                }
            },
            (Some(_), Some(_)) => {
                return Err(ModelError::invalid_join(format!(
                    "join on {} is both cross and inner",
                    desc.table.name
                )));
            }
            (None, None) => {
                return Err(ModelError::invalid_join(format!(
                    "join on {} has no type",
                    desc.table.name
                )));
            }
        };
        Ok(Self {
            table: desc.table.clone(),
            kind,
        })
    }

    pub fn on(&self) -> Option<ExprId> {
        match self.kind {
            JoinKind::InnerOn(id) => Some(id),
            _ => None,
        }
    }

    pub fn to_model(&self, exprs: &ExprArena) -> ModelResult<JoinDescription> {
        let mut desc = JoinDescription {
            table: self.table.clone(),
            cross: None,
            inner: None,
        };
        match &self.kind {
            JoinKind::Cross { via_comma } => {
                desc.cross = Some(if *via_comma {
                    CrossJoinStyle::Comma
                } else {
                    CrossJoinStyle::Cross
                });
            }
            JoinKind::InnerOn(on) => {
                desc.inner = Some(InnerJoinDescription {
                    on: Some(exprs.to_model(*on)?),
                    using: None,
                });
            }
            JoinKind::InnerUsing(column) => {
                desc.inner = Some(InnerJoinDescription {
                    on: None,
                    using: Some(column.clone()),
                });
            }
        }
        Ok(desc)
    }

    pub fn to_sql(&self, exprs: &ExprArena) -> ModelResult<String> {
        let table = table_sql(&self.table);
        Ok(match &self.kind {
            JoinKind::Cross { via_comma: true } => format!(", {table}"),
            JoinKind::Cross { via_comma: false } => format!("JOIN {table}"),
            JoinKind::InnerOn(on) => format!("INNER JOIN {table} ON({})", exprs.to_sql(*on)?),
            JoinKind::InnerUsing(column) => format!("INNER JOIN {table} USING({column})"),
        })
    }
}

/// `name` or `name alias`.
pub(crate) fn table_sql(table: &TableNameDefinition) -> String {
    match &table.alias {
        Some(alias) => format!("{} {alias}", table.name),
        None => table.name.clone(),
    }
}

/// The table list of a SELECT or DELETE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromClause {
    first: TableNameDefinition,
    joins: Vec<Join>,
}

impl FromClause {
    pub(crate) fn load(desc: &FromDescription, exprs: &mut ExprArena) -> ModelResult<Self> {
        let joins = desc
            .joins
            .iter()
            .map(|j| Join::load(j, exprs))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(Self {
            first: desc.first.clone(),
            joins,
        })
    }

    pub fn first(&self) -> &TableNameDefinition {
        &self.first
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn number_of_joins(&self) -> usize {
        self.joins.len()
    }

    pub fn join(&self, index: usize) -> ModelResult<&Join> {
        self.joins
            .get(index)
            .ok_or_else(|| ModelError::out_of_range("join", index, self.joins.len()))
    }

    /// The first table followed by every joined table.
    pub fn tables(&self) -> impl Iterator<Item = &TableNameDefinition> {
        std::iter::once(&self.first).chain(self.joins.iter().map(|j| &j.table))
    }

    pub(crate) fn expressions(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.joins.iter().filter_map(Join::on)
    }

    pub(crate) fn replace_child(&mut self, old: ExprId, new: ExprId) -> ModelResult<()> {
        let join = self
            .joins
            .iter_mut()
            .find(|j| j.on() == Some(old))
            .ok_or_else(|| ModelError::not_a_child("JOIN", old))?;
        join.kind = JoinKind::InnerOn(new);
        Ok(())
    }

    pub fn to_model(&self, exprs: &ExprArena) -> ModelResult<FromDescription> {
        Ok(FromDescription {
            first: self.first.clone(),
            joins: self
                .joins
                .iter()
                .map(|j| j.to_model(exprs))
                .collect::<ModelResult<Vec<_>>>()?,
        })
    }

    pub fn to_sql(&self, exprs: &ExprArena) -> ModelResult<String> {
        let mut sql = format!("FROM {}", table_sql(&self.first));
        for join in &self.joins {
            sql.push_str("\n\t");
            sql.push_str(&join.to_sql(exprs)?);
        }
        Ok(sql)
    }

    /// Tables visible to the expressions of the statement.
    pub(crate) fn scope<'s>(&self, schema: &'s Schema) -> Scope<'s> {
        let mut scope = Scope::new(schema);
        for table in self.tables() {
            scope.push(table);
        }
        scope
    }

    pub(crate) fn validate(
        &self,
        exprs: &ExprArena,
        schema: &Schema,
        scope: &Scope<'_>,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        let mut names = HashSet::new();
        let mut aliases = HashSet::new();

        for table in self.tables() {
            if !schema.has_table(&table.name) {
                result.push(
                    ValidationErrorKind::UnknownTable,
                    Location::From,
                    format!("Table not found: {}", table.name),
                );
            }
            match &table.alias {
                Some(alias) => {
                    if !aliases.insert(alias.as_str()) {
                        result.push(
                            ValidationErrorKind::DuplicateAlias,
                            Location::From,
                            format!("Alias {alias} is used more than once"),
                        );
                    }
                }
                None => {
                    if !names.insert(table.name.as_str()) {
                        result.push(
                            ValidationErrorKind::MissingSelfJoinAlias,
                            Location::From,
                            format!("Table {} is joined to itself without an alias", table.name),
                        );
                    }
                }
            }
        }

        for join in &self.joins {
            match &join.kind {
                JoinKind::InnerOn(on) => {
                    scope.check_expression(exprs, *on, Location::From, config, result);
                }
                JoinKind::InnerUsing(column) => {
                    let known = schema.find_table(&join.table.name);
                    if known.is_some_and(|t| !t.has_column(column)) {
                        result.push(
                            ValidationErrorKind::UnknownColumn,
                            Location::From,
                            format!("Column not found: {}.{column}", join.table.name),
                        );
                    }
                }
                JoinKind::Cross { .. } => {}
            }
        }
    }
}

impl ClauseMut<'_, FromClause> {
    pub fn add_join(&mut self, desc: &JoinDescription) -> ModelResult<()> {
        let join = Join::load(desc, self.exprs)?;
        self.clause.joins.push(join);
        self.touch();
        Ok(())
    }

    /// Drop the join at `index` together with its ON condition.
    pub fn remove_join(&mut self, index: usize) -> ModelResult<()> {
        let len = self.clause.joins.len();
        if index >= len {
            return Err(ModelError::out_of_range("join", index, len));
        }
        let join = self.clause.joins.remove(index);
        if let Some(on) = join.on() {
            self.exprs.release(on);
        }
        self.touch();
        Ok(())
    }

    pub fn set_first(&mut self, table: TableNameDefinition) {
        self.clause.first = table;
        self.touch();
    }

    pub fn replace_child(&mut self, old: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        let from = &mut *self.clause;
        let new = swap_child(self.exprs, ExprParent::Join, old, desc, |_, new| {
            from.replace_child(old, new)
        })?;
        self.touch();
        Ok(new)
    }

    /// Clear the ON condition holding `old` back to a placeholder.
    pub fn remove_child(&mut self, old: ExprId) -> ModelResult<ExprId> {
        self.replace_child(old, &ExpressionDescription::missing())
    }
}
