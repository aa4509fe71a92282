//! The query facade.
//!
//! A [`Query`] owns one statement, the expression arena its clauses point into
//! and a dirty flag. It is built once from a [`QueryDescription`] and then
//! edited in place; [`Query::to_model`] and [`Query::to_sql`] turn the current
//! state back into the wire form and SQL text.

mod edit;


use crate::clause::{Delete, FromClause, Insert, Select, Update, Where};
use crate::error::{ModelError, ModelResult};
use crate::expr::{ExprArena, ExprId, Expression};
use crate::model::{ExpressionDescription, FromDescription, QueryDescription};
use crate::schema::Schema;
use crate::validate::{ValidationConfig, ValidationResult};
use std::fmt;
use std::sync::Arc;

/// Which statement a query holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Statement {
    Select {
        select: Select,
        from: FromClause,
        where_: Option<Where>,
    },
    Insert(Insert),
    Update(Update),
    Delete {
        delete: Delete,
        from: FromClause,
        where_: Option<Where>,
    },
}

/// A loaded, editable query.
#[derive(Debug, Clone)]
pub struct Query {
    id: String,
    name: String,
    api_version: Option<String>,
    dirty: bool,
    schema: Arc<Schema>,
    exprs: ExprArena,
    statement: Statement,
}

impl Query {
    /// Build the tree for `desc`.
    ///
    /// Exactly one of `select`, `insert`, `update` and `delete` must be present;
    /// SELECT and DELETE also need `from`.
    pub fn load(schema: Arc<Schema>, desc: &QueryDescription) -> ModelResult<Self> {
        let mut exprs = ExprArena::new();
        let statement = match load_statement(desc, &mut exprs) {
            Ok(statement) => statement,
            Err(e) => {
                tracing::debug!(target: "querytree.load", query = %desc.id, error = %e, "load failed");
                return Err(e);
            }
        };

        let query = Self {
            id: desc.id.clone(),
            name: desc.name.clone(),
            api_version: desc.api_version.clone(),
            dirty: false,
            schema,
            exprs,
            statement,
        };
        tracing::debug!(
            target: "querytree.load",
            query = %query.id,
            kind = %query.kind(),
            expressions = query.exprs.len(),
            "loaded query"
        );
        Ok(query)
    }

    pub fn from_json(schema: Arc<Schema>, json: &str) -> ModelResult<Self> {
        Self::load(schema, &QueryDescription::from_json(json)?)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty = true;
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn kind(&self) -> StatementKind {
        match &self.statement {
            Statement::Select { .. } => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete { .. } => StatementKind::Delete,
        }
    }

    /// Whether the query changed since it was loaded or last marked clean.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Called once the current state has been persisted.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn exprs(&self) -> &ExprArena {
        &self.exprs
    }

    pub fn expr(&self, id: ExprId) -> ModelResult<&Expression> {
        self.exprs.get(id)
    }

    pub fn is_expr_complete(&self, id: ExprId) -> bool {
        self.exprs.is_complete(id)
    }

    pub fn expr_sql(&self, id: ExprId) -> ModelResult<String> {
        self.exprs.to_sql(id)
    }

    pub fn expr_model(&self, id: ExprId) -> ModelResult<ExpressionDescription> {
        self.exprs.to_model(id)
    }

    pub fn select(&self) -> Option<&Select> {
        match &self.statement {
            Statement::Select { select, .. } => Some(select),
            _ => None,
        }
    }

    pub fn from_clause(&self) -> Option<&FromClause> {
        match &self.statement {
            Statement::Select { from, .. } | Statement::Delete { from, .. } => Some(from),
            _ => None,
        }
    }

    pub fn where_clause(&self) -> Option<&Where> {
        match &self.statement {
            Statement::Select { where_, .. } | Statement::Delete { where_, .. } => where_.as_ref(),
            _ => None,
        }
    }

    pub fn insert(&self) -> Option<&Insert> {
        match &self.statement {
            Statement::Insert(insert) => Some(insert),
            _ => None,
        }
    }

    pub fn update(&self) -> Option<&Update> {
        match &self.statement {
            Statement::Update(update) => Some(update),
            _ => None,
        }
    }

    pub fn delete(&self) -> Option<&Delete> {
        match &self.statement {
            Statement::Delete { delete, .. } => Some(delete),
            _ => None,
        }
    }

    /// Every root expression held by a clause, in print order.
    pub fn root_expressions(&self) -> Vec<ExprId> {
        match &self.statement {
            Statement::Select {
                select,
                from,
                where_,
            } => select
                .expressions()
                .chain(from.expressions())
                .chain(where_.iter().flat_map(Where::expressions))
                .collect(),
            Statement::Delete { from, where_, .. } => from
                .expressions()
                .chain(where_.iter().flat_map(Where::expressions))
                .collect(),
            Statement::Insert(insert) => insert.values(),
            Statement::Update(update) => update.assignments().values(),
        }
    }

    /// `true` when no expression of the query is a placeholder.
    pub fn is_complete(&self) -> bool {
        self.root_expressions()
            .into_iter()
            .all(|id| self.exprs.is_complete(id))
    }

    /// Rebuild the wire description of the current state.
    pub fn to_model(&self) -> ModelResult<QueryDescription> {
        let mut desc = QueryDescription {
            id: self.id.clone(),
            name: self.name.clone(),
            api_version: self.api_version.clone(),
            ..QueryDescription::default()
        };
        match &self.statement {
            Statement::Select {
                select,
                from,
                where_,
            } => {
                desc.select = Some(select.to_model(&self.exprs)?);
                desc.from = Some(from.to_model(&self.exprs)?);
                desc.where_ = where_.as_ref().map(|w| w.to_model(&self.exprs)).transpose()?;
            }
            Statement::Insert(insert) => desc.insert = Some(insert.to_model(&self.exprs)?),
            Statement::Update(update) => desc.update = Some(update.to_model(&self.exprs)?),
            Statement::Delete {
                delete,
                from,
                where_,
            } => {
                desc.delete = Some(delete.to_model());
                desc.from = Some(from.to_model(&self.exprs)?);
                desc.where_ = where_.as_ref().map(|w| w.to_model(&self.exprs)).transpose()?;
            }
        }
        Ok(desc)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        self.to_model()?.to_json()
    }

    /// Render the statement as SQL text, one clause per line.
    pub fn to_sql(&self) -> ModelResult<String> {
        let mut parts = Vec::with_capacity(3);
        match &self.statement {
            Statement::Select {
                select,
                from,
                where_,
            } => {
                parts.push(select.to_sql(&self.exprs)?);
                parts.push(from.to_sql(&self.exprs)?);
                if let Some(w) = where_ {
                    parts.push(w.to_sql(&self.exprs)?);
                }
            }
            Statement::Insert(insert) => parts.push(insert.to_sql(&self.exprs)?),
            Statement::Update(update) => parts.push(update.to_sql(&self.exprs)?),
            Statement::Delete {
                delete,
                from,
                where_,
            } => {
                parts.push(delete.to_sql().to_string());
                parts.push(from.to_sql(&self.exprs)?);
                if let Some(w) = where_ {
                    parts.push(w.to_sql(&self.exprs)?);
                }
            }
        }
        Ok(parts.join("\n"))
    }

    /// Check the query against its schema with the default checks.
    pub fn validate(&self) -> ValidationResult {
        self.validate_with(&ValidationConfig::default())
    }

    pub fn validate_with(&self, config: &ValidationConfig) -> ValidationResult {
        let mut result = ValidationResult::new();
        let schema = &*self.schema;
        match &self.statement {
            Statement::Select {
                select,
                from,
                where_,
            } => {
                let scope = from.scope(schema);
                select.validate(&self.exprs, &scope, config, &mut result);
                from.validate(&self.exprs, schema, &scope, config, &mut result);
                if let Some(w) = where_ {
                    w.validate(&self.exprs, &scope, config, &mut result);
                }
            }
            Statement::Insert(insert) => insert.validate(&self.exprs, schema, config, &mut result),
            Statement::Update(update) => update.validate(&self.exprs, schema, config, &mut result),
            Statement::Delete {
                delete,
                from,
                where_,
            } => {
                let scope = from.scope(schema);
                delete.validate(from, &mut result);
                from.validate(&self.exprs, schema, &scope, config, &mut result);
                if let Some(w) = where_ {
                    w.validate(&self.exprs, &scope, config, &mut result);
                }
            }
        }
        tracing::debug!(
            target: "querytree.validate",
            query = %self.id,
            errors = result.len(),
            "validated query"
        );
        result
    }
}

fn load_statement(desc: &QueryDescription, exprs: &mut ExprArena) -> ModelResult<Statement> {
    match (&desc.select, &desc.insert, &desc.update, &desc.delete) {
        (Some(select), None, None, None) => {
            let from = required_from(desc, "SELECT")?;
            Ok(Statement::Select {
                select: Select::load(select, exprs)?,
                from: FromClause::load(from, exprs)?,
                where_: desc.where_.as_ref().map(|w| Where::load(w, exprs)).transpose()?,
            })
        }
        (None, None, None, Some(_)) => {
            let from = required_from(desc, "DELETE")?;
            Ok(Statement::Delete {
                delete: Delete,
                from: FromClause::load(from, exprs)?,
                where_: desc.where_.as_ref().map(|w| Where::load(w, exprs)).transpose()?,
            })
        }
        (None, Some(insert), None, None) => {
            warn_ignored_clauses(desc, StatementKind::Insert);
            Ok(Statement::Insert(Insert::load(insert, exprs)?))
        }
        (None, None, Some(update), None) => {
            warn_ignored_clauses(desc, StatementKind::Update);
            Ok(Statement::Update(Update::load(update, exprs)?))
        }
        (None, None, None, None) => Err(ModelError::missing_clause(
            "expected one of select, insert, update or delete",
        )),
        _ => {
            let found: Vec<&str> = [
                ("select", desc.select.is_some()),
                ("insert", desc.insert.is_some()),
                ("update", desc.update.is_some()),
                ("delete", desc.delete.is_some()),
            ]
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect();
            Err(ModelError::missing_clause(format!(
                "expected exactly one statement, found {}",
                found.join(", ")
            )))
        }
    }
}

fn required_from<'d>(
    desc: &'d QueryDescription,
    kind: &str,
) -> ModelResult<&'d FromDescription> {
    desc.from
        .as_ref()
        .ok_or_else(|| ModelError::missing_clause(format!("{kind} requires a from clause")))
}

fn warn_ignored_clauses(desc: &QueryDescription, kind: StatementKind) {
    if desc.from.is_some() || desc.where_.is_some() {
        tracing::warn!(
            target: "querytree.load",
            query = %desc.id,
            "ignoring from/where given with {kind}"
        );
    }
}
