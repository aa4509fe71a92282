//! Value expressions.
//!
//! Expressions of a query live in an [`ExprArena`] owned by the query and are
//! addressed by [`ExprId`]. Every node records its [`ExprParent`], which is how a
//! node asks its holder to replace or remove it. Slots of replaced or removed
//! nodes are recycled under a new generation, so using an old handle afterwards
//! fails with [`ModelError::StaleExpression`](crate::ModelError::StaleExpression).

mod arena;

#[cfg(test)]
mod tests;

pub use arena::ExprArena;

use crate::model::{ConstantType, TableNameDefinition};
use std::fmt;

/// Handle of an expression node inside its query.
///
/// The generation tells apart successive nodes stored in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// The component that currently holds an expression.
///
/// Clause-level parents locate the child among their slots by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprParent {
    /// Operand of a binary expression.
    Expr(ExprId),
    /// A projected column of the SELECT clause.
    Select,
    /// The ON condition of an inner join.
    Join,
    /// The first or a following condition of the WHERE clause.
    Where,
    /// The value of an INSERT or UPDATE assignment.
    Assignment,
}

impl fmt::Display for ExprParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(id) => write!(f, "expression {id}"),
            Self::Select => f.write_str("SELECT"),
            Self::Join => f.write_str("JOIN"),
            Self::Where => f.write_str("WHERE"),
            Self::Assignment => f.write_str("assignment"),
        }
    }
}

/// Reference to a single column, optionally qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub column: String,
    pub table: Option<String>,
    pub alias: Option<String>,
}

impl ColumnRef {
    /// Qualifier used when printing: alias first, then table name.
    pub fn qualifier(&self) -> Option<&str> {
        self.alias.as_deref().or(self.table.as_deref())
    }
}

/// One node of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant {
        ty: ConstantType,
        value: String,
    },
    Column(ColumnRef),
    Star {
        limited_to: Option<TableNameDefinition>,
    },
    Parameter {
        key: String,
    },
    Binary {
        lhs: ExprId,
        operator: String,
        rhs: ExprId,
        simple: bool,
    },
    /// Placeholder waiting for user input.
    Missing,
}

impl Expression {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Constant { .. } => "Constant",
            Self::Column(_) => "Column",
            Self::Star { .. } => "Star",
            Self::Parameter { .. } => "Parameter",
            Self::Binary { .. } => "Binary",
            Self::Missing => "Missing",
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, Self::Binary { .. })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Parameter keys must match `^[a-zA-Z][a-zA-Z0-9_]*$`.
pub fn is_valid_parameter_key(key: &str) -> bool {
    static KEY_RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    KEY_RE
        .get_or_init(|| {
            regex::Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$").expect("invalid built-in parameter key regex")
        })
        .is_match(key)
}
