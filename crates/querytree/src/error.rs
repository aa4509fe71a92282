//! Error types for querytree

use crate::expr::ExprId;
use thiserror::Error;

/// Result type alias for query model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by loading, editing and rendering a query.
///
/// Schema diagnostics are not reported through this type; see
/// [`ValidationResult`](crate::ValidationResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The description carries none or several of `select|insert|update|delete`,
    /// or lacks a clause the statement requires.
    #[error("Missing statement clause: {0}")]
    MissingStatementClause(String),

    /// An expression description with none or several populated kinds.
    #[error("Unknown expression kind: {0}")]
    UnknownExpressionKind(String),

    /// A join description that is neither exactly cross nor exactly inner.
    #[error("Invalid join: {0}")]
    InvalidJoinSpec(String),

    /// Parameter keys must match `^[a-zA-Z][a-zA-Z0-9_]*$`.
    #[error("Invalid parameter key: {0:?}")]
    InvalidParameterKey(String),

    /// An INSERT description assigns the same column twice.
    #[error("Duplicate INSERT column: {0}")]
    DuplicateInsertColumn(String),

    /// Malformed JSON input.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The expression is not held by the addressed parent.
    #[error("Expression {child} is not a child of {parent}")]
    NotAChild { parent: String, child: ExprId },

    /// Child edits addressed to a leaf expression.
    #[error("{0} expressions have no children")]
    LeafHasNoChildren(&'static str),

    #[error("Column already active: {0}")]
    ColumnAlreadyActive(String),

    #[error("Column already inactive: {0}")]
    ColumnAlreadyInactive(String),

    /// UPDATE edit addressed to a column the statement does not set.
    #[error("Column not assigned: {0}")]
    ColumnNotAssigned(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// The handle refers to an expression that was replaced or removed.
    #[error("Stale expression handle: {0}")]
    StaleExpression(ExprId),

    /// A kind-specific edit addressed to an expression of another kind.
    #[error("Expected a {expected} expression, found {found}")]
    WrongExpressionKind {
        expected: &'static str,
        found: &'static str,
    },

    /// The statement has no clause of the requested kind.
    #[error("Query has no {0} clause")]
    ClauseNotPresent(&'static str),

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// SQL text requested while a `Missing` placeholder is still present.
    #[error("Expression is incomplete")]
    IncompleteExpression,

    /// SQL text requested for a SELECT without any column.
    #[error("SELECT has no columns")]
    EmptySelect,
}

impl ModelError {
    pub fn missing_clause(message: impl Into<String>) -> Self {
        Self::MissingStatementClause(message.into())
    }

    pub fn invalid_join(message: impl Into<String>) -> Self {
        Self::InvalidJoinSpec(message.into())
    }

    pub fn not_a_child(parent: impl Into<String>, child: ExprId) -> Self {
        Self::NotAChild {
            parent: parent.into(),
            child,
        }
    }

    pub fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }

    /// Raised while turning a description into a tree; no query is returned.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::MissingStatementClause(_)
                | Self::UnknownExpressionKind(_)
                | Self::InvalidJoinSpec(_)
                | Self::InvalidParameterKey(_)
                | Self::DuplicateInsertColumn(_)
                | Self::Serialization(_)
        )
    }

    /// Raised by an edit that breaks the calling contract (a UI bug, not user input).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NotAChild { .. }
                | Self::LeafHasNoChildren(_)
                | Self::ColumnAlreadyActive(_)
                | Self::ColumnAlreadyInactive(_)
                | Self::ColumnNotAssigned(_)
                | Self::NotImplemented(_)
                | Self::StaleExpression(_)
                | Self::WrongExpressionKind { .. }
                | Self::ClauseNotPresent(_)
                | Self::IndexOutOfRange { .. }
        )
    }

    /// The tree is well formed but not yet specified enough to print as SQL.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::IncompleteExpression | Self::EmptySelect)
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
