//! Clause components of a statement.
//!
//! Clauses store [`ExprId`](crate::ExprId) handles into the query's expression
//! arena. Read access goes through plain references handed out by
//! [`Query`](crate::Query); edits go through [`ClauseMut`], which borrows the
//! clause together with the arena and the query's dirty flag so that every
//! successful edit marks the query dirty.

mod assign;
mod delete;
mod from;
mod select;
mod where_clause;

#[cfg(test)]
mod tests;

pub use assign::{Assignment, Assignments, Insert, Update};
pub use delete::Delete;
pub use from::{FromClause, Join, JoinKind};
pub use select::{Select, SelectColumn};
pub use where_clause::{Where, WhereFollowing, WhereRemoval};

use crate::error::ModelResult;
use crate::expr::{ExprArena, ExprId, ExprParent};
use crate::model::ExpressionDescription;
use std::ops::Deref;

/// Mutable view of one clause of a query.
pub struct ClauseMut<'q, C> {
    pub(crate) clause: &'q mut C,
    pub(crate) exprs: &'q mut ExprArena,
    pub(crate) dirty: &'q mut bool,
}

impl<'q, C> ClauseMut<'q, C> {
    pub(crate) fn new(clause: &'q mut C, exprs: &'q mut ExprArena, dirty: &'q mut bool) -> Self {
        Self {
            clause,
            exprs,
            dirty,
        }
    }

    /// The expressions of the owning query.
    pub fn exprs(&self) -> &ExprArena {
        self.exprs
    }

    pub(crate) fn touch(&mut self) {
        *self.dirty = true;
    }
}

impl<C> Deref for ClauseMut<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.clause
    }
}

/// Mutable view of the optional WHERE slot of a SELECT or DELETE.
pub type WhereMut<'q> = ClauseMut<'q, Option<Where>>;

/// Load `desc` below `parent`, let `swap` put it where `old` was, then free `old`.
///
/// Fails with [`ModelError::StaleExpression`](crate::ModelError::StaleExpression)
/// if `old` is gone. If `swap` fails the new subtree is released and `old` stays
/// in place.
pub(crate) fn swap_child(
    exprs: &mut ExprArena,
    parent: ExprParent,
    old: ExprId,
    desc: &ExpressionDescription,
    swap: impl FnOnce(&mut ExprArena, ExprId) -> ModelResult<()>,
) -> ModelResult<ExprId> {
    exprs.get(old)?;
    let new = exprs.load(desc, parent)?;
    if let Err(e) = swap(exprs, new) {
        exprs.release(new);
        return Err(e);
    }
    exprs.release(old);
    Ok(new)
}
