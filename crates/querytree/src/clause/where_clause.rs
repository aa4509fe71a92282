use super::{WhereMut, swap_child};
use crate::error::{ModelError, ModelResult};
use crate::expr::{ExprArena, ExprId, ExprParent};
use crate::model::{
    ExpressionDescription, LogicalOperator, WhereDescription, WhereFollowingDescription,
};
use crate::validate::{Location, Scope, ValidationConfig, ValidationResult};

/// A condition chained to the previous ones with `AND` or `OR`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereFollowing {
    pub logic: LogicalOperator,
    pub expr: ExprId,
}

/// A condition list: one leading expression and any number of chained ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Where {
    first: ExprId,
    following: Vec<WhereFollowing>,
}

/// What removing a condition did to the clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereRemoval {
    /// A following condition was dropped.
    Removed,
    /// The leading condition was dropped and the next one took its place.
    Promoted,
    /// The only condition was dropped, so the clause is gone.
    Eliminated,
}

impl Where {
    /// Builds the clause, releasing everything already loaded if a condition fails.
    pub(crate) fn load(desc: &WhereDescription, exprs: &mut ExprArena) -> ModelResult<Self> {
        let first = exprs.load(&desc.first, ExprParent::Where)?;
        let mut clause = Self {
            first,
            following: Vec::with_capacity(desc.following.len()),
        };
        for f in &desc.following {
            match exprs.load(&f.expr, ExprParent::Where) {
                Ok(expr) => clause.following.push(WhereFollowing {
                    logic: f.logic,
                    expr,
                }),
                Err(e) => {
                    clause.release(exprs);
                    return Err(e);
                }
            }
        }
        Ok(clause)
    }

    pub fn first(&self) -> ExprId {
        self.first
    }

    pub fn following(&self) -> &[WhereFollowing] {
        &self.following
    }

    /// Number of conditions, the leading one included.
    pub fn number_of_conditions(&self) -> usize {
        1 + self.following.len()
    }

    /// Every condition in print order.
    pub fn expressions(&self) -> impl Iterator<Item = ExprId> + '_ {
        std::iter::once(self.first).chain(self.following.iter().map(|f| f.expr))
    }

    pub(crate) fn release(self, exprs: &mut ExprArena) {
        exprs.release(self.first);
        for f in self.following {
            exprs.release(f.expr);
        }
    }

    pub(crate) fn replace_child(&mut self, old: ExprId, new: ExprId) -> ModelResult<()> {
        if self.first == old {
            self.first = new;
            return Ok(());
        }
        let entry = self
            .following
            .iter_mut()
            .find(|f| f.expr == old)
            .ok_or_else(|| ModelError::not_a_child("WHERE", old))?;
        entry.expr = new;
        Ok(())
    }

    /// Drop condition `old`.
    ///
    /// Dropping the leading condition promotes the first following one and
    /// discards its operator. On [`WhereRemoval::Eliminated`] the owner must
    /// discard the clause.
    pub(crate) fn remove_child(
        &mut self,
        exprs: &mut ExprArena,
        old: ExprId,
    ) -> ModelResult<WhereRemoval> {
        if self.first == old {
            if self.following.is_empty() {
                exprs.release(old);
                return Ok(WhereRemoval::Eliminated);
            }
            let next = self.following.remove(0);
            self.first = next.expr;
            exprs.release(old);
            return Ok(WhereRemoval::Promoted);
        }
        let index = self
            .following
            .iter()
            .position(|f| f.expr == old)
            .ok_or_else(|| ModelError::not_a_child("WHERE", old))?;
        self.following.remove(index);
        exprs.release(old);
        Ok(WhereRemoval::Removed)
    }

    pub fn to_model(&self, exprs: &ExprArena) -> ModelResult<WhereDescription> {
        Ok(WhereDescription {
            first: exprs.to_model(self.first)?,
            following: self
                .following
                .iter()
                .map(|f| {
                    Ok(WhereFollowingDescription {
                        logic: f.logic,
                        expr: exprs.to_model(f.expr)?,
                    })
                })
                .collect::<ModelResult<Vec<_>>>()?,
        })
    }

    pub fn to_sql(&self, exprs: &ExprArena) -> ModelResult<String> {
        let mut sql = format!("WHERE {}", exprs.to_sql(self.first)?);
        for f in &self.following {
            sql.push_str("\n\t");
            sql.push_str(f.logic.as_sql());
            sql.push(' ');
            sql.push_str(&exprs.to_sql(f.expr)?);
        }
        Ok(sql)
    }

    pub(crate) fn validate(
        &self,
        exprs: &ExprArena,
        scope: &Scope<'_>,
        config: &ValidationConfig,
        result: &mut ValidationResult,
    ) {
        for expr in self.expressions() {
            scope.check_expression(exprs, expr, Location::Where, config, result);
        }
    }
}

impl WhereMut<'_> {
    pub fn is_present(&self) -> bool {
        self.clause.is_some()
    }

    /// Install a new condition list, dropping the current one.
    pub fn set(&mut self, desc: &WhereDescription) -> ModelResult<()> {
        let clause = Where::load(desc, self.exprs)?;
        if let Some(old) = self.clause.replace(clause) {
            old.release(self.exprs);
        }
        self.touch();
        Ok(())
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.clause.take() {
            old.release(self.exprs);
            self.touch();
        }
    }

    /// Chain another condition. Fails if the statement has no WHERE yet.
    pub fn append_expression(
        &mut self,
        desc: &ExpressionDescription,
        logic: LogicalOperator,
    ) -> ModelResult<ExprId> {
        let clause = self
            .clause
            .as_mut()
            .ok_or(ModelError::ClauseNotPresent("WHERE"))?;
        let expr = self.exprs.load(desc, ExprParent::Where)?;
        clause.following.push(WhereFollowing { logic, expr });
        self.touch();
        Ok(expr)
    }

    /// Change the operator of the following condition at `index`.
    pub fn set_logic(&mut self, index: usize, logic: LogicalOperator) -> ModelResult<()> {
        let clause = self
            .clause
            .as_mut()
            .ok_or(ModelError::ClauseNotPresent("WHERE"))?;
        let len = clause.following.len();
        let entry = clause
            .following
            .get_mut(index)
            .ok_or_else(|| ModelError::out_of_range("WHERE condition", index, len))?;
        entry.logic = logic;
        self.touch();
        Ok(())
    }

    pub fn replace_child(&mut self, old: ExprId, desc: &ExpressionDescription) -> ModelResult<ExprId> {
        let clause = self
            .clause
            .as_mut()
            .ok_or(ModelError::ClauseNotPresent("WHERE"))?;
        let new = swap_child(self.exprs, ExprParent::Where, old, desc, |_, new| {
            clause.replace_child(old, new)
        })?;
        self.touch();
        Ok(new)
    }

    pub fn remove_child(&mut self, old: ExprId) -> ModelResult<WhereRemoval> {
        let clause = self
            .clause
            .as_mut()
            .ok_or(ModelError::ClauseNotPresent("WHERE"))?;
        let outcome = clause.remove_child(self.exprs, old)?;
        if outcome == WhereRemoval::Eliminated {
            *self.clause = None;
        }
        self.touch();
        Ok(outcome)
    }
}
