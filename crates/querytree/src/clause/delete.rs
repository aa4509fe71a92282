use super::FromClause;
use crate::model::DeleteDescription;
use crate::validate::{Location, ValidationErrorKind, ValidationResult};

/// Head of a DELETE statement. The rows are picked by FROM and WHERE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delete;

impl Delete {
    pub fn to_model(&self) -> DeleteDescription {
        DeleteDescription {}
    }

    pub fn to_sql(&self) -> &'static str {
        "DELETE"
    }

    pub(crate) fn validate(&self, from: &FromClause, result: &mut ValidationResult) {
        if from.number_of_joins() > 0 {
            result.push(
                ValidationErrorKind::JoinInDelete,
                Location::Delete,
                format!(
                    "DELETE can only remove rows from {}, found {} join(s)",
                    from.first().name,
                    from.number_of_joins()
                ),
            );
        }
    }
}
