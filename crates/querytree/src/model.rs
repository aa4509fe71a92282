//! Wire descriptions exchanged with the persistence layer.
//!
//! These are plain `serde` structs mirroring the stored JSON. Several of them use
//! the "exactly one optional key is populated" convention; those are checked and
//! turned into closed sum types when a [`Query`](crate::Query) is loaded.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// Stored form of a whole statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescription {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<InsertDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<UpdateDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<DeleteDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FromDescription>,
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<WhereDescription>,
}

impl QueryDescription {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDescription {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<SelectColumnDescription>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub all_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectColumnDescription {
    pub expr: ExpressionDescription,
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A table as written in FROM/JOIN, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNameDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl TableNameDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromDescription {
    pub first: TableNameDefinition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<JoinDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossJoinStyle {
    /// `JOIN t`
    Cross,
    /// `, t`
    Comma,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InnerJoinDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<ExpressionDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,
}

/// Exactly one of `cross` and `inner` must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDescription {
    pub table: TableNameDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross: Option<CrossJoinStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<InnerJoinDescription>,
}

impl JoinDescription {
    pub fn cross(table: TableNameDefinition, style: CrossJoinStyle) -> Self {
        Self {
            table,
            cross: Some(style),
            inner: None,
        }
    }

    pub fn inner_on(table: TableNameDefinition, on: ExpressionDescription) -> Self {
        Self {
            table,
            cross: None,
            inner: Some(InnerJoinDescription {
                on: Some(on),
                using: None,
            }),
        }
    }

    pub fn inner_using(table: TableNameDefinition, column: impl Into<String>) -> Self {
        Self {
            table,
            cross: None,
            inner: Some(InnerJoinDescription {
                on: None,
                using: Some(column.into()),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereDescription {
    pub first: ExpressionDescription,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub following: Vec<WhereFollowingDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereFollowingDescription {
    pub logic: LogicalOperator,
    pub expr: ExpressionDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDescription {
    pub column: String,
    pub expr: ExpressionDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertDescription {
    pub table: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<AssignmentDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDescription {
    pub table: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<AssignmentDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDescription {}

/// Classification of a literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstantType {
    Integer,
    Real,
    Text,
}

impl ConstantType {
    /// Classify a raw literal: integers, then reals, everything else is text.
    pub fn classify(value: &str) -> Self {
        if value.parse::<i64>().is_ok() {
            Self::Integer
        } else if value.parse::<f64>().is_ok() {
            Self::Real
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantDescription {
    #[serde(rename = "type")]
    pub ty: ConstantType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryDescription {
    pub lhs: ExpressionDescription,
    pub operator: String,
    pub rhs: ExpressionDescription,
    #[serde(default)]
    pub simple: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingDescription {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescription {
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limited_to: Option<TableNameDefinition>,
}

/// Stored form of one expression node: exactly one field is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_column: Option<ColumnDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstantDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<Box<BinaryDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<ParameterDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub star: Option<StarDescription>,
}

/// Borrowed view of the single populated field of an [`ExpressionDescription`].
#[derive(Debug, Clone, Copy)]
pub enum ExpressionDescriptionKind<'a> {
    Column(&'a ColumnDescription),
    Constant(&'a ConstantDescription),
    Binary(&'a BinaryDescription),
    Missing,
    Parameter(&'a ParameterDescription),
    Star(&'a StarDescription),
}

impl ExpressionDescription {
    /// Resolve which kind this description holds.
    ///
    /// Fails with [`ModelError::UnknownExpressionKind`] when no field or more than
    /// one field is populated.
    pub fn kind(&self) -> ModelResult<ExpressionDescriptionKind<'_>> {
        let mut found = Vec::new();
        if let Some(c) = &self.single_column {
            found.push(("singleColumn", ExpressionDescriptionKind::Column(c)));
        }
        if let Some(c) = &self.constant {
            found.push(("constant", ExpressionDescriptionKind::Constant(c)));
        }
        if let Some(b) = &self.binary {
            found.push(("binary", ExpressionDescriptionKind::Binary(b)));
        }
        if self.missing.is_some() {
            found.push(("missing", ExpressionDescriptionKind::Missing));
        }
        if let Some(p) = &self.parameter {
            found.push(("parameter", ExpressionDescriptionKind::Parameter(p)));
        }
        if let Some(s) = &self.star {
            found.push(("star", ExpressionDescriptionKind::Star(s)));
        }

        match found.len() {
            1 => Ok(found.remove(0).1),
            0 => Err(ModelError::UnknownExpressionKind(
                "no expression kind populated".to_string(),
            )),
            _ => {
                let keys: Vec<&str> = found.iter().map(|(k, _)| *k).collect();
                Err(ModelError::UnknownExpressionKind(format!(
                    "several kinds populated: {}",
                    keys.join(", ")
                )))
            }
        }
    }

    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            single_column: Some(ColumnDescription {
                column: column.into(),
                table: Some(table.into()),
                alias: None,
            }),
            ..Self::default()
        }
    }

    /// A column reference qualified through a table alias.
    pub fn aliased_column(
        table: impl Into<String>,
        alias: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            single_column: Some(ColumnDescription {
                column: column.into(),
                table: Some(table.into()),
                alias: Some(alias.into()),
            }),
            ..Self::default()
        }
    }

    /// A column reference without any qualifier.
    pub fn bare_column(column: impl Into<String>) -> Self {
        Self {
            single_column: Some(ColumnDescription {
                column: column.into(),
                table: None,
                alias: None,
            }),
            ..Self::default()
        }
    }

    pub fn constant(ty: ConstantType, value: impl Into<String>) -> Self {
        Self {
            constant: Some(ConstantDescription {
                ty,
                value: value.into(),
            }),
            ..Self::default()
        }
    }

    /// A constant whose type is derived from the literal.
    pub fn literal(value: impl Into<String>) -> Self {
        let value = value.into();
        Self::constant(ConstantType::classify(&value), value)
    }

    pub fn binary(
        lhs: ExpressionDescription,
        operator: impl Into<String>,
        rhs: ExpressionDescription,
    ) -> Self {
        Self {
            binary: Some(Box::new(BinaryDescription {
                lhs,
                operator: operator.into(),
                rhs,
                simple: true,
            })),
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self {
            missing: Some(MissingDescription {}),
            ..Self::default()
        }
    }

    pub fn parameter(key: impl Into<String>) -> Self {
        Self {
            parameter: Some(ParameterDescription { key: key.into() }),
            ..Self::default()
        }
    }

    pub fn star() -> Self {
        Self {
            star: Some(StarDescription::default()),
            ..Self::default()
        }
    }

    pub fn star_of(table: TableNameDefinition) -> Self {
        Self {
            star: Some(StarDescription {
                limited_to: Some(table),
            }),
            ..Self::default()
        }
    }
}
