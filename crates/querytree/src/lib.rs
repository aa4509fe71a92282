//! # querytree
//!
//! An editable model of single SQL statements, built for a visual query editor.
//!
//! A query is loaded from its wire description ([`QueryDescription`], JSON with
//! camelCase keys), edited in place through a parent-aware expression tree,
//! checked against a [`Schema`] and rendered back to SQL text or to the wire
//! description.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use querytree::{ExpressionDescription, Query, Schema, TableSchema};
//!
//! let schema = Arc::new(Schema::new().with_table(
//!     TableSchema::new("person").with_columns(&["id", "name"]),
//! ));
//! let mut query = Query::from_json(
//!     schema,
//!     r#"{
//!         "id": "q1",
//!         "name": "people",
//!         "select": { "columns": [{ "expr": { "singleColumn": { "column": "id", "table": "person" } } }] },
//!         "from": { "first": { "name": "person" } }
//!     }"#,
//! )?;
//! assert_eq!(query.to_sql()?, "SELECT person.id\nFROM person");
//!
//! query
//!     .select_mut()?
//!     .append_expression(&ExpressionDescription::column("person", "name"), Some("n"))?;
//! assert!(query.is_dirty());
//! assert_eq!(query.to_sql()?, "SELECT person.id, person.name AS n\nFROM person");
//! assert!(query.validate().is_valid());
//! # Ok::<(), querytree::ModelError>(())
//! ```

pub mod clause;
pub mod error;
pub mod expr;
pub mod model;
pub mod query;
pub mod schema;
pub mod validate;

pub use clause::{
    Assignment, Assignments, ClauseMut, Delete, FromClause, Insert, Join, JoinKind, Select,
    SelectColumn, Update, Where, WhereFollowing, WhereMut, WhereRemoval,
};
pub use error::{ModelError, ModelResult};
pub use expr::{ColumnRef, ExprArena, ExprId, ExprParent, Expression, is_valid_parameter_key};
pub use model::{
    AssignmentDescription, BinaryDescription, ColumnDescription, ConstantDescription,
    ConstantType, CrossJoinStyle, DeleteDescription, ExpressionDescription,
    ExpressionDescriptionKind, FromDescription, InnerJoinDescription, InsertDescription,
    JoinDescription, LogicalOperator, MissingDescription, ParameterDescription, QueryDescription,
    SelectColumnDescription, SelectDescription, StarDescription, TableNameDefinition,
    UpdateDescription, WhereDescription, WhereFollowingDescription,
};
pub use query::{Query, StatementKind};
pub use schema::{ColumnSchema, Schema, TableSchema};
pub use validate::{
    Location, ValidationConfig, ValidationError, ValidationErrorKind, ValidationResult,
};
