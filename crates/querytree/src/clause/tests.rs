//! Tests for the clause components.

use super::{ClauseMut, FromClause, Insert, JoinKind, Select, Update, Where, WhereRemoval};
use crate::error::ModelError;
use crate::expr::{ExprArena, Expression};
use crate::model::{
    AssignmentDescription, ConstantType, CrossJoinStyle, ExpressionDescription, FromDescription,
    InnerJoinDescription, InsertDescription, JoinDescription, LogicalOperator, SelectColumnDescription,
    SelectDescription, TableNameDefinition, UpdateDescription, WhereDescription,
    WhereFollowingDescription,
};
use crate::schema::{ColumnSchema, Schema, TableSchema};

fn eq(table: &str, column: &str, value: &str) -> ExpressionDescription {
    ExpressionDescription::binary(
        ExpressionDescription::column(table, column),
        "=",
        ExpressionDescription::literal(value),
    )
}

fn where_desc(first: ExpressionDescription, following: &[(LogicalOperator, ExpressionDescription)]) -> WhereDescription {
    WhereDescription {
        first,
        following: following
            .iter()
            .map(|(logic, expr)| WhereFollowingDescription {
                logic: *logic,
                expr: expr.clone(),
            })
            .collect(),
    }
}

// ==================== Select ====================

#[test]
fn test_select_sql() {
    let mut arena = ExprArena::new();
    let desc = SelectDescription {
        columns: vec![
            SelectColumnDescription {
                expr: ExpressionDescription::column("person", "id"),
                alias: None,
            },
            SelectColumnDescription {
                expr: ExpressionDescription::column("person", "name"),
                alias: Some("n".to_string()),
            },
        ],
        all_data: true,
    };
    let select = Select::load(&desc, &mut arena).unwrap();

    assert_eq!(
        select.to_sql(&arena).unwrap(),
        "SELECT *, person.id, person.name AS n"
    );
    assert_eq!(select.to_model(&arena).unwrap(), desc);
}

#[test]
fn test_select_empty() {
    let mut arena = ExprArena::new();
    let mut select = Select::load(&SelectDescription::default(), &mut arena).unwrap();
    assert_eq!(select.to_sql(&arena).unwrap_err(), ModelError::EmptySelect);

    let mut dirty = false;
    ClauseMut::new(&mut select, &mut arena, &mut dirty).set_all_data(true);
    assert!(dirty);
    assert_eq!(select.to_sql(&arena).unwrap(), "SELECT *");
}

#[test]
fn test_select_append_and_alias() {
    let mut arena = ExprArena::new();
    let mut select = Select::load(&SelectDescription::default(), &mut arena).unwrap();
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut select, &mut arena, &mut dirty);

    view.append_column("person", "id", None).unwrap();
    view.append_expression(&ExpressionDescription::parameter("now"), Some("ts"))
        .unwrap();
    view.set_alias(0, Some("pid")).unwrap();
    assert!(matches!(
        view.set_alias(5, None),
        Err(ModelError::IndexOutOfRange { index: 5, len: 2, .. })
    ));
    assert_eq!(view.number_of_columns(), 2);

    assert_eq!(
        select.to_sql(&arena).unwrap(),
        "SELECT person.id AS pid, @now AS ts"
    );
}

#[test]
fn test_select_remove_child_not_implemented() {
    let mut arena = ExprArena::new();
    let desc = SelectDescription {
        columns: vec![SelectColumnDescription {
            expr: ExpressionDescription::column("person", "id"),
            alias: None,
        }],
        all_data: false,
    };
    let mut select = Select::load(&desc, &mut arena).unwrap();
    let id = select.columns()[0].expr;
    let mut dirty = false;
    let err = ClauseMut::new(&mut select, &mut arena, &mut dirty)
        .remove_child(id)
        .unwrap_err();

    assert!(matches!(err, ModelError::NotImplemented(_)));
    assert!(!dirty);
    assert!(arena.contains(id));
}

// ==================== From ====================

#[test]
fn test_from_sql_with_joins() {
    let mut arena = ExprArena::new();
    let desc = FromDescription {
        first: TableNameDefinition::aliased("person", "p"),
        joins: vec![
            JoinDescription::cross(TableNameDefinition::new("event"), CrossJoinStyle::Comma),
            JoinDescription::cross(TableNameDefinition::new("place"), CrossJoinStyle::Cross),
            JoinDescription::inner_on(
                TableNameDefinition::aliased("person", "q"),
                ExpressionDescription::binary(
                    ExpressionDescription::aliased_column("person", "p", "id"),
                    "=",
                    ExpressionDescription::aliased_column("person", "q", "id"),
                ),
            ),
            JoinDescription::inner_using(TableNameDefinition::new("visit"), "person_id"),
        ],
    };
    let from = FromClause::load(&desc, &mut arena).unwrap();

    assert_eq!(
        from.to_sql(&arena).unwrap(),
        "FROM person p\n\t, event\n\tJOIN place\n\tINNER JOIN person q ON(p.id = q.id)\n\tINNER JOIN visit USING(person_id)"
    );
    assert_eq!(from.number_of_joins(), 4);
    assert!(matches!(from.join(3).unwrap().kind, JoinKind::InnerUsing(ref c) if c == "person_id"));
    assert!(from.join(4).is_err());
    assert_eq!(from.to_model(&arena).unwrap(), desc);
}

#[test]
fn test_from_invalid_join_specs() {
    let table = TableNameDefinition::new("event");
    let invalid = [
        JoinDescription {
            table: table.clone(),
            cross: None,
            inner: None,
        },
        JoinDescription {
            table: table.clone(),
            cross: Some(CrossJoinStyle::Cross),
            inner: Some(InnerJoinDescription {
                on: None,
                using: Some("id".to_string()),
            }),
        },
        JoinDescription {
            table: table.clone(),
            cross: None,
            inner: Some(InnerJoinDescription {
                on: None,
                using: None,
            }),
        },
        JoinDescription {
            table,
            cross: None,
            inner: Some(InnerJoinDescription {
                on: Some(ExpressionDescription::bare_column("id")),
                using: Some("id".to_string()),
            }),
        },
    ];
    for join in invalid {
        let mut arena = ExprArena::new();
        let desc = FromDescription {
            first: TableNameDefinition::new("person"),
            joins: vec![join],
        };
        assert!(matches!(
            FromClause::load(&desc, &mut arena),
            Err(ModelError::InvalidJoinSpec(_))
        ));
    }
}

#[test]
fn test_from_on_condition_replace_and_remove() {
    let mut arena = ExprArena::new();
    let desc = FromDescription {
        first: TableNameDefinition::new("person"),
        joins: vec![JoinDescription::inner_on(
            TableNameDefinition::new("event"),
            eq("event", "person_id", "1"),
        )],
    };
    let mut from = FromClause::load(&desc, &mut arena).unwrap();
    let on = from.join(0).unwrap().on().unwrap();
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut from, &mut arena, &mut dirty);

    let blank = view.remove_child(on).unwrap();
    assert!(!view.exprs().contains(on));
    assert_eq!(view.exprs().get(blank).unwrap(), &Expression::Missing);
    assert!(matches!(
        view.remove_child(on),
        Err(ModelError::StaleExpression(_))
    ));

    view.replace_child(blank, &eq("event", "person_id", "2"))
        .unwrap();
    assert_eq!(
        from.to_sql(&arena).unwrap(),
        "FROM person\n\tINNER JOIN event ON(event.person_id = 2)"
    );
}

#[test]
fn test_from_add_and_remove_join() {
    let mut arena = ExprArena::new();
    let mut from = FromClause::load(
        &FromDescription {
            first: TableNameDefinition::new("person"),
            joins: Vec::new(),
        },
        &mut arena,
    )
    .unwrap();
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut from, &mut arena, &mut dirty);

    view.add_join(&JoinDescription::inner_on(
        TableNameDefinition::new("event"),
        eq("event", "kind", "1"),
    ))
    .unwrap();
    assert_eq!(view.exprs().len(), 3);
    view.remove_join(0).unwrap();
    assert!(view.exprs().is_empty());
    assert!(view.remove_join(0).is_err());
    assert!(dirty);
}

// ==================== Where ====================

#[test]
fn test_where_sql() {
    let mut arena = ExprArena::new();
    let desc = where_desc(
        eq("person", "name", "Hans"),
        &[
            (LogicalOperator::And, eq("person", "age", "42")),
            (LogicalOperator::Or, ExpressionDescription::parameter("always")),
        ],
    );
    let clause = Where::load(&desc, &mut arena).unwrap();
    assert_eq!(
        clause.to_sql(&arena).unwrap(),
        "WHERE person.name = \"Hans\"\n\tAND person.age = 42\n\tOR @always"
    );
    assert_eq!(clause.number_of_conditions(), 3);
    assert_eq!(clause.to_model(&arena).unwrap(), desc);
}

#[test]
fn test_where_load_failure_releases_conditions() {
    let mut arena = ExprArena::new();
    let desc = where_desc(
        eq("person", "name", "Hans"),
        &[(LogicalOperator::And, ExpressionDescription::parameter("9"))],
    );
    assert!(Where::load(&desc, &mut arena).is_err());
    assert!(arena.is_empty());
}

#[test]
fn test_where_remove_following() {
    let mut arena = ExprArena::new();
    let desc = where_desc(
        eq("person", "name", "Hans"),
        &[
            (LogicalOperator::And, eq("person", "age", "42")),
            (LogicalOperator::Or, eq("person", "age", "43")),
        ],
    );
    let mut slot = Some(Where::load(&desc, &mut arena).unwrap());
    let middle = slot.as_ref().unwrap().following()[0].expr;
    let mut dirty = false;

    let outcome = ClauseMut::new(&mut slot, &mut arena, &mut dirty)
        .remove_child(middle)
        .unwrap();

    assert_eq!(outcome, WhereRemoval::Removed);
    assert_eq!(
        slot.unwrap().to_sql(&arena).unwrap(),
        "WHERE person.name = \"Hans\"\n\tOR person.age = 43"
    );
}

#[test]
fn test_where_remove_first_promotes_next() {
    let mut arena = ExprArena::new();
    let desc = where_desc(
        eq("person", "name", "Hans"),
        &[
            (LogicalOperator::Or, eq("person", "age", "42")),
            (LogicalOperator::And, eq("person", "age", "43")),
        ],
    );
    let mut slot = Some(Where::load(&desc, &mut arena).unwrap());
    let first = slot.as_ref().unwrap().first();
    let mut dirty = false;

    let outcome = ClauseMut::new(&mut slot, &mut arena, &mut dirty)
        .remove_child(first)
        .unwrap();

    assert_eq!(outcome, WhereRemoval::Promoted);
    assert_eq!(
        slot.unwrap().to_sql(&arena).unwrap(),
        "WHERE person.age = 42\n\tAND person.age = 43"
    );
}

#[test]
fn test_where_remove_only_condition_eliminates_clause() {
    let mut arena = ExprArena::new();
    let mut slot = Some(Where::load(&where_desc(eq("person", "id", "1"), &[]), &mut arena).unwrap());
    let first = slot.as_ref().unwrap().first();
    let mut dirty = false;

    let outcome = ClauseMut::new(&mut slot, &mut arena, &mut dirty)
        .remove_child(first)
        .unwrap();

    assert_eq!(outcome, WhereRemoval::Eliminated);
    assert!(slot.is_none());
    assert!(arena.is_empty());
}

#[test]
fn test_where_append_needs_clause() {
    let mut arena = ExprArena::new();
    let mut slot: Option<Where> = None;
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut slot, &mut arena, &mut dirty);

    assert_eq!(
        view.append_expression(&eq("person", "id", "1"), LogicalOperator::And)
            .unwrap_err(),
        ModelError::ClauseNotPresent("WHERE")
    );
    view.set(&where_desc(eq("person", "id", "1"), &[])).unwrap();
    view.append_expression(&eq("person", "id", "2"), LogicalOperator::And)
        .unwrap();
    view.set_logic(0, LogicalOperator::Or).unwrap();
    assert!(view.set_logic(1, LogicalOperator::Or).is_err());

    assert_eq!(
        slot.unwrap().to_sql(&arena).unwrap(),
        "WHERE person.id = 1\n\tOR person.id = 2"
    );
}

#[test]
fn test_where_set_releases_previous() {
    let mut arena = ExprArena::new();
    let mut slot = Some(Where::load(&where_desc(eq("person", "id", "1"), &[]), &mut arena).unwrap());
    let old = slot.as_ref().unwrap().first();
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut slot, &mut arena, &mut dirty);

    view.set(&where_desc(ExpressionDescription::parameter("p"), &[]))
        .unwrap();
    assert!(!view.exprs().contains(old));
    assert_eq!(view.exprs().len(), 1);

    view.clear();
    assert!(!view.is_present());
    assert!(arena.is_empty());
}

// ==================== Insert / Update ====================

fn person_schema() -> Schema {
    Schema::new().with_table(TableSchema::new("person").with_columns(&["p1", "p2", "p3"]))
}

fn insert_desc(assignments: &[(&str, &str)]) -> InsertDescription {
    InsertDescription {
        table: "person".to_string(),
        assignments: assignments
            .iter()
            .map(|(column, value)| AssignmentDescription {
                column: column.to_string(),
                expr: ExpressionDescription::literal(*value),
            })
            .collect(),
    }
}

#[test]
fn test_insert_sql() {
    let mut arena = ExprArena::new();
    let insert = Insert::load(&insert_desc(&[("p1", "0"), ("p2", "x")]), &mut arena).unwrap();
    assert_eq!(
        insert.to_sql(&arena).unwrap(),
        "INSERT INTO person (p1, p2)\nVALUES (0, \"x\")"
    );
}

#[test]
fn test_insert_activation() {
    let schema = person_schema();
    let mut arena = ExprArena::new();
    let mut insert = Insert::load(&insert_desc(&[("p1", "0")]), &mut arena).unwrap();
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut insert, &mut arena, &mut dirty);

    view.change_activation_state("p3", true).unwrap();
    assert_eq!(view.active_columns(&schema), vec!["p1", "p3"]);
    let p3 = view.value_for_column("p3").unwrap();
    assert_eq!(view.exprs().get(p3).unwrap(), &Expression::Missing);

    assert_eq!(
        view.change_activation_state("p3", true).unwrap_err(),
        ModelError::ColumnAlreadyActive("p3".to_string())
    );
    assert_eq!(
        view.change_activation_state("p2", false).unwrap_err(),
        ModelError::ColumnAlreadyInactive("p2".to_string())
    );

    view.change_activation_state("p1", false).unwrap();
    assert_eq!(view.active_columns(&schema), vec!["p3"]);
    assert_eq!(view.values(), vec![p3]);
    assert_eq!(arena.len(), 1);
}

#[test]
fn test_insert_activation_toggle_leaves_one_assignment() {
    let mut arena = ExprArena::new();
    let mut insert = Insert::load(&insert_desc(&[("p1", "0")]), &mut arena).unwrap();
    let mut dirty = false;
    let mut view = ClauseMut::new(&mut insert, &mut arena, &mut dirty);

    for active in [true, false, true, false, true] {
        view.change_activation_state("p2", active).unwrap();
        assert_eq!(view.is_active("p2"), active);
    }

    let entries: Vec<_> = view
        .assignments()
        .entries()
        .iter()
        .filter(|a| a.column == "p2")
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(view.exprs().get(entries[0].expr).unwrap(), &Expression::Missing);
    assert_eq!(arena.len(), 2);
}

#[test]
fn test_insert_load_rejects_duplicate_columns() {
    let mut arena = ExprArena::new();
    let err = Insert::load(&insert_desc(&[("p1", "0"), ("p1", "1")]), &mut arena).unwrap_err();

    assert_eq!(err, ModelError::DuplicateInsertColumn("p1".to_string()));
    assert!(arena.is_empty());
}

#[test]
fn test_assignment_load_failure_releases_earlier_values() {
    let mut arena = ExprArena::new();
    let desc = UpdateDescription {
        table: "person".to_string(),
        assignments: vec![
            AssignmentDescription {
                column: "name".to_string(),
                expr: ExpressionDescription::literal("x"),
            },
            AssignmentDescription {
                column: "age".to_string(),
                expr: ExpressionDescription::parameter("1st"),
            },
        ],
    };

    let err = Update::load(&desc, &mut arena).unwrap_err();
    assert_eq!(err, ModelError::InvalidParameterKey("1st".to_string()));
    assert!(arena.is_empty());
}

#[test]
fn test_insert_active_columns_follow_schema_order() {
    let schema = person_schema();
    let mut arena = ExprArena::new();
    let insert = Insert::load(
        &insert_desc(&[("extra", "1"), ("p3", "2"), ("p1", "3")]),
        &mut arena,
    )
    .unwrap();

    assert_eq!(insert.active_columns(&schema), vec!["p1", "p3", "extra"]);
    let values: Vec<String> = insert
        .values()
        .into_iter()
        .map(|id| arena.to_sql(id).unwrap())
        .collect();
    assert_eq!(values, vec!["1", "2", "3"]);
}

#[test]
fn test_insert_remove_value_keeps_column_active() {
    let mut arena = ExprArena::new();
    let mut insert = Insert::load(&insert_desc(&[("p1", "0")]), &mut arena).unwrap();
    let value = insert.value_for_column("p1").unwrap();
    let mut dirty = false;

    let blank = ClauseMut::new(&mut insert, &mut arena, &mut dirty)
        .remove_child(value)
        .unwrap();

    assert!(insert.is_active("p1"));
    assert_eq!(insert.value_for_column("p1"), Some(blank));
    assert_eq!(
        insert.to_sql(&arena).unwrap_err(),
        ModelError::IncompleteExpression
    );
}

#[test]
fn test_update_sql_and_append() {
    let mut arena = ExprArena::new();
    let mut update = Update::load(
        &UpdateDescription {
            table: "person".to_string(),
            assignments: vec![AssignmentDescription {
                column: "name".to_string(),
                expr: ExpressionDescription::constant(ConstantType::Text, "Hans"),
            }],
        },
        &mut arena,
    )
    .unwrap();
    let mut dirty = false;

    ClauseMut::new(&mut update, &mut arena, &mut dirty)
        .append_assignment("age", &ExpressionDescription::parameter("age"))
        .unwrap();

    assert!(dirty);
    assert_eq!(
        update.to_sql(&arena).unwrap(),
        "UPDATE person\nSET name = \"Hans\", age = @age"
    );

    ClauseMut::new(&mut update, &mut arena, &mut dirty)
        .remove_assignment("name")
        .unwrap();
    assert_eq!(update.to_sql(&arena).unwrap(), "UPDATE person\nSET age = @age");

    assert_eq!(
        ClauseMut::new(&mut update, &mut arena, &mut dirty)
            .remove_assignment("name")
            .unwrap_err(),
        ModelError::ColumnNotAssigned("name".to_string())
    );
}

#[test]
fn test_required_column_helper() {
    let column = ColumnSchema::new("id", "int").not_null();
    assert!(column.requires_value());
    assert!(!column.clone().with_default("0").requires_value());
    assert!(!column.primary().requires_value());
}
