//! Tests for the expression arena.

use super::{ExprArena, ExprId, ExprParent, Expression, is_valid_parameter_key};
use crate::error::ModelError;
use crate::model::{ConstantType, ExpressionDescription, TableNameDefinition};

fn name_equals_hans() -> ExpressionDescription {
    ExpressionDescription::binary(
        ExpressionDescription::column("person", "name"),
        "=",
        ExpressionDescription::constant(ConstantType::Text, "Hans"),
    )
}

fn operands(arena: &ExprArena, id: ExprId) -> (ExprId, ExprId) {
    match arena.get(id).unwrap() {
        Expression::Binary { lhs, rhs, .. } => (*lhs, *rhs),
        other => panic!("expected binary, got {other:?}"),
    }
}

#[test]
fn test_format_leaves() {
    let mut arena = ExprArena::new();
    let cases = [
        (ExpressionDescription::constant(ConstantType::Integer, "42"), "42"),
        (ExpressionDescription::constant(ConstantType::Real, "1.5"), "1.5"),
        (ExpressionDescription::constant(ConstantType::Text, "Hans"), "\"Hans\""),
        (ExpressionDescription::column("person", "id"), "person.id"),
        (ExpressionDescription::aliased_column("person", "p", "id"), "p.id"),
        (ExpressionDescription::bare_column("id"), "id"),
        (ExpressionDescription::parameter("minAge"), "@minAge"),
        (ExpressionDescription::star(), "*"),
        (ExpressionDescription::star_of(TableNameDefinition::new("person")), "person.*"),
        (
            ExpressionDescription::star_of(TableNameDefinition::aliased("person", "p")),
            "p.*",
        ),
    ];
    for (desc, sql) in cases {
        let id = arena.load(&desc, ExprParent::Select).unwrap();
        assert_eq!(arena.to_sql(id).unwrap(), sql);
    }
}

#[test]
fn test_text_constant_is_not_escaped() {
    let mut arena = ExprArena::new();
    let id = arena
        .load(
            &ExpressionDescription::constant(ConstantType::Text, "say \"hi\""),
            ExprParent::Select,
        )
        .unwrap();
    assert_eq!(arena.to_sql(id).unwrap(), "\"say \"hi\"\"");
}

#[test]
fn test_binary_without_parentheses() {
    let mut arena = ExprArena::new();
    let desc = ExpressionDescription::binary(
        name_equals_hans(),
        "AND",
        ExpressionDescription::binary(
            ExpressionDescription::column("person", "age"),
            ">",
            ExpressionDescription::parameter("age"),
        ),
    );
    let id = arena.load(&desc, ExprParent::Where).unwrap();
    assert_eq!(
        arena.to_sql(id).unwrap(),
        "person.name = \"Hans\" AND person.age > @age"
    );
    assert_eq!(arena.len(), 7);
}

#[test]
fn test_load_sets_parents() {
    let mut arena = ExprArena::new();
    let id = arena.load(&name_equals_hans(), ExprParent::Where).unwrap();
    let (lhs, rhs) = operands(&arena, id);

    assert_eq!(arena.parent_of(id).unwrap(), ExprParent::Where);
    assert_eq!(arena.parent_of(lhs).unwrap(), ExprParent::Expr(id));
    assert_eq!(arena.parent_of(rhs).unwrap(), ExprParent::Expr(id));
}

#[test]
fn test_model_round_trip() {
    let mut arena = ExprArena::new();
    let desc = ExpressionDescription::binary(
        name_equals_hans(),
        "OR",
        ExpressionDescription::binary(
            ExpressionDescription::star_of(TableNameDefinition::aliased("person", "p")),
            "IS NOT",
            ExpressionDescription::missing(),
        ),
    );
    let id = arena.load(&desc, ExprParent::Select).unwrap();
    assert_eq!(arena.to_model(id).unwrap(), desc);
}

#[test]
fn test_missing_blocks_sql() {
    let mut arena = ExprArena::new();
    let desc = ExpressionDescription::binary(
        ExpressionDescription::column("person", "age"),
        ">",
        ExpressionDescription::missing(),
    );
    let id = arena.load(&desc, ExprParent::Where).unwrap();

    assert!(!arena.is_complete(id));
    assert_eq!(arena.to_sql(id).unwrap_err(), ModelError::IncompleteExpression);
    let (lhs, _) = operands(&arena, id);
    assert!(arena.is_complete(lhs));
}

#[test]
fn test_invalid_parameter_key_leaves_nothing_behind() {
    let mut arena = ExprArena::new();
    let desc = ExpressionDescription::binary(
        ExpressionDescription::column("person", "age"),
        ">",
        ExpressionDescription::parameter("1st"),
    );
    let err = arena.load(&desc, ExprParent::Where).unwrap_err();

    assert_eq!(err, ModelError::InvalidParameterKey("1st".to_string()));
    assert!(arena.is_empty());
}

#[test]
fn test_unknown_kind_is_rejected() {
    let mut arena = ExprArena::new();
    let err = arena
        .load(&ExpressionDescription::default(), ExprParent::Select)
        .unwrap_err();
    assert!(matches!(err, ModelError::UnknownExpressionKind(_)));
}

#[test]
fn test_release_frees_subtree_and_stales_handles() {
    let mut arena = ExprArena::new();
    let id = arena.load(&name_equals_hans(), ExprParent::Where).unwrap();
    let (lhs, rhs) = operands(&arena, id);

    arena.release(id);

    assert!(arena.is_empty());
    for stale in [id, lhs, rhs] {
        assert!(!arena.contains(stale));
        assert_eq!(arena.get(stale).unwrap_err(), ModelError::StaleExpression(stale));
    }
    assert_eq!(arena.to_sql(id).unwrap_err(), ModelError::StaleExpression(id));
    assert!(!arena.is_complete(id));
}

#[test]
fn test_released_slot_is_reused_under_new_generation() {
    let mut arena = ExprArena::new();
    let first = arena
        .load(&ExpressionDescription::bare_column("id"), ExprParent::Select)
        .unwrap();
    arena.release(first);
    assert_eq!(arena.free_count(), 1);

    let second = arena
        .load(&ExpressionDescription::bare_column("id"), ExprParent::Select)
        .unwrap();

    assert_eq!(second.index, first.index);
    assert_ne!(first, second);
    assert!(!arena.contains(first));
    assert_eq!(arena.get(first).unwrap_err(), ModelError::StaleExpression(first));
    assert!(arena.contains(second));
    assert_eq!(arena.slot_count(), 1);

    // A stale handle must not free the node now living in its slot.
    arena.release(first);
    assert!(arena.contains(second));
    assert_eq!(arena.len(), 1);
}

#[test]
fn test_repeated_replacement_keeps_slot_count_bounded() {
    let mut arena = ExprArena::new();
    let mut current = arena.load(&name_equals_hans(), ExprParent::Where).unwrap();
    for _ in 0..100 {
        let next = arena.load(&name_equals_hans(), ExprParent::Where).unwrap();
        arena.release(current);
        current = next;
    }

    assert_eq!(arena.len(), 3);
    assert_eq!(arena.slot_count(), 6);
    assert_eq!(arena.to_sql(current).unwrap(), "person.name = \"Hans\"");
}

#[test]
fn test_replace_operand_checks_membership() {
    let mut arena = ExprArena::new();
    let id = arena.load(&name_equals_hans(), ExprParent::Where).unwrap();
    let (lhs, _) = operands(&arena, id);
    let stranger = arena
        .load(&ExpressionDescription::bare_column("x"), ExprParent::Select)
        .unwrap();

    assert!(arena.check_operand(id, lhs).is_ok());
    assert!(matches!(
        arena.check_operand(id, stranger),
        Err(ModelError::NotAChild { child, .. }) if child == stranger
    ));
    assert_eq!(
        arena.check_operand(lhs, stranger).unwrap_err(),
        ModelError::LeafHasNoChildren("Column")
    );
    assert!(matches!(
        arena.replace_operand(id, stranger, stranger),
        Err(ModelError::NotAChild { .. })
    ));
}

#[test]
fn test_walk_visits_parents_first() {
    let mut arena = ExprArena::new();
    let id = arena.load(&name_equals_hans(), ExprParent::Where).unwrap();
    let mut kinds = Vec::new();
    arena.walk(id, &mut |_, expr| kinds.push(expr.kind_name()));
    assert_eq!(kinds, vec!["Binary", "Column", "Constant"]);
}

#[test]
fn test_parameter_key_pattern() {
    assert!(is_valid_parameter_key("a"));
    assert!(is_valid_parameter_key("minAge_2"));
    assert!(!is_valid_parameter_key(""));
    assert!(!is_valid_parameter_key("_x"));
    assert!(!is_valid_parameter_key("1st"));
    assert!(!is_valid_parameter_key("has space"));
}
