use std::sync::Arc;

use barb::{
    operators, ArrayObject, CompiledExpr, ErrorKind, ExprKind, ExprRep, HostModel, Object, ReduceSettings, TypeTag,
};
use pretty_assertions::assert_eq;

fn int(offset: u32, value: i64) -> ExprRep {
    ExprRep::obj(offset, 1, Object::Int(value))
}

fn array(offset: u32, length: u32, nodes: Vec<ExprRep>) -> ExprRep {
    ExprRep::new(offset, length, ExprKind::ArrayBuilder(nodes))
}

fn tuple(offset: u32, length: u32, nodes: Vec<ExprRep>) -> ExprRep {
    ExprRep::new(offset, length, ExprKind::Tuple(nodes))
}

fn eval_with(nodes: Vec<ExprRep>, inputs: &[(&str, Object)]) -> Result<Object, barb::BarbExecutionError> {
    let names: Vec<String> = inputs.iter().map(|(name, _)| (*name).to_owned()).collect();
    let values: Vec<Object> = inputs.iter().map(|(_, value)| value.clone()).collect();
    let compiled = CompiledExpr::new(nodes, names, Arc::new(HostModel::new()), ReduceSettings::new())?;
    compiled.eval(values)
}

#[test]
fn uniform_array_builder_yields_a_typed_array() {
    let root = array(0, 9, vec![int(1, 1), int(4, 2), int(7, 3)]);
    let result = eval_with(vec![root], &[]).unwrap();
    let Object::Array(built) = result else {
        panic!("expected an array, got {result}");
    };
    assert_eq!(built.elem, Some(TypeTag::Int));
    assert_eq!(built.items, vec![Object::Int(1), Object::Int(2), Object::Int(3)]);
}

#[test]
fn mixed_array_builder_yields_an_untyped_array() {
    let root = array(0, 9, vec![int(1, 1), ExprRep::obj(4, 3, Object::Str("a".to_owned()))]);
    let result = eval_with(vec![root], &[]).unwrap();
    let Object::Array(built) = result else {
        panic!("expected an array, got {result}");
    };
    assert_eq!(built.elem, None);
    assert_eq!(built.items.len(), 2);
}

#[test]
fn empty_array_builder_yields_an_empty_untyped_array() {
    let root = array(0, 2, vec![]);
    let result = eval_with(vec![root], &[]).unwrap();
    assert_eq!(result, Object::Array(ArrayObject::from_items(vec![])));
}

#[test]
fn array_builder_folds_element_expressions() {
    // [1 + 2, 4]
    let sum = ExprRep::new(
        1,
        5,
        ExprKind::SubExpression(vec![int(1, 1), operators::infix(3, 1, "+").unwrap(), int(5, 2)]),
    );
    let root = array(0, 9, vec![sum, int(8, 4)]);
    let result = eval_with(vec![root], &[]).unwrap();
    let Object::Array(built) = result else {
        panic!("expected an array, got {result}");
    };
    assert_eq!(built.items, vec![Object::Int(3), Object::Int(4)]);
    assert_eq!(built.elem, Some(TypeTag::Int));
}

#[test]
fn array_builder_with_pending_element_stays_residual_until_final() {
    let root = array(0, 7, vec![ExprRep::unknown(1, 1, "x"), int(4, 2)]);
    let compiled = CompiledExpr::new(
        vec![root],
        vec!["x".to_owned()],
        Arc::new(HostModel::new()),
        ReduceSettings::new(),
    )
    .unwrap();
    assert!(matches!(compiled.residual().kind, ExprKind::ArrayBuilder(_)));
    let result = compiled.eval(vec![Object::Int(1)]).unwrap();
    let Object::Array(built) = result else {
        panic!("expected an array, got {result}");
    };
    assert_eq!(built.items, vec![Object::Int(1), Object::Int(2)]);
}

#[test]
fn tuple_of_values_extracts_as_a_value_sequence() {
    let root = tuple(0, 6, vec![int(1, 7), int(4, 8)]);
    let result = eval_with(vec![root], &[]).unwrap();
    assert_eq!(result, Object::Tuple(vec![Object::Int(7), Object::Int(8)]));
}

#[test]
fn nested_array_builders_resolve_inside_out() {
    let inner = array(1, 6, vec![int(2, 1), int(5, 2)]);
    let root = array(0, 12, vec![inner, array(8, 3, vec![int(9, 3)])]);
    let result = eval_with(vec![root], &[]).unwrap();
    let Object::Array(outer) = result else {
        panic!("expected an array, got {result}");
    };
    assert_eq!(outer.elem, Some(TypeTag::Array));
    assert_eq!(outer.items.len(), 2);
}

#[test]
fn set_builder_has_no_reduction_rule() {
    // A parser-only artifact: final reduction reports it as residual.
    let root = ExprRep::new(0, 6, ExprKind::SetBuilder(vec![int(1, 1), int(4, 2)]));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedResult);
}

#[test]
fn set_builder_residue_raises_unexpected_case_when_configured() {
    let mut settings = ReduceSettings::new();
    settings.fail_on_catch_all = true;
    let root = ExprRep::new(0, 6, ExprKind::SetBuilder(vec![int(1, 1), int(4, 2)]));
    let compiled = CompiledExpr::new(vec![root], vec![], Arc::new(HostModel::new()), settings).unwrap();
    let err = compiled.eval(vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedCase);
}

#[test]
fn unexpected_result_quotes_the_residual() {
    let root = ExprRep::new(0, 6, ExprKind::SetBuilder(vec![int(1, 1)]));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert!(err.message.contains('{'), "message should quote the residual: {}", err.message);
}
