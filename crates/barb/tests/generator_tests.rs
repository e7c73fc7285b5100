use std::sync::Arc;

use barb::{
    Bindings, CompiledExpr, ErrorKind, ExprKind, ExprRep, HostModel, LambdaRep, NumericSeq, Object, ReduceSettings,
};

fn int(offset: u32, value: i64) -> ExprRep {
    ExprRep::obj(offset, 1, Object::Int(value))
}

fn float(offset: u32, value: f64) -> ExprRep {
    ExprRep::obj(offset, 3, Object::Float(value))
}

fn generator(offset: u32, length: u32, start: ExprRep, step: ExprRep, end: ExprRep) -> ExprRep {
    ExprRep::new(
        offset,
        length,
        ExprKind::Generator {
            start: Box::new(start),
            step: Box::new(step),
            end: Box::new(end),
        },
    )
}

fn eval_with(nodes: Vec<ExprRep>, inputs: &[(&str, Object)]) -> Result<Object, barb::BarbExecutionError> {
    let names: Vec<String> = inputs.iter().map(|(name, _)| (*name).to_owned()).collect();
    let values: Vec<Object> = inputs.iter().map(|(_, value)| value.clone()).collect();
    let compiled = CompiledExpr::new(nodes, names, Arc::new(HostModel::new()), ReduceSettings::new())?;
    compiled.eval(values)
}

#[test]
fn integer_generator_enumerates_inclusive_bounds() {
    // {1 .. 2 .. 7}
    let root = generator(0, 12, int(1, 1), int(6, 2), int(11, 7));
    let result = eval_with(vec![root], &[]).unwrap();
    let Object::Seq(seq) = result else {
        panic!("expected a sequence, got {result}");
    };
    assert_eq!(
        seq.values(),
        vec![Object::Int(1), Object::Int(3), Object::Int(5), Object::Int(7)]
    );
}

#[test]
fn integer_generator_descends_with_negative_step() {
    let root = generator(0, 13, int(1, 9), int(6, -3), int(11, 0));
    let result = eval_with(vec![root], &[]).unwrap();
    assert_eq!(
        result,
        Object::Seq(NumericSeq::Int { start: 9, step: -3, end: 0 })
    );
}

#[test]
fn float_generator_enumerates() {
    let root = generator(0, 20, float(1, 0.0), float(7, 0.5), float(13, 1.0));
    let result = eval_with(vec![root], &[]).unwrap();
    let Object::Seq(seq) = result else {
        panic!("expected a sequence, got {result}");
    };
    assert_eq!(
        seq.values(),
        vec![Object::Float(0.0), Object::Float(0.5), Object::Float(1.0)]
    );
}

#[test]
fn zero_step_is_rejected() {
    let root = generator(0, 12, int(1, 1), int(6, 0), int(11, 7));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadGeneratorTypes);
    assert!(err.message.contains("step"));
}

#[test]
fn zero_step_error_points_at_the_step_node() {
    let root = generator(0, 12, int(1, 1), int(6, 0), int(11, 7));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert_eq!(err.offset, 6);
}

#[test]
fn mixed_numeric_kinds_are_rejected() {
    let root = generator(0, 14, int(1, 1), float(6, 0.5), int(12, 7));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadGeneratorTypes);
    assert!(err.message.contains("numeric kind"));
}

#[test]
fn non_numeric_bounds_are_rejected() {
    let root = generator(0, 16, ExprRep::obj(1, 3, Object::Str("a".to_owned())), int(7, 1), int(12, 7));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadGeneratorTypes);
}

#[test]
fn pending_bound_leaves_generator_residual_until_final() {
    // {x .. 1 .. 5} with x supplied later
    let root = generator(0, 12, ExprRep::unknown(1, 1, "x"), int(6, 1), int(11, 5));
    let compiled = CompiledExpr::new(
        vec![root],
        vec!["x".to_owned()],
        Arc::new(HostModel::new()),
        ReduceSettings::new(),
    )
    .unwrap();
    assert!(matches!(compiled.residual().kind, ExprKind::Generator { .. }));
    let result = compiled.eval(vec![Object::Int(3)]).unwrap();
    assert_eq!(result, Object::Seq(NumericSeq::Int { start: 3, step: 1, end: 5 }));
}

#[test]
fn unresolvable_bound_errors_in_final_reduction() {
    // A lambda is not a value the generator can use, and it never resolves.
    let lambda = ExprRep::new(
        1,
        9,
        ExprKind::Lambda(Arc::new(LambdaRep {
            params: vec![Arc::from("q")],
            bindings: Bindings::new(),
            body: ExprRep::unknown(8, 1, "q"),
        })),
    );
    let root = generator(0, 16, lambda, int(12, 1), int(15, 5));
    let err = eval_with(vec![root], &[]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::GeneratorArgUnresolved);
}

#[test]
fn generator_count_through_builtin_member() {
    // {1 .. 2 .. 7}.Count
    let root = generator(0, 12, int(1, 1), int(6, 2), int(11, 7));
    let nodes = vec![
        root,
        ExprRep::new(12, 1, ExprKind::Invoke),
        ExprRep::unknown(13, 5, "Count"),
    ];
    assert_eq!(eval_with(nodes, &[]).unwrap(), Object::Int(4));
}
