use std::sync::Arc;

use barb::{
    operators, reduce_nodes, BarbExecutionError, Bindings, CompiledExpr, ErrorKind, ExprKind, ExprRep, HostModel,
    Object, ReduceSettings, Resolution,
};

fn int(offset: u32, value: i64) -> ExprRep {
    ExprRep::obj(offset, 1, Object::Int(value))
}

fn op(offset: u32, symbol: &str) -> ExprRep {
    operators::infix(offset, 1, symbol).unwrap()
}

fn sub(offset: u32, length: u32, nodes: Vec<ExprRep>) -> ExprRep {
    ExprRep::new(offset, length, ExprKind::SubExpression(nodes))
}

fn bvar(offset: u32, length: u32, name: &str, value: ExprRep, scope: ExprRep) -> ExprRep {
    ExprRep::new(
        offset,
        length,
        ExprKind::BVar {
            name: Arc::from(name),
            value: Box::new(value),
            scope: Box::new(scope),
        },
    )
}

fn compile(nodes: Vec<ExprRep>, inputs: &[&str]) -> Result<CompiledExpr, BarbExecutionError> {
    CompiledExpr::new(
        nodes,
        inputs.iter().map(|name| (*name).to_owned()).collect(),
        Arc::new(HostModel::new()),
        ReduceSettings::new(),
    )
}

#[test]
fn let_binding_substitutes_into_scope() {
    // let x = 10 in x * 2
    let scope = sub(14, 5, vec![ExprRep::unknown(14, 1, "x"), op(16, "*"), int(18, 2)]);
    let root = bvar(0, 19, "x", int(8, 10), scope);
    let result = compile(vec![root], &[]).unwrap().eval(vec![]).unwrap();
    assert_eq!(result, Object::Int(20));
}

#[test]
fn nested_let_bindings_compose() {
    // let x = 10 in let y = x + 1 in y * 2
    let inner_scope = sub(30, 5, vec![ExprRep::unknown(30, 1, "y"), op(32, "*"), int(34, 2)]);
    let inner_value = sub(22, 5, vec![ExprRep::unknown(22, 1, "x"), op(24, "+"), int(26, 1)]);
    let inner = bvar(14, 21, "y", inner_value, inner_scope);
    let root = bvar(0, 35, "x", int(8, 10), inner);
    let result = compile(vec![root], &[]).unwrap().eval(vec![]).unwrap();
    assert_eq!(result, Object::Int(22));
}

#[test]
fn let_binding_is_lexical() {
    // (let x = 1 in x) + x, with no outer x: the trailing reference must not
    // see the let-bound value.
    let scoped = sub(0, 16, vec![bvar(1, 14, "x", int(9, 1), ExprRep::unknown(14, 1, "x"))]);
    let nodes = vec![scoped, op(17, "+"), ExprRep::unknown(19, 1, "x")];
    let err = compile(nodes, &[]).unwrap().eval(vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownName);
    assert_eq!(err.offset, 19);
}

#[test]
fn let_bound_value_error_points_at_use_site() {
    // let x = "a" in x * 2: the type error surfaces where x is used.
    let scope = sub(15, 5, vec![ExprRep::unknown(15, 1, "x"), op(17, "*"), int(19, 2)]);
    let root = bvar(0, 20, "x", ExprRep::obj(8, 3, Object::Str("a".to_owned())), scope);
    let err = compile(vec![root], &[]).unwrap().eval(vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::HostInvocationFailed);
}

#[test]
fn pending_input_leaves_a_single_unresolved_residual() {
    // x + 1 with x supplied later: the compile pass leaves one unresolved
    // grouping spanning the input, and a later evaluation resolves it.
    let nodes = vec![ExprRep::unknown(0, 1, "x"), op(2, "+"), int(4, 1)];
    let compiled = compile(nodes, &["x"]).unwrap();
    let residual = compiled.residual();
    assert_eq!(residual.resolution, Resolution::Unresolved);
    assert!(matches!(residual.kind, ExprKind::SubExpression(_)));
    assert_eq!(residual.span.offset, 0);
    assert_eq!(residual.span.end(), 5);
    assert_eq!(compiled.eval(vec![Object::Int(4)]).unwrap(), Object::Int(5));
}

#[test]
fn non_final_reduction_is_idempotent() {
    let model = HostModel::new();
    let settings = ReduceSettings::new();
    let mut env = Bindings::new();
    env.set_coming_later("x");
    let nodes = vec![ExprRep::unknown(0, 1, "x"), op(2, "+"), int(4, 1)];
    let (once, env) = reduce_nodes(
        nodes,
        &env,
        &model,
        &settings,
        false,
        &mut barb::tracer::NoopTracer,
    )
    .unwrap();
    let (twice, _) = reduce_nodes(
        once.clone(),
        &env,
        &model,
        &settings,
        false,
        &mut barb::tracer::NoopTracer,
    )
    .unwrap();
    let rendered_once: Vec<String> = once.iter().map(ToString::to_string).collect();
    let rendered_twice: Vec<String> = twice.iter().map(ToString::to_string).collect();
    assert_eq!(rendered_once, rendered_twice);
}

#[test]
fn additional_bindings_seed_the_environment() {
    let mut settings = ReduceSettings::new();
    settings.additional_bindings.insert("tau".to_owned(), Object::Float(6.5));
    let nodes = vec![ExprRep::unknown(0, 3, "tau"), op(4, "+"), ExprRep::obj(6, 3, Object::Float(0.5))];
    let compiled = CompiledExpr::new(nodes, vec![], Arc::new(HostModel::new()), settings).unwrap();
    assert_eq!(compiled.eval(vec![]).unwrap(), Object::Float(7.0));
}

#[test]
fn missing_input_count_is_rejected() {
    let nodes = vec![ExprRep::unknown(0, 1, "x")];
    let compiled = compile(nodes, &["x"]).unwrap();
    let err = compiled.eval(vec![]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedCase);
}

#[test]
fn unsupplied_promise_errors_in_final_reduction() {
    let model = HostModel::new();
    let settings = ReduceSettings::new();
    let mut env = Bindings::new();
    env.set_coming_later("x");
    let nodes = vec![ExprRep::unknown(3, 1, "x")];
    let err = reduce_nodes(nodes, &env, &model, &settings, true, &mut barb::tracer::NoopTracer).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnboundName);
    assert_eq!(err.offset, 3);
}
