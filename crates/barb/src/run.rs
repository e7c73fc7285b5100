//! Public interface for compiling and evaluating expressions.

use std::sync::Arc;

use crate::{
    bindings::Bindings,
    errors::{BarbExecutionError, ErrorKind, ReduceResult},
    expressions::{ExprKind, ExprRep, SourceSpan},
    host::HostModel,
    object::Object,
    reduce::{check_catch_all, extract_result, Reducer},
    settings::ReduceSettings,
    tracer::{NoopTracer, ReduceTracer},
};

/// Runs one reduction pass over a node list.
///
/// This is the raw engine entry point for callers that drive passes
/// themselves. The environment is copied and seeded with the settings'
/// additional bindings (explicit entries win); the residual nodes and the
/// seeded environment are returned. A final pass applies the
/// `fail_on_catch_all` check to the residue; a non-final pass always returns
/// it.
pub fn reduce_nodes<Tr: ReduceTracer>(
    nodes: Vec<ExprRep>,
    env: &Bindings,
    model: &HostModel,
    settings: &ReduceSettings,
    final_reduction: bool,
    tracer: &mut Tr,
) -> ReduceResult<(Vec<ExprRep>, Bindings)> {
    let mut seeded = env.clone();
    for (name, value) in &settings.additional_bindings {
        if !seeded.contains(name) {
            seeded.set_value(name.as_str(), value.clone());
        }
    }
    tracer.on_pass_start(final_reduction, nodes.len());
    let mut reducer = Reducer::new(model, settings, final_reduction, tracer);
    let reduced = reducer.reduce(nodes, &seeded)?;
    if final_reduction {
        check_catch_all(&reduced, settings)?;
    }
    tracer.on_pass_end(reduced.len());
    Ok((reduced, seeded))
}

/// A compiled expression: a specialized root node plus the captured
/// environment with pending placeholders for the declared inputs.
///
/// Construction runs one non-final pass, folding every host constant and
/// specializing lambdas; each [`eval`](Self::eval) copies the environment,
/// installs the input values, and runs a final pass. A compiled expression
/// is immutable and freely shareable across threads.
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use barb::{operators, CompiledExpr, ExprRep, HostModel, Object, ReduceSettings};
///
/// // x * 3 + 4, with `x` supplied per evaluation.
/// let nodes = vec![
///     ExprRep::unknown(0, 1, "x"),
///     operators::infix(2, 1, "*").unwrap(),
///     ExprRep::obj(4, 1, Object::Int(3)),
///     operators::infix(6, 1, "+").unwrap(),
///     ExprRep::obj(8, 1, Object::Int(4)),
/// ];
/// let model = Arc::new(HostModel::new());
/// let compiled = CompiledExpr::new(nodes, vec!["x".to_owned()], model, ReduceSettings::new()).unwrap();
/// assert_eq!(compiled.eval(vec![Object::Int(5)]).unwrap(), Object::Int(19));
/// ```
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    root: ExprRep,
    env: Bindings,
    input_names: Vec<String>,
    model: Arc<HostModel>,
    settings: ReduceSettings,
}

impl CompiledExpr {
    /// Compiles `nodes`, declaring `input_names` as values supplied later.
    ///
    /// The nodes are grouped under a single root spanning the whole input and
    /// specialized with one non-final pass.
    pub fn new(
        nodes: Vec<ExprRep>,
        input_names: Vec<String>,
        model: Arc<HostModel>,
        settings: ReduceSettings,
    ) -> ReduceResult<Self> {
        let span = nodes
            .iter()
            .map(|node| node.span)
            .reduce(SourceSpan::merge)
            .unwrap_or(SourceSpan::new(0, 0));
        let root = ExprRep::from_span(span, ExprKind::SubExpression(nodes));
        let mut env = Bindings::new();
        for name in &input_names {
            env.set_coming_later(name.as_str());
        }
        let (reduced, env) = reduce_nodes(vec![root], &env, &model, &settings, false, &mut NoopTracer)?;
        let root = match <[ExprRep; 1]>::try_from(reduced) {
            Ok([single]) => single,
            Err(many) => ExprRep::from_span(span, ExprKind::SubExpression(many)),
        };
        Ok(Self {
            root,
            env,
            input_names,
            model,
            settings,
        })
    }

    /// Evaluates the expression with the given inputs, in declaration order.
    pub fn eval(&self, inputs: Vec<Object>) -> ReduceResult<Object> {
        self.eval_traced(inputs, &mut NoopTracer)
    }

    /// Evaluates with a tracer observing every reduction step.
    pub fn eval_traced<Tr: ReduceTracer>(&self, inputs: Vec<Object>, tracer: &mut Tr) -> ReduceResult<Object> {
        if inputs.len() != self.input_names.len() {
            return Err(BarbExecutionError::new(
                ErrorKind::UnexpectedCase,
                format!("expected {} input value(s), got {}", self.input_names.len(), inputs.len()),
                self.root.span,
            ));
        }
        let mut env = self.env.clone();
        for (name, value) in self.input_names.iter().zip(inputs) {
            env.set_value(name.as_str(), value);
        }
        let (reduced, _) = reduce_nodes(vec![self.root.clone()], &env, &self.model, &self.settings, true, tracer)?;
        extract_result(&reduced)
    }

    /// The specialized root node left by the compile-time pass.
    #[must_use]
    pub fn residual(&self) -> &ExprRep {
        &self.root
    }

    /// The declared input names, in order.
    #[must_use]
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }
}
