//! The reduction engine: list walker, single-node resolver, and the
//! precedence-aware triple rule.
//!
//! The walker keeps a LIFO stack of already-inspected nodes (`left`, most
//! recent last) and a queue of pending nodes (`right`). Each step tries, in
//! order: trivial-wrapper flattening, lifting of unresolved nodes, `let`
//! binding, a single-node rewrite, a pairwise rewrite, and (in final
//! reductions) the precedence triple rule. On success the result goes back to
//! the head of `right` and the step restarts; when nothing matches, one node
//! shifts from `right` to `left`. The pass ends when `right` is empty and the
//! residual is `left` in source order.

use std::{collections::VecDeque, sync::Arc};

use crate::{
    bindings::{BindingContents, Bindings},
    errors::{BarbExecutionError, ErrorKind, ReduceResult},
    expressions::{render_nodes, ExprKind, ExprRep, LambdaRep, Resolution, SourceSpan},
    host::{normalize_result, HostModel},
    object::{ArrayObject, NumericSeq, Object},
    settings::ReduceSettings,
    tracer::{ReduceTracer, RuleKind},
};

/// One reduction pass over a node list.
///
/// Holds the pieces every rule needs: the host model, the settings, the pass
/// mode, and the tracer. A non-final pass tolerates pending names and leaves
/// unresolved residue; a final pass must resolve everything.
pub(crate) struct Reducer<'a, Tr: ReduceTracer> {
    pub(crate) model: &'a HostModel,
    pub(crate) settings: &'a ReduceSettings,
    pub(crate) final_reduction: bool,
    pub(crate) tracer: &'a mut Tr,
}

/// Result of offering one node to the single-node resolver.
enum Single {
    /// The node was rewritten; the replacement goes back to the queue head.
    Rewritten(ExprRep),
    /// No rule applied; the node is handed back untouched.
    Untouched(ExprRep),
}

impl<'a, Tr: ReduceTracer> Reducer<'a, Tr> {
    pub(crate) fn new(
        model: &'a HostModel,
        settings: &'a ReduceSettings,
        final_reduction: bool,
        tracer: &'a mut Tr,
    ) -> Self {
        Self {
            model,
            settings,
            final_reduction,
            tracer,
        }
    }

    /// Walks `nodes` to a fixpoint under `env`, returning the residual list
    /// in source order.
    pub(crate) fn reduce(&mut self, nodes: Vec<ExprRep>, env: &Bindings) -> ReduceResult<Vec<ExprRep>> {
        // Every pass starts from a clean slate: resolution tags describe the
        // progress of the pass that assigned them, not this one.
        let mut right: VecDeque<ExprRep> = nodes
            .into_iter()
            .map(|mut node| {
                node.resolution = Resolution::Pending;
                node
            })
            .collect();
        let mut left: Vec<ExprRep> = Vec::new();

        loop {
            // Trivial one-element groupings are unwrapped at either end.
            if let Some(head) = right.front() {
                if let ExprKind::SubExpression(inner) = &head.kind {
                    if inner.len() == 1 {
                        let span = head.span;
                        let ExprKind::SubExpression(mut inner) = right.pop_front().expect("head checked").kind else {
                            unreachable!()
                        };
                        self.tracer.on_rule(RuleKind::Flatten, span);
                        right.push_front(inner.pop().expect("length checked"));
                        continue;
                    }
                }
            }
            if let Some(top) = left.last() {
                if let ExprKind::SubExpression(inner) = &top.kind {
                    if inner.len() == 1 {
                        let span = top.span;
                        let ExprKind::SubExpression(mut inner) = left.pop().expect("top checked").kind else {
                            unreachable!()
                        };
                        self.tracer.on_rule(RuleKind::Flatten, span);
                        left.push(inner.pop().expect("length checked"));
                        continue;
                    }
                }
            }

            // Unresolved nodes move aside; they are candidates for pairwise
            // rules from the left and for the next pass, but retrying the
            // single-node rules on them now would loop. The tag stays on the
            // node so residue reads as unresolved; the next pass's entry
            // reset clears it.
            if right.front().is_some_and(|node| node.resolution == Resolution::Unresolved) {
                let node = right.pop_front().expect("head checked");
                self.tracer.on_rule(RuleKind::Lift, node.span);
                left.push(node);
                continue;
            }

            // Lexical binding: reduce the value, bind it, splice the reduced
            // scope back in. The outer environment is untouched.
            if matches!(right.front().map(|node| &node.kind), Some(ExprKind::BVar { .. })) {
                let node = right.pop_front().expect("head checked");
                let span = node.span;
                let ExprKind::BVar { name, value, scope } = node.kind else {
                    unreachable!()
                };
                self.tracer.on_rule(RuleKind::Binding, span);
                let bound = self
                    .reduce_child(*value, env)
                    .map_err(|e| e.with_trace(context_trace(&left, &right)))?;
                let mut scope_env = env.clone();
                if !self.final_reduction && matches!(bound.kind, ExprKind::Lambda(_)) {
                    let ExprKind::Lambda(lambda) = &bound.kind else { unreachable!() };
                    let recursive = self.tie_recursive_lambda(&name, lambda, env)?;
                    scope_env.set_node(name, ExprRep::from_span(bound.span, ExprKind::Lambda(recursive)));
                } else {
                    scope_env.set_node(name, bound);
                }
                let scope_nodes = self
                    .reduce(vec![*scope], &scope_env)
                    .map_err(|e| e.with_trace(context_trace(&left, &right)))?;
                for node in scope_nodes.into_iter().rev() {
                    right.push_front(node);
                }
                continue;
            }

            // Single-node rules.
            if let Some(head) = right.pop_front() {
                let outcome = self
                    .resolve_single(head, left.last(), env)
                    .map_err(|e| e.with_trace(context_trace(&left, &right)))?;
                match outcome {
                    Single::Rewritten(node) => {
                        self.tracer.on_rule(RuleKind::Single, node.span);
                        right.push_front(node);
                        continue;
                    }
                    Single::Untouched(node) => right.push_front(node),
                }
            }

            // Pairwise rules across the stack boundary.
            if let (Some(l), Some(r)) = (left.last(), right.front()) {
                let paired = self
                    .try_pair(l, r)
                    .map_err(|e| e.with_trace(context_trace(&left, &right)))?;
                if let Some(node) = paired {
                    self.tracer.on_rule(RuleKind::Pairwise, node.span);
                    left.pop();
                    right.pop_front();
                    right.push_front(node);
                    continue;
                }
            }

            // Precedence triple, final reductions only.
            if self.final_reduction && left.len() >= 2 && !right.is_empty() {
                let folded = self
                    .try_triple(&left, &right)
                    .map_err(|e| e.with_trace(context_trace(&left, &right)))?;
                if let Some(node) = folded {
                    self.tracer.on_rule(RuleKind::Triple, node.span);
                    left.pop();
                    left.pop();
                    right.pop_front();
                    right.push_front(node);
                    continue;
                }
            }

            // Nothing matched: shift, or finish when the queue is empty.
            match right.pop_front() {
                Some(node) => {
                    self.tracer.on_rule(RuleKind::Shift, node.span);
                    left.push(node);
                }
                None => break,
            }
        }

        Ok(left)
    }

    /// Reduces one child expression to a single node, wrapping a multi-node
    /// residue as an unresolved grouping.
    pub(crate) fn reduce_child(&mut self, node: ExprRep, env: &Bindings) -> ReduceResult<ExprRep> {
        let span = node.span;
        let reduced = self.reduce(vec![node], env)?;
        Ok(collapse(reduced, span))
    }

    /// Reduces each child independently, reporting whether every one became a
    /// resolved value.
    fn reduce_children(&mut self, children: Vec<ExprRep>, env: &Bindings) -> ReduceResult<(Vec<ExprRep>, bool)> {
        let mut reduced = Vec::with_capacity(children.len());
        for child in children {
            reduced.push(self.reduce_child(child, env)?);
        }
        let all_obj = reduced.iter().all(ExprRep::is_obj);
        Ok((reduced, all_obj))
    }

    /// Ties the recursive knot for a `let`-bound lambda.
    ///
    /// The lambda body is specialized once under the environment with its
    /// parameter shadows stripped, then rebuilt with a weak self-reference
    /// under the bound name so that call sites inside the body resolve the
    /// name to this same lambda value.
    fn tie_recursive_lambda(
        &mut self,
        name: &Arc<str>,
        lambda: &Arc<LambdaRep>,
        env: &Bindings,
    ) -> ReduceResult<Arc<LambdaRep>> {
        let stripped = env.without(&lambda.params);
        let body_env = stripped.merged(&lambda.bindings);
        let body = self.reduce_child(lambda.body.clone(), &body_env)?;
        let params = lambda.params.clone();
        let outer_bindings = lambda.bindings.clone();
        Ok(Arc::new_cyclic(|weak| {
            let mut bindings = outer_bindings;
            bindings.set_self_lambda(Arc::clone(name), weak.clone());
            LambdaRep { params, bindings, body }
        }))
    }

    /// Rewrites one node in isolation, if a rule applies.
    fn resolve_single(&mut self, node: ExprRep, prev: Option<&ExprRep>, env: &Bindings) -> ReduceResult<Single> {
        let span = node.span;
        let resolution = node.resolution;
        match node.kind {
            // Host-call output normalizes to a value before anything else
            // inspects it.
            ExprKind::Returned(value) => Ok(Single::Rewritten(ExprRep::from_span(
                span,
                ExprKind::Obj(normalize_result(value)),
            ))),

            ExprKind::SubExpression(children) => {
                let reduced = self.reduce(children, env)?;
                if reduced.len() == 1 {
                    Ok(Single::Rewritten(reduced.into_iter().next().expect("length checked")))
                } else {
                    Ok(Single::Rewritten(ExprRep::tagged(
                        span,
                        Resolution::Unresolved,
                        ExprKind::SubExpression(reduced),
                    )))
                }
            }

            ExprKind::Tuple(children) if resolution == Resolution::Pending => {
                let (reduced, all_obj) = self.reduce_children(children, env)?;
                let state = if all_obj { Resolution::Resolved } else { Resolution::Unresolved };
                Ok(Single::Rewritten(ExprRep::tagged(span, state, ExprKind::Tuple(reduced))))
            }

            ExprKind::IndexArgs(children) if resolution == Resolution::Pending => {
                let (reduced, all_obj) = self.reduce_children(children, env)?;
                let state = if all_obj { Resolution::Resolved } else { Resolution::Unresolved };
                Ok(Single::Rewritten(ExprRep::tagged(span, state, ExprKind::IndexArgs(reduced))))
            }

            ExprKind::ArrayBuilder(children) if resolution == Resolution::Pending => {
                let (reduced, all_obj) = self.reduce_children(children, env)?;
                if all_obj {
                    let items: Vec<Object> = reduced
                        .iter()
                        .map(|child| child.as_obj().cloned().expect("all children are values"))
                        .collect();
                    Ok(Single::Rewritten(ExprRep::from_span(
                        span,
                        ExprKind::Obj(Object::Array(ArrayObject::from_items(items))),
                    )))
                } else {
                    Ok(Single::Rewritten(ExprRep::tagged(
                        span,
                        Resolution::Unresolved,
                        ExprKind::ArrayBuilder(reduced),
                    )))
                }
            }

            ExprKind::Unknown(name) => self.resolve_unknown(name, span, prev, env),

            ExprKind::Generator { start, step, end } if resolution == Resolution::Pending => {
                self.resolve_generator(span, *start, *step, *end, env)
            }

            ExprKind::IfThenElse { condition, then, otherwise } if resolution == Resolution::Pending => {
                let condition = self.reduce_child(*condition, env)?;
                match condition.as_obj().and_then(Object::as_bool) {
                    Some(chosen) => {
                        let branch = if chosen { then } else { otherwise };
                        let reduced = self.reduce_child(*branch, env)?;
                        Ok(Single::Rewritten(reduced))
                    }
                    None => {
                        let then = self.reduce_child(*then, env)?;
                        let otherwise = self.reduce_child(*otherwise, env)?;
                        Ok(Single::Rewritten(ExprRep::tagged(
                            span,
                            Resolution::Unresolved,
                            ExprKind::IfThenElse {
                                condition: Box::new(condition),
                                then: Box::new(then),
                                otherwise: Box::new(otherwise),
                            },
                        )))
                    }
                }
            }

            ExprKind::Lambda(lambda) if lambda.params.is_empty() => {
                let body_env = env.merged(&lambda.bindings);
                let reduced = self.reduce(vec![lambda.body.clone()], &body_env)?;
                if reduced.len() == 1 {
                    Ok(Single::Rewritten(reduced.into_iter().next().expect("length checked")))
                } else {
                    Ok(Single::Untouched(ExprRep::tagged(span, resolution, ExprKind::Lambda(lambda))))
                }
            }

            ExprKind::And { left, right } if resolution == Resolution::Pending => {
                self.resolve_connective(span, *left, *right, env, true)
            }

            ExprKind::Or { left, right } if resolution == Resolution::Pending => {
                self.resolve_connective(span, *left, *right, env, false)
            }

            ExprKind::AppliedProperty { target, property } => {
                self.tracer.on_host_call(property.name(), span);
                let value = property
                    .read(&target)
                    .map_err(|msg| BarbExecutionError::host_failure(msg, span))?;
                Ok(Single::Rewritten(ExprRep::from_span(span, ExprKind::Returned(value))))
            }

            ExprKind::AppliedMultiProperty { targets } => {
                let mut reads = Vec::with_capacity(targets.len());
                for (target, property) in &targets {
                    self.tracer.on_host_call(property.name(), span);
                    let value = property
                        .read(target)
                        .map_err(|msg| BarbExecutionError::host_failure(msg, span))?;
                    reads.push(ExprRep::from_span(span, ExprKind::Obj(normalize_result(value))));
                }
                Ok(Single::Rewritten(ExprRep::from_span(span, ExprKind::ArrayBuilder(reads))))
            }

            kind => Ok(Single::Untouched(ExprRep::tagged(span, resolution, kind))),
        }
    }

    /// Looks up an identifier in the environment.
    ///
    /// Names in member or constructor position (directly after `.` or `new`)
    /// and names of registered host types are not variable references and are
    /// left for the pairwise rules.
    fn resolve_unknown(
        &mut self,
        name: Arc<str>,
        span: SourceSpan,
        prev: Option<&ExprRep>,
        env: &Bindings,
    ) -> ReduceResult<Single> {
        let untouched = |name: Arc<str>| Single::Untouched(ExprRep::from_span(span, ExprKind::Unknown(name)));
        match env.get(&name) {
            Some(BindingContents::Existing(bound)) => Ok(Single::Rewritten(bound.at(span))),
            Some(BindingContents::SelfLambda(weak)) => match weak.upgrade() {
                Some(lambda) => Ok(Single::Rewritten(ExprRep::from_span(span, ExprKind::Lambda(lambda)))),
                None => Ok(untouched(name)),
            },
            Some(BindingContents::ComingLater) => {
                if self.final_reduction {
                    Err(BarbExecutionError::new(
                        ErrorKind::UnboundName,
                        format!("name '{name}' was promised but never supplied"),
                        span,
                    ))
                } else {
                    Ok(untouched(name))
                }
            }
            None => {
                let member_position = matches!(prev.map(|p| &p.kind), Some(ExprKind::Invoke | ExprKind::New));
                if member_position || self.model.is_known_type(self.settings.namespace_refs(), &name) {
                    return Ok(untouched(name));
                }
                if self.final_reduction {
                    Err(BarbExecutionError::new(
                        ErrorKind::UnknownName,
                        format!("name '{name}' is not defined"),
                        span,
                    ))
                } else {
                    Ok(untouched(name))
                }
            }
        }
    }

    fn resolve_generator(
        &mut self,
        span: SourceSpan,
        start: ExprRep,
        step: ExprRep,
        end: ExprRep,
        env: &Bindings,
    ) -> ReduceResult<Single> {
        let start = self.reduce_child(start, env)?;
        let step = self.reduce_child(step, env)?;
        let end = self.reduce_child(end, env)?;
        let bounds = (start.as_obj(), step.as_obj(), end.as_obj());
        if let (Some(a), Some(b), Some(c)) = bounds {
            let seq = match (a, b, c) {
                (Object::Int(_), Object::Int(0), Object::Int(_)) => {
                    return Err(BarbExecutionError::new(
                        ErrorKind::BadGeneratorTypes,
                        "generator step must not be zero",
                        step.span,
                    ));
                }
                (Object::Int(start), Object::Int(step), Object::Int(end)) => NumericSeq::Int {
                    start: *start,
                    step: *step,
                    end: *end,
                },
                (Object::Float(_), Object::Float(step), Object::Float(_)) if *step == 0.0 => {
                    return Err(BarbExecutionError::new(
                        ErrorKind::BadGeneratorTypes,
                        "generator step must not be zero",
                        span,
                    ));
                }
                (Object::Float(start), Object::Float(step), Object::Float(end)) => NumericSeq::Float {
                    start: *start,
                    step: *step,
                    end: *end,
                },
                (Object::Int(_) | Object::Float(_), Object::Int(_) | Object::Float(_), Object::Int(_) | Object::Float(_)) => {
                    return Err(BarbExecutionError::new(
                        ErrorKind::BadGeneratorTypes,
                        "generator bounds must share one numeric kind",
                        span,
                    ));
                }
                _ => {
                    return Err(BarbExecutionError::new(
                        ErrorKind::BadGeneratorTypes,
                        format!(
                            "generator bounds must be numeric, got {}, {} and {}",
                            a.type_name(),
                            b.type_name(),
                            c.type_name()
                        ),
                        span,
                    ));
                }
            };
            return Ok(Single::Rewritten(ExprRep::from_span(
                span,
                ExprKind::Obj(Object::Seq(seq)),
            )));
        }
        if self.final_reduction {
            return Err(BarbExecutionError::new(
                ErrorKind::GeneratorArgUnresolved,
                "generator bounds did not resolve",
                span,
            ));
        }
        Ok(Single::Rewritten(ExprRep::tagged(
            span,
            Resolution::Unresolved,
            ExprKind::Generator {
                start: Box::new(start),
                step: Box::new(step),
                end: Box::new(end),
            },
        )))
    }

    /// Short-circuit evaluation for `and` (`conjunction == true`) and `or`.
    ///
    /// Operands are strictly booleans or null: null propagates, `false`
    /// decides `and`, `true` decides `or`, and the right operand is only
    /// evaluated when the left cannot decide the result.
    fn resolve_connective(
        &mut self,
        span: SourceSpan,
        left: ExprRep,
        right: ExprRep,
        env: &Bindings,
        conjunction: bool,
    ) -> ReduceResult<Single> {
        let connective = if conjunction { "and" } else { "or" };
        let kind = if conjunction { ErrorKind::AndLhsNotBool } else { ErrorKind::OrLhsNotBool };
        let left = self.reduce_child(left, env)?;
        match left.as_obj() {
            Some(Object::Null) => {
                self.tracer.on_short_circuit(connective, span);
                Ok(Single::Rewritten(ExprRep::from_span(span, ExprKind::Obj(Object::Null))))
            }
            Some(Object::Bool(decided)) if *decided != conjunction => {
                self.tracer.on_short_circuit(connective, span);
                Ok(Single::Rewritten(ExprRep::from_span(
                    span,
                    ExprKind::Obj(Object::Bool(*decided)),
                )))
            }
            Some(Object::Bool(_)) => {
                let right = self.reduce_child(right, env)?;
                match right.as_obj() {
                    Some(Object::Bool(_) | Object::Null) => Ok(Single::Rewritten(right)),
                    Some(other) => {
                        if self.final_reduction {
                            Err(BarbExecutionError::new(
                                kind,
                                format!(
                                    "right operand of '{connective}' must be a boolean or null, got {}",
                                    other.type_name()
                                ),
                                right.span,
                            ))
                        } else {
                            Ok(Single::Rewritten(rebuild_connective(span, left, right, conjunction)))
                        }
                    }
                    None => {
                        if self.final_reduction {
                            Err(BarbExecutionError::new(
                                kind,
                                format!("right operand of '{connective}' did not resolve"),
                                right.span,
                            ))
                        } else {
                            Ok(Single::Rewritten(rebuild_connective(span, left, right, conjunction)))
                        }
                    }
                }
            }
            Some(other) => {
                if self.final_reduction {
                    Err(BarbExecutionError::new(
                        kind,
                        format!(
                            "left operand of '{connective}' must be a boolean or null, got {}",
                            other.type_name()
                        ),
                        left.span,
                    ))
                } else {
                    let right = self.reduce_child(right, env)?;
                    Ok(Single::Rewritten(rebuild_connective(span, left, right, conjunction)))
                }
            }
            None => {
                // Left is still pending; in a final pass its own reduction
                // raised already, so this branch only runs non-finally.
                let right = self.reduce_child(right, env)?;
                if self.final_reduction {
                    Err(BarbExecutionError::new(
                        kind,
                        format!("left operand of '{connective}' did not resolve"),
                        left.span,
                    ))
                } else {
                    Ok(Single::Rewritten(rebuild_connective(span, left, right, conjunction)))
                }
            }
        }
    }

    /// Folds `Obj(a) Infix Obj(b)` across the stack boundary when precedence
    /// allows.
    ///
    /// The stack top (`left₀`) is the operator and the node under it
    /// (`left₁`) the left operand. Reduction happens when the queue holds no
    /// following infix operator, or the following operator does not bind
    /// tighter; equal levels reduce left first.
    fn try_triple(&mut self, left: &[ExprRep], right: &VecDeque<ExprRep>) -> ReduceResult<Option<ExprRep>> {
        let operator_node = &left[left.len() - 1];
        let operand_node = &left[left.len() - 2];
        let right0 = right.front().expect("caller checked");
        let ExprKind::Infix(op) = &operator_node.kind else {
            return Ok(None);
        };
        let (ExprKind::Obj(a), ExprKind::Obj(b)) = (&operand_node.kind, &right0.kind) else {
            return Ok(None);
        };
        match right.get(1).map(|node| &node.kind) {
            None => {}
            Some(ExprKind::Infix(next)) if op.precedence <= next.precedence => {}
            Some(_) => return Ok(None),
        }
        let span = operand_node.span.merge(right0.span);
        self.tracer.on_host_call(&op.symbol, operator_node.span);
        let value = op
            .apply(a, b)
            .map_err(|msg| BarbExecutionError::host_failure(msg, operator_node.span))?;
        Ok(Some(ExprRep::from_span(span, ExprKind::Obj(normalize_result(value)))))
    }
}

fn rebuild_connective(span: SourceSpan, left: ExprRep, right: ExprRep, conjunction: bool) -> ExprRep {
    let kind = if conjunction {
        ExprKind::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    } else {
        ExprKind::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    };
    ExprRep::tagged(span, Resolution::Unresolved, kind)
}

/// Wraps a multi-node residue as an unresolved grouping spanning the
/// original node.
fn collapse(mut nodes: Vec<ExprRep>, span: SourceSpan) -> ExprRep {
    match nodes.len() {
        0 => ExprRep::from_span(span, ExprKind::Unit),
        1 => nodes.pop().expect("length checked"),
        _ => ExprRep::tagged(span, Resolution::Unresolved, ExprKind::SubExpression(nodes)),
    }
}

/// Renders the walker state for error traces.
fn context_trace(left: &[ExprRep], right: &VecDeque<ExprRep>) -> String {
    let pending: Vec<ExprRep> = right.iter().cloned().collect();
    format!("{} | {}", render_nodes(left), render_nodes(&pending))
}

/// Extracts the final value from a reduced node list.
///
/// Exactly one node must remain: a value yields itself, a tuple of values
/// yields the value sequence, anything else is reported with the residual
/// quoted.
pub(crate) fn extract_result(nodes: &[ExprRep]) -> ReduceResult<Object> {
    if let [node] = nodes {
        match &node.kind {
            ExprKind::Obj(value) => return Ok(value.clone()),
            ExprKind::Tuple(children) => {
                if let Some(values) = children.iter().map(|c| c.as_obj().cloned()).collect::<Option<Vec<_>>>() {
                    return Ok(Object::Tuple(values));
                }
            }
            _ => {}
        }
    }
    Err(unexpected_result(nodes))
}

/// Checks the terminal catch-all for a final pass: with `fail_on_catch_all`
/// set, residue that cannot be extracted raises `unexpected-case`. A
/// non-final pass never takes this path and always returns its residue.
pub(crate) fn check_catch_all(nodes: &[ExprRep], settings: &ReduceSettings) -> ReduceResult<()> {
    if settings.fail_on_catch_all && extract_result(nodes).is_err() {
        let mut err = unexpected_result(nodes);
        err.kind = ErrorKind::UnexpectedCase;
        err.message = format!("no reduction rule applies to the residual '{}'", render_nodes(nodes));
        return Err(err);
    }
    Ok(())
}

fn unexpected_result(nodes: &[ExprRep]) -> BarbExecutionError {
    let span = nodes
        .iter()
        .map(|node| node.span)
        .reduce(SourceSpan::merge)
        .unwrap_or(SourceSpan::new(0, 0));
    BarbExecutionError::new(
        ErrorKind::UnexpectedResult,
        format!("reduction did not produce a single value; residual: '{}'", render_nodes(nodes)),
        span,
    )
    .with_trace(render_nodes(nodes))
}
