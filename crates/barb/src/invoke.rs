//! The pairwise reducer: rewrites two adjacent nodes into one.
//!
//! Rules match on `(stack top, queue head)` shapes: operator application,
//! member resolution and invocation against the host model, constructor
//! calls, indexers, null propagation through member access, and lambda
//! partial application. Every host-call failure is translated to a
//! [`BarbExecutionError`] carrying the right-hand operand's source span.

use std::sync::Arc;

use crate::{
    errors::{BarbExecutionError, ErrorKind, ReduceResult},
    expressions::{ExprKind, ExprRep, Invokable, Resolution, SourceSpan},
    host::{normalize_result, MethodList, ResolvedMember},
    object::Object,
    reduce::Reducer,
    tracer::ReduceTracer,
};

/// Argument shapes accepted to the right of an invokable.
enum CallArgs {
    Unit,
    Single(Object),
    Tuple(Vec<Object>),
}

impl CallArgs {
    fn from_node(node: &ExprRep) -> ReduceResult<Option<Self>> {
        match &node.kind {
            ExprKind::Unit => Ok(Some(Self::Unit)),
            ExprKind::Obj(value) => Ok(Some(Self::Single(value.clone()))),
            ExprKind::Tuple(children) if node.resolution == Resolution::Resolved => {
                Ok(Some(Self::Tuple(tuple_values(children, node.span)?)))
            }
            _ => Ok(None),
        }
    }

    fn values(self) -> Vec<Object> {
        match self {
            Self::Unit => Vec::new(),
            Self::Single(value) => vec![value],
            Self::Tuple(values) => values,
        }
    }
}

/// Whether a node can serve as a constructor argument list: a single value
/// or a resolved tuple.
fn is_constructor_args(node: &ExprRep) -> bool {
    match &node.kind {
        ExprKind::Obj(_) => true,
        ExprKind::Tuple(_) => node.resolution == Resolution::Resolved,
        _ => false,
    }
}

/// Reads the values out of a resolved container. Resolved containers hold
/// only values; anything else indicates a broken invariant and is reported
/// rather than ignored.
fn tuple_values(children: &[ExprRep], span: SourceSpan) -> ReduceResult<Vec<Object>> {
    children
        .iter()
        .map(|child| {
            child.as_obj().cloned().ok_or_else(|| {
                BarbExecutionError::new(
                    ErrorKind::UnexpectedCase,
                    format!("resolved container holds a non-value node '{child}'"),
                    span,
                )
            })
        })
        .collect()
}

impl<Tr: ReduceTracer> Reducer<'_, Tr> {
    /// Rewrites `(left, right)` into one node, if a rule applies.
    ///
    /// The result spans both inputs.
    pub(crate) fn try_pair(&mut self, left: &ExprRep, right: &ExprRep) -> ReduceResult<Option<ExprRep>> {
        let span = left.span.merge(right.span);
        match (&left.kind, &right.kind) {
            // Operator application.
            (ExprKind::Obj(operand), ExprKind::Postfix(op)) => {
                self.tracer.on_host_call(&op.symbol, right.span);
                let value = op
                    .apply(operand)
                    .map_err(|msg| BarbExecutionError::host_failure(msg, right.span))?;
                Ok(Some(ExprRep::from_span(span, ExprKind::Returned(value))))
            }
            (ExprKind::Prefix(op), ExprKind::Obj(operand)) => {
                self.tracer.on_host_call(&op.symbol, right.span);
                let value = op
                    .apply(operand)
                    .map_err(|msg| BarbExecutionError::host_failure(msg, right.span))?;
                Ok(Some(ExprRep::from_span(span, ExprKind::Returned(value))))
            }

            // Method invocation.
            (ExprKind::Invokable(Invokable::Method { target, methods }), _) => {
                let Some(args) = CallArgs::from_node(right)? else {
                    return Ok(None);
                };
                let value = self.call_method(target, methods, &args.values(), right.span)?;
                Ok(Some(ExprRep::from_span(span, ExprKind::Returned(value))))
            }

            // Broadcast invocation: one call per collected target, results
            // gathered into an array.
            (ExprKind::Invokable(Invokable::MultiMethod { targets }), _) => {
                let Some(args) = CallArgs::from_node(right)? else {
                    return Ok(None);
                };
                let args = args.values();
                let mut results = Vec::with_capacity(targets.len());
                for (target, methods) in targets {
                    let value = self.call_method(target, methods, &args, right.span)?;
                    results.push(ExprRep::from_span(right.span, ExprKind::Obj(normalize_result(value))));
                }
                Ok(Some(ExprRep::from_span(span, ExprKind::ArrayBuilder(results))))
            }

            // Static member resolution on an unbound root name.
            (ExprKind::Unknown(root), ExprKind::AppliedInvoke { depth: 0, name })
                if self.final_reduction || self.settings.bind_globals_when_reducing =>
            {
                self.resolve_static(root, name, span, right.span)
            }
            (ExprKind::Unknown(root), ExprKind::AppliedInvoke { depth, .. }) if *depth > 0 => {
                if self.model.is_known_type(self.settings.namespace_refs(), root) {
                    Err(BarbExecutionError::new(
                        ErrorKind::StaticDepthUnsupported,
                        format!("nested-collection invocation is not supported on the static root '{root}'"),
                        span,
                    ))
                } else {
                    Ok(None)
                }
            }

            // Constructor syntax: `new T` is sugar for `T`.
            (ExprKind::New, ExprKind::Unknown(type_name)) => Ok(Some(ExprRep::from_span(
                span,
                ExprKind::Unknown(Arc::clone(type_name)),
            ))),

            // Constructor call on a type name.
            (ExprKind::Unknown(type_name), _) if is_constructor_args(right) => {
                let args = CallArgs::from_node(right)?.expect("shape checked in guard");
                let Some(result) =
                    self.model
                        .execute_constructor(&self.settings.namespace_refs(), type_name, &args.values())
                else {
                    return Ok(None);
                };
                self.tracer.on_host_call(type_name, right.span);
                let value = result.map_err(|msg| BarbExecutionError::host_failure(msg, right.span))?;
                Ok(Some(ExprRep::from_span(span, ExprKind::Returned(value))))
            }

            // Member-access plumbing.
            (ExprKind::Invoke, ExprKind::Unknown(name)) => Ok(Some(ExprRep::from_span(
                span,
                ExprKind::AppliedInvoke {
                    depth: 0,
                    name: Arc::clone(name),
                },
            ))),
            (ExprKind::Invoke, ExprKind::IndexArgs(_)) => {
                // Dot-index syntax: the dot adds nothing.
                let mut passthrough = right.clone();
                passthrough.span = span;
                Ok(Some(passthrough))
            }
            (ExprKind::Invoke, ExprKind::AppliedInvoke { depth, name }) => Ok(Some(ExprRep::from_span(
                span,
                ExprKind::AppliedInvoke {
                    depth: depth + 1,
                    name: Arc::clone(name),
                },
            ))),

            // Null propagates through member access.
            (ExprKind::Obj(Object::Null), ExprKind::AppliedInvoke { .. }) => {
                Ok(Some(ExprRep::from_span(span, ExprKind::Obj(Object::Null))))
            }

            // Instance member resolution.
            (ExprKind::Obj(target), ExprKind::AppliedInvoke { depth: 0, name }) => {
                let member = self.model.resolve_invoke_by_instance(target, name).ok_or_else(|| {
                    BarbExecutionError::host_failure(
                        format!("type {} has no member named '{name}'", target.type_name()),
                        right.span,
                    )
                })?;
                let kind = match member {
                    ResolvedMember::Value(value) => ExprKind::Obj(normalize_result(value)),
                    ResolvedMember::Property(property) => ExprKind::AppliedProperty {
                        target: target.clone(),
                        property,
                    },
                    ResolvedMember::IndexedProperty(property) => ExprKind::AppliedIndexedProperty {
                        target: target.clone(),
                        property,
                    },
                    ResolvedMember::Methods(methods) => ExprKind::Invokable(Invokable::Method {
                        target: target.clone(),
                        methods,
                    }),
                };
                Ok(Some(ExprRep::from_span(span, kind)))
            }

            // Nested-collection member resolution: descend `depth` levels and
            // resolve against every element.
            (ExprKind::Obj(target), ExprKind::AppliedInvoke { depth, name }) => {
                let resolved = self
                    .model
                    .resolve_invoke_at_depth(*depth, target, name)
                    .map_err(|msg| BarbExecutionError::host_failure(msg, right.span))?;
                Ok(Some(self.collect_multi_members(resolved, name, span)?))
            }

            // Indexing.
            (ExprKind::AppliedIndexedProperty { target, property }, ExprKind::IndexArgs(children))
                if right.resolution == Resolution::Resolved =>
            {
                let args = tuple_values(children, right.span)?;
                self.tracer.on_host_call(property.name(), right.span);
                let value = self
                    .model
                    .execute_indexed_property(target, property, &args)
                    .map_err(|msg| BarbExecutionError::host_failure(msg, right.span))?;
                Ok(Some(ExprRep::from_span(span, ExprKind::Returned(value))))
            }
            (ExprKind::Obj(target), ExprKind::IndexArgs(children)) if right.resolution == Resolution::Resolved => {
                let args = tuple_values(children, right.span)?;
                let value = self.index_value(target, &args, right.span)?;
                Ok(Some(ExprRep::from_span(span, ExprKind::Returned(value))))
            }

            // Lambda partial application.
            (ExprKind::Lambda(lambda), ExprKind::Obj(value)) if !lambda.params.is_empty() => {
                let applied = lambda.applied(value.clone());
                Ok(Some(ExprRep::from_span(span, ExprKind::Lambda(applied))))
            }

            _ => Ok(None),
        }
    }

    fn call_method(
        &mut self,
        target: &Object,
        methods: &MethodList,
        args: &[Object],
        call_span: SourceSpan,
    ) -> ReduceResult<Object> {
        let name = methods.first().map_or("<method>", crate::host::MethodInfo::name);
        self.tracer.on_host_call(name, call_span);
        let result = if args.is_empty() {
            self.model.execute_unit_method(target, methods)
        } else {
            self.model.execute_parameterized_method(target, methods, args)
        };
        result.map_err(|msg| BarbExecutionError::host_failure(msg, call_span))
    }

    /// Resolves `root.name` as a static member across the configured
    /// namespaces. Exactly one match is expected; zero matches on a known
    /// type and multiple matches anywhere are errors, and an unregistered
    /// root is left for the environment to supply later.
    fn resolve_static(
        &mut self,
        root: &str,
        name: &str,
        span: SourceSpan,
        member_span: SourceSpan,
    ) -> ReduceResult<Option<ExprRep>> {
        let namespaces = self.settings.namespace_refs();
        let matches = self.model.cached_resolve_static(&namespaces, root, name);
        match matches.len() {
            0 => {
                if self.model.is_known_type(namespaces.iter().copied(), root) {
                    Err(BarbExecutionError::host_failure(
                        format!("type {root} has no static member named '{name}'"),
                        member_span,
                    ))
                } else {
                    Ok(None)
                }
            }
            1 => {
                let kind = match matches.into_iter().next().expect("length checked") {
                    crate::host::StaticMember::Value(value) => ExprKind::Obj(normalize_result(value)),
                    crate::host::StaticMember::Methods(methods) => ExprKind::Invokable(Invokable::Method {
                        target: Object::Null,
                        methods,
                    }),
                };
                Ok(Some(ExprRep::from_span(span, kind)))
            }
            _ => Err(BarbExecutionError::new(
                ErrorKind::AmbiguousStaticResolution,
                format!("static member '{root}.{name}' matched {} candidates across namespaces", matches.len()),
                span,
            )),
        }
    }

    /// Shapes a depth-descent resolution into a broadcast node; mixing
    /// properties and methods across elements is an error.
    fn collect_multi_members(
        &mut self,
        resolved: Vec<(Object, ResolvedMember)>,
        name: &str,
        span: SourceSpan,
    ) -> ReduceResult<ExprRep> {
        let mut properties = Vec::new();
        let mut methods = Vec::new();
        for (target, member) in resolved {
            match member {
                ResolvedMember::Property(property) => properties.push((target, property)),
                ResolvedMember::Methods(list) => methods.push((target, list)),
                ResolvedMember::Value(_) | ResolvedMember::IndexedProperty(_) => {
                    return Err(BarbExecutionError::host_failure(
                        format!("member '{name}' cannot be broadcast over a collection"),
                        span,
                    ));
                }
            }
        }
        match (properties.is_empty(), methods.is_empty()) {
            (false, true) => Ok(ExprRep::from_span(span, ExprKind::AppliedMultiProperty { targets: properties })),
            (true, false) => Ok(ExprRep::from_span(
                span,
                ExprKind::Invokable(Invokable::MultiMethod { targets: methods }),
            )),
            _ => Err(BarbExecutionError::new(
                ErrorKind::MixedPropertyMethodNestedInvoke,
                format!("member '{name}' resolved to both properties and methods across elements"),
                span,
            )),
        }
    }

    /// Indexes a resolved value: built-in positional indexing for arrays,
    /// tuples and strings, the registered indexer for host instances.
    fn index_value(&mut self, target: &Object, args: &[Object], index_span: SourceSpan) -> ReduceResult<Object> {
        match target {
            Object::Host(handle) => {
                let Some(indexer) = self.model.host_indexer(handle) else {
                    return Err(BarbExecutionError::host_failure(
                        format!("type {} has no indexer", handle.type_name()),
                        index_span,
                    ));
                };
                self.tracer.on_host_call("indexer", index_span);
                indexer(target, args)
                    .map(normalize_result)
                    .map_err(|msg| BarbExecutionError::host_failure(msg, index_span))
            }
            _ => target
                .index_builtin(args)
                .map_err(|msg| BarbExecutionError::new(ErrorKind::BadTupleIndex, msg, index_span)),
        }
    }
}
