use std::{
    fmt,
    sync::{Arc, Weak},
};

use serde::{Deserialize, Serialize};

use crate::{
    bindings::Bindings,
    host::{HostResult, IndexedPropertyInfo, MethodList, PropertyInfo},
    object::Object,
};

/// Location of a node in the original source text.
///
/// Offsets and lengths are preserved across rewrites; when two nodes merge
/// into one, the result spans from the earlier offset through the later end,
/// so spans only ever grow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub offset: u32,
    pub length: u32,
}

impl SourceSpan {
    #[must_use]
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// One past the last source position covered.
    #[must_use]
    pub const fn end(self) -> u32 {
        self.offset + self.length
    }

    /// The smallest span covering both inputs.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        let offset = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Self::new(offset, end - offset)
    }
}

/// Custom Debug to keep node dumps compact.
impl fmt::Debug for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

/// Per-node resolution state.
///
/// A `Resolved` container holds only `Obj` children; an `Unresolved` node
/// still depends on pending inputs and is revisited on a later pass. Every
/// pass resets its input nodes to `Pending` on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    Pending,
    Resolved,
    Unresolved,
}

/// Unary operator function shared by nodes.
pub type UnaryFn = Arc<dyn Fn(&Object) -> HostResult + Send + Sync>;
/// Binary operator function shared by nodes.
pub type BinaryFn = Arc<dyn Fn(&Object, &Object) -> HostResult + Send + Sync>;

/// A host-supplied prefix operator.
#[derive(Clone)]
pub struct PrefixOp {
    pub symbol: Arc<str>,
    func: UnaryFn,
}

impl PrefixOp {
    pub fn new(symbol: impl Into<Arc<str>>, func: UnaryFn) -> Self {
        Self { symbol: symbol.into(), func }
    }

    pub(crate) fn apply(&self, operand: &Object) -> HostResult {
        (self.func)(operand)
    }
}

impl fmt::Debug for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrefixOp({})", self.symbol)
    }
}

/// A host-supplied postfix operator.
#[derive(Clone)]
pub struct PostfixOp {
    pub symbol: Arc<str>,
    func: UnaryFn,
}

impl PostfixOp {
    pub fn new(symbol: impl Into<Arc<str>>, func: UnaryFn) -> Self {
        Self { symbol: symbol.into(), func }
    }

    pub(crate) fn apply(&self, operand: &Object) -> HostResult {
        (self.func)(operand)
    }
}

impl fmt::Debug for PostfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostfixOp({})", self.symbol)
    }
}

/// A host-supplied infix operator with its precedence level.
///
/// Levels compare like C's: a lower level binds tighter. On equal levels the
/// left operator reduces first, giving left-to-right associativity.
#[derive(Clone)]
pub struct InfixOp {
    pub symbol: Arc<str>,
    pub precedence: i32,
    func: BinaryFn,
}

impl InfixOp {
    pub fn new(symbol: impl Into<Arc<str>>, precedence: i32, func: BinaryFn) -> Self {
        Self {
            symbol: symbol.into(),
            precedence,
            func,
        }
    }

    pub(crate) fn apply(&self, left: &Object, right: &Object) -> HostResult {
        (self.func)(left, right)
    }
}

impl fmt::Debug for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfixOp({}, {})", self.symbol, self.precedence)
    }
}

/// A resolved method handle that has not been called yet.
///
/// Awaits an argument tuple, the unit marker, or a single value to its right.
#[derive(Debug, Clone)]
pub enum Invokable {
    /// A method overload set bound to one target.
    Method { target: Object, methods: MethodList },
    /// Broadcast form: one overload set per collection element, produced by a
    /// nested-collection invocation. The call is applied to every target and
    /// the results collected into an array.
    MultiMethod { targets: Vec<(Object, MethodList)> },
}

/// A lambda value: parameter names, captured bindings, and a body template.
///
/// Partial application peels one parameter and extends the bindings; when no
/// parameters remain the body is reduced under the captured bindings. For a
/// recursive `let` binding the lambda's own bindings contain a weak
/// self-reference installed at construction (`Arc::new_cyclic`), so call
/// sites inside the body resolve the bound name to this same lambda value.
#[derive(Debug, Clone)]
pub struct LambdaRep {
    pub params: Vec<Arc<str>>,
    pub bindings: Bindings,
    pub body: ExprRep,
}

impl LambdaRep {
    /// Binds the first parameter to `value`, yielding the partially applied
    /// lambda.
    ///
    /// # Panics
    /// Panics if the lambda has no parameters left; callers check first.
    #[must_use]
    pub(crate) fn applied(&self, value: Object) -> Arc<Self> {
        let (first, rest) = self.params.split_first().expect("applied() requires a parameter");
        let mut bindings = self.bindings.clone();
        bindings.set_value(first.clone(), value);
        Arc::new(Self {
            params: rest.to_vec(),
            bindings,
            body: self.body.clone(),
        })
    }
}

/// The closed sum of node kinds.
///
/// Nodes are cheaply clonable: values, member handles, operator functions and
/// lambdas are all carried behind shared pointers.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Empty argument marker for unit method calls.
    Unit,
    /// A fully-resolved host value.
    Obj(Object),
    /// An identifier not yet resolved from the environment.
    Unknown(Arc<str>),
    /// Output of a host call. Transient: the resolver normalizes it to `Obj`
    /// on the next step, so later rules only ever inspect `Obj`.
    Returned(Object),
    /// Sentinel for the `.` syntax, awaiting a member name to its right.
    Invoke,
    /// Sentinel for constructor syntax. `new T` is sugar for `T`.
    New,
    /// A `.name` suffix waiting for a left-hand object. `depth` counts
    /// nested-collection invocations (`..name` has depth 1).
    AppliedInvoke { depth: u32, name: Arc<str> },
    Prefix(PrefixOp),
    Postfix(PostfixOp),
    Infix(InfixOp),
    /// Bracketed index arguments, unresolved form.
    IndexArgs(Vec<ExprRep>),
    /// A resolved instance property bound to its target, awaiting the read.
    AppliedProperty { target: Object, property: PropertyInfo },
    /// Broadcast property form from a nested-collection invocation.
    AppliedMultiProperty { targets: Vec<(Object, PropertyInfo)> },
    /// A parameterized property awaiting bracketed index arguments.
    AppliedIndexedProperty { target: Object, property: IndexedPropertyInfo },
    /// A resolved, not-yet-called method handle.
    Invokable(Invokable),
    /// A parenthesised or synthetic grouping.
    SubExpression(Vec<ExprRep>),
    Tuple(Vec<ExprRep>),
    ArrayBuilder(Vec<ExprRep>),
    /// Present in the data model for parser use; the reducer has no rule for
    /// it and passes it through as a residual node.
    SetBuilder(Vec<ExprRep>),
    /// Lexical `let name = value in scope`.
    BVar {
        name: Arc<str>,
        value: Box<ExprRep>,
        scope: Box<ExprRep>,
    },
    Lambda(Arc<LambdaRep>),
    IfThenElse {
        condition: Box<ExprRep>,
        then: Box<ExprRep>,
        otherwise: Box<ExprRep>,
    },
    /// Numeric range `{start .. step .. end}`.
    Generator {
        start: Box<ExprRep>,
        step: Box<ExprRep>,
        end: Box<ExprRep>,
    },
    /// Short-circuiting conjunction.
    And { left: Box<ExprRep>, right: Box<ExprRep> },
    /// Short-circuiting disjunction.
    Or { left: Box<ExprRep>, right: Box<ExprRep> },
}

/// An expression node: source span, resolution state, and kind.
#[derive(Debug, Clone)]
pub struct ExprRep {
    pub span: SourceSpan,
    pub resolution: Resolution,
    pub kind: ExprKind,
}

impl ExprRep {
    #[must_use]
    pub fn new(offset: u32, length: u32, kind: ExprKind) -> Self {
        Self::from_span(SourceSpan::new(offset, length), kind)
    }

    #[must_use]
    pub fn from_span(span: SourceSpan, kind: ExprKind) -> Self {
        Self {
            span,
            resolution: Resolution::Pending,
            kind,
        }
    }

    /// A resolved host value node.
    #[must_use]
    pub fn obj(offset: u32, length: u32, value: Object) -> Self {
        Self::new(offset, length, ExprKind::Obj(value))
    }

    /// An identifier node to be looked up in the environment.
    #[must_use]
    pub fn unknown(offset: u32, length: u32, name: &str) -> Self {
        Self::new(offset, length, ExprKind::Unknown(Arc::from(name)))
    }

    /// The empty argument marker.
    #[must_use]
    pub fn unit(offset: u32, length: u32) -> Self {
        Self::new(offset, length, ExprKind::Unit)
    }

    #[must_use]
    pub(crate) fn tagged(span: SourceSpan, resolution: Resolution, kind: ExprKind) -> Self {
        Self { span, resolution, kind }
    }

    /// Whether this node is a resolved value.
    #[must_use]
    pub fn is_obj(&self) -> bool {
        matches!(self.kind, ExprKind::Obj(_))
    }

    /// The value payload, if this node is a resolved value.
    #[must_use]
    pub fn as_obj(&self) -> Option<&Object> {
        match &self.kind {
            ExprKind::Obj(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ExprRep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.resolution == Resolution::Unresolved {
            f.write_str("?")?;
        }
        write!(f, "{}", self.kind)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[ExprRep], separator: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}

/// Source-like rendering used in diagnostics traces.
impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Obj(value) => write!(f, "{value}"),
            Self::Unknown(name) => f.write_str(name),
            Self::Returned(value) => write!(f, "returned {value}"),
            Self::Invoke => f.write_str("."),
            Self::New => f.write_str("new"),
            Self::AppliedInvoke { depth, name } => {
                for _ in 0..=*depth {
                    f.write_str(".")?;
                }
                f.write_str(name)
            }
            Self::Prefix(op) => f.write_str(&op.symbol),
            Self::Postfix(op) => f.write_str(&op.symbol),
            Self::Infix(op) => f.write_str(&op.symbol),
            Self::IndexArgs(nodes) => {
                f.write_str("[")?;
                write_joined(f, nodes, ", ")?;
                f.write_str("]")
            }
            Self::AppliedProperty { target, property } => write!(f, "{target}.{}", property.name()),
            Self::AppliedMultiProperty { targets } => {
                let name = targets.first().map_or("?", |(_, p)| p.name());
                write!(f, "..{name}")
            }
            Self::AppliedIndexedProperty { target, property } => write!(f, "{target}.{}[..]", property.name()),
            Self::Invokable(Invokable::Method { target, methods }) => {
                let name = methods.first().map_or("?", crate::host::MethodInfo::name);
                write!(f, "{target}.{name}")
            }
            Self::Invokable(Invokable::MultiMethod { targets }) => {
                let name = targets
                    .first()
                    .and_then(|(_, ms)| ms.first())
                    .map_or("?", crate::host::MethodInfo::name);
                write!(f, "..{name}")
            }
            Self::SubExpression(nodes) => {
                f.write_str("(")?;
                write_joined(f, nodes, " ")?;
                f.write_str(")")
            }
            Self::Tuple(nodes) => {
                f.write_str("(")?;
                write_joined(f, nodes, ", ")?;
                f.write_str(")")
            }
            Self::ArrayBuilder(nodes) => {
                f.write_str("[")?;
                write_joined(f, nodes, ", ")?;
                f.write_str("]")
            }
            Self::SetBuilder(nodes) => {
                f.write_str("{")?;
                write_joined(f, nodes, ", ")?;
                f.write_str("}")
            }
            Self::BVar { name, value, scope } => write!(f, "let {name} = {value} in {scope}"),
            Self::Lambda(lambda) => {
                f.write_str("fun")?;
                for param in &lambda.params {
                    write!(f, " {param}")?;
                }
                write!(f, " -> {}", lambda.body)
            }
            Self::IfThenElse { condition, then, otherwise } => {
                write!(f, "if {condition} then {then} else {otherwise}")
            }
            Self::Generator { start, step, end } => write!(f, "{{{start} .. {step} .. {end}}}"),
            Self::And { left, right } => write!(f, "({left} and {right})"),
            Self::Or { left, right } => write!(f, "({left} or {right})"),
        }
    }
}

/// Renders a node list the way it would read in source, for error traces.
pub(crate) fn render_nodes(nodes: &[ExprRep]) -> String {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&node.to_string());
    }
    out
}

/// Weak reference to a lambda, used for recursive self-bindings.
pub(crate) type LambdaWeak = Weak<LambdaRep>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge_covers_both_inputs() {
        let merged = SourceSpan::new(2, 3).merge(SourceSpan::new(8, 4));
        assert_eq!(merged, SourceSpan::new(2, 10));
    }

    #[test]
    fn span_merge_is_commutative() {
        let a = SourceSpan::new(5, 1);
        let b = SourceSpan::new(0, 2);
        assert_eq!(a.merge(b), b.merge(a));
    }

    #[test]
    fn span_merge_with_contained_span_is_identity() {
        let outer = SourceSpan::new(0, 10);
        assert_eq!(outer.merge(SourceSpan::new(3, 2)), outer);
    }

    #[test]
    fn display_renders_let_binding() {
        let node = ExprRep::new(
            0,
            24,
            ExprKind::BVar {
                name: Arc::from("x"),
                value: Box::new(ExprRep::obj(8, 2, Object::Int(10))),
                scope: Box::new(ExprRep::unknown(14, 1, "x")),
            },
        );
        assert_eq!(node.to_string(), "let x = 10 in x");
    }

    #[test]
    fn display_marks_unresolved_nodes() {
        let mut node = ExprRep::unknown(0, 1, "x");
        node.resolution = Resolution::Unresolved;
        assert_eq!(node.to_string(), "?x");
    }

    #[test]
    fn applied_invoke_renders_depth_dots() {
        let node = ExprRep::new(0, 5, ExprKind::AppliedInvoke { depth: 1, name: Arc::from("Name") });
        assert_eq!(node.to_string(), "..Name");
    }
}
