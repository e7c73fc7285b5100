use std::{any::Any, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// A host-supplied instance value, opaque to the reducer.
///
/// The reducer never inspects host instances directly; it resolves members by
/// name through the [`HostModel`](crate::HostModel) registry using
/// `type_name()` as the key. Accessor closures registered on the model
/// downcast via `as_any()`.
pub trait HostInstance: fmt::Debug + Send + Sync {
    /// The registered type name this instance resolves members against.
    fn type_name(&self) -> &str;
    /// Downcasting hook for accessor closures.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a host instance.
///
/// Handles are cheaply clonable and compare by identity: two handles are equal
/// only when they point at the same instance.
#[derive(Clone)]
pub struct HostHandle(Arc<dyn HostInstance>);

impl HostHandle {
    pub fn new(instance: impl HostInstance + 'static) -> Self {
        Self(Arc::new(instance))
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    /// Borrows the underlying instance as a concrete type, if it is one.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostHandle({:?})", self.0)
    }
}

impl PartialEq for HostHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Concrete type of a resolved value, used for array element uniformity checks
/// and as part of member-cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Str,
    Array,
    Tuple,
    Seq,
    /// A registered host type, by name.
    Host(Arc<str>),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Array => f.write_str("array"),
            Self::Tuple => f.write_str("tuple"),
            Self::Seq => f.write_str("seq"),
            Self::Host(name) => f.write_str(name),
        }
    }
}

/// A lazy numeric sequence produced by a generator expression.
///
/// Values are `start, start + step, ...`, stopping before the next value would
/// pass `end` in the direction of `step`. The sequence is never materialized
/// by the reducer itself; callers enumerate it on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericSeq {
    Int { start: i64, step: i64, end: i64 },
    Float { start: f64, step: f64, end: f64 },
}

impl NumericSeq {
    /// Enumerates the sequence into concrete values.
    #[must_use]
    pub fn values(&self) -> Vec<Object> {
        match *self {
            Self::Int { start, step, end } => {
                let mut out = Vec::new();
                let mut current = start;
                while (step > 0 && current <= end) || (step < 0 && current >= end) {
                    out.push(Object::Int(current));
                    let Some(next) = current.checked_add(step) else { break };
                    current = next;
                }
                out
            }
            Self::Float { start, step, end } => {
                let mut out = Vec::new();
                let mut current = start;
                while (step > 0.0 && current <= end) || (step < 0.0 && current >= end) {
                    out.push(Object::Float(current));
                    current += step;
                }
                out
            }
        }
    }
}

impl fmt::Display for NumericSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int { start, step, end } => write!(f, "{{{start} .. {step} .. {end}}}"),
            Self::Float { start, step, end } => write!(f, "{{{start} .. {step} .. {end}}}"),
        }
    }
}

/// An array value, tracking whether its elements share one concrete type.
///
/// `elem` is `Some` when the array was built from a non-empty, uniformly
/// typed element list ("typed array"); `None` means an untyped array (empty,
/// mixed element types, or containing nulls).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayObject {
    pub elem: Option<TypeTag>,
    pub items: Vec<Object>,
}

impl ArrayObject {
    /// Builds an array, computing element-type uniformity from the items.
    #[must_use]
    pub fn from_items(items: Vec<Object>) -> Self {
        let mut tags = items.iter().map(Object::type_tag);
        let elem = match tags.next() {
            Some(Some(first)) if tags.all(|tag| tag.as_ref() == Some(&first)) => Some(first),
            _ => None,
        };
        Self { elem, items }
    }
}

/// A fully-resolved value flowing through reduction.
///
/// This is the opaque payload of `Obj` nodes and the result type of a
/// completed evaluation. Host instances are carried behind shared handles so
/// nodes stay cheaply clonable and shareable across threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The canonical null value. Host nulls normalize to this.
    Null,
    Bool(bool),
    /// 64-bit signed integer, the language's only integer kind.
    Int(i64),
    /// 64-bit IEEE 754 float, the language's only floating kind.
    Float(f64),
    Str(String),
    Array(ArrayObject),
    Tuple(Vec<Object>),
    /// Lazy numeric sequence from a generator expression.
    Seq(NumericSeq),
    /// A host instance; members resolve through the model registry.
    Host(HostHandle),
}

impl Object {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean payload, if this is a boolean.
    ///
    /// The logical connectives are strict: they accept only booleans and null,
    /// with no truthiness coercion of other kinds.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The concrete type of this value; `None` for null, which has no type.
    #[must_use]
    pub fn type_tag(&self) -> Option<TypeTag> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(TypeTag::Bool),
            Self::Int(_) => Some(TypeTag::Int),
            Self::Float(_) => Some(TypeTag::Float),
            Self::Str(_) => Some(TypeTag::Str),
            Self::Array(_) => Some(TypeTag::Array),
            Self::Tuple(_) => Some(TypeTag::Tuple),
            Self::Seq(_) => Some(TypeTag::Seq),
            Self::Host(handle) => Some(TypeTag::Host(Arc::from(handle.type_name()))),
        }
    }

    /// Type name used in diagnostics and member-cache keys.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Array(_) => "array",
            Self::Tuple(_) => "tuple",
            Self::Seq(_) => "seq",
            Self::Host(handle) => handle.type_name(),
        }
    }

    /// The elements of this value, when it is an enumerable collection.
    ///
    /// Used by nested-collection invocation (`..name`) and broadcast calls.
    #[must_use]
    pub fn enumerate(&self) -> Option<Vec<Object>> {
        match self {
            Self::Array(array) => Some(array.items.clone()),
            Self::Tuple(items) => Some(items.clone()),
            Self::Seq(seq) => Some(seq.values()),
            _ => None,
        }
    }

    /// Built-in positional indexing for arrays, tuples and strings.
    ///
    /// Host instances are indexed through their registered indexer instead.
    pub(crate) fn index_builtin(&self, args: &[Object]) -> Result<Object, String> {
        let [index] = args else {
            return Err(format!("{} indexing takes exactly one argument, got {}", self.type_name(), args.len()));
        };
        let Object::Int(i) = index else {
            return Err(format!("{} index must be an integer, got {}", self.type_name(), index.type_name()));
        };
        let items: &[Object] = match self {
            Self::Array(array) => &array.items,
            Self::Tuple(items) => items,
            Self::Str(s) => {
                return usize::try_from(*i)
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Object::Str(c.to_string()))
                    .ok_or_else(|| format!("string index {i} out of range"));
            }
            _ => return Err(format!("{} is not indexable", self.type_name())),
        };
        usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| format!("index {i} out of range for {} of length {}", self.type_name(), items.len()))
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Array(array) => {
                f.write_str("[")?;
                for (i, item) in array.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Seq(seq) => write!(f, "{seq}"),
            Self::Host(handle) => write!(f, "<{}>", handle.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_seq_ascending_stops_at_end() {
        let seq = NumericSeq::Int { start: 1, step: 2, end: 7 };
        assert_eq!(
            seq.values(),
            vec![Object::Int(1), Object::Int(3), Object::Int(5), Object::Int(7)]
        );
    }

    #[test]
    fn int_seq_descending_respects_step_sign() {
        let seq = NumericSeq::Int { start: 5, step: -2, end: 0 };
        assert_eq!(seq.values(), vec![Object::Int(5), Object::Int(3), Object::Int(1)]);
    }

    #[test]
    fn int_seq_stops_before_passing_end() {
        let seq = NumericSeq::Int { start: 1, step: 3, end: 6 };
        assert_eq!(seq.values(), vec![Object::Int(1), Object::Int(4)]);
    }

    #[test]
    fn float_seq_enumerates() {
        let seq = NumericSeq::Float { start: 0.0, step: 0.5, end: 1.0 };
        assert_eq!(seq.values(), vec![Object::Float(0.0), Object::Float(0.5), Object::Float(1.0)]);
    }

    #[test]
    fn uniform_array_is_typed() {
        let array = ArrayObject::from_items(vec![Object::Int(1), Object::Int(2)]);
        assert_eq!(array.elem, Some(TypeTag::Int));
    }

    #[test]
    fn mixed_array_is_untyped() {
        let array = ArrayObject::from_items(vec![Object::Int(1), Object::Str("a".to_owned())]);
        assert_eq!(array.elem, None);
    }

    #[test]
    fn array_with_null_is_untyped() {
        let array = ArrayObject::from_items(vec![Object::Null, Object::Int(2)]);
        assert_eq!(array.elem, None);
    }

    #[test]
    fn empty_array_is_untyped() {
        let array = ArrayObject::from_items(vec![]);
        assert_eq!(array.elem, None);
        assert!(array.items.is_empty());
    }

    #[test]
    fn tuple_indexing_in_range() {
        let tuple = Object::Tuple(vec![Object::Int(10), Object::Int(20)]);
        assert_eq!(tuple.index_builtin(&[Object::Int(1)]).unwrap(), Object::Int(20));
    }

    #[test]
    fn tuple_indexing_out_of_range_reports_length() {
        let tuple = Object::Tuple(vec![Object::Int(10)]);
        let err = tuple.index_builtin(&[Object::Int(3)]).unwrap_err();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn string_indexing_yields_single_char() {
        let s = Object::Str("abc".to_owned());
        assert_eq!(s.index_builtin(&[Object::Int(2)]).unwrap(), Object::Str("c".to_owned()));
    }

    #[test]
    fn as_bool_rejects_non_booleans() {
        assert_eq!(Object::Int(1).as_bool(), None);
        assert_eq!(Object::Bool(true).as_bool(), Some(true));
    }

    #[test]
    fn seq_enumerates_via_enumerate() {
        let seq = Object::Seq(NumericSeq::Int { start: 1, step: 1, end: 3 });
        assert_eq!(
            seq.enumerate().unwrap(),
            vec![Object::Int(1), Object::Int(2), Object::Int(3)]
        );
    }
}
