//! Host object model: registered types, member handles, and the process-wide
//! member-resolution cache.
//!
//! Rust has no runtime reflection, so the host boundary is an explicit
//! registry: embedding applications describe each host type once — instance
//! properties, overloaded methods, static members, an optional constructor
//! and an optional indexer — as plain closures. The reducer resolves members
//! by name through [`HostModel`] and invokes the resulting handles.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use ahash::AHashMap;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::object::{HostHandle, Object};

/// Result type for host-supplied closures. Failures are plain messages; the
/// reducer wraps them with the offending source span.
pub type HostResult = Result<Object, String>;

/// Property getter: receives the target value.
pub type GetterFn = Arc<dyn Fn(&Object) -> HostResult + Send + Sync>;
/// Method body: receives the target value and the argument list.
pub type MethodFn = Arc<dyn Fn(&Object, &[Object]) -> HostResult + Send + Sync>;
/// Static method or constructor body: receives the argument list.
pub type StaticFn = Arc<dyn Fn(&[Object]) -> HostResult + Send + Sync>;
/// Indexer body: receives the target value and the index argument list.
pub type IndexerFn = MethodFn;

/// A resolved instance-property handle, awaiting a read.
#[derive(Clone)]
pub struct PropertyInfo {
    name: Arc<str>,
    getter: GetterFn,
}

impl PropertyInfo {
    pub fn new(name: impl Into<Arc<str>>, getter: GetterFn) -> Self {
        Self { name: name.into(), getter }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn read(&self, target: &Object) -> HostResult {
        (self.getter)(target)
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyInfo({})", self.name)
    }
}

/// A resolved parameterized-property handle, awaiting index arguments.
#[derive(Clone)]
pub struct IndexedPropertyInfo {
    name: Arc<str>,
    func: IndexerFn,
}

impl IndexedPropertyInfo {
    pub fn new(name: impl Into<Arc<str>>, func: IndexerFn) -> Self {
        Self { name: name.into(), func }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, target: &Object, args: &[Object]) -> HostResult {
        (self.func)(target, args)
    }
}

impl fmt::Debug for IndexedPropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexedPropertyInfo({})", self.name)
    }
}

/// One method overload: a fixed arity (`None` for variadic) and a body.
#[derive(Clone)]
pub struct MethodInfo {
    name: Arc<str>,
    arity: Option<usize>,
    func: MethodFn,
}

/// Overload list for one method name. Almost always a single entry.
pub type MethodList = SmallVec<[MethodInfo; 1]>;

impl MethodInfo {
    pub fn new(name: impl Into<Arc<str>>, arity: Option<usize>, func: MethodFn) -> Self {
        Self { name: name.into(), arity, func }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, arg_count: usize) -> bool {
        self.arity.is_none_or(|arity| arity == arg_count)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arity {
            Some(arity) => write!(f, "MethodInfo({}/{arity})", self.name),
            None => write!(f, "MethodInfo({}/..)", self.name),
        }
    }
}

/// Outcome of resolving a member name against an instance.
#[derive(Debug, Clone)]
pub enum ResolvedMember {
    /// A constant member; no further invocation needed.
    Value(Object),
    /// A readable property handle.
    Property(PropertyInfo),
    /// A parameterized property awaiting index arguments.
    IndexedProperty(IndexedPropertyInfo),
    /// A method overload set awaiting an argument list.
    Methods(MethodList),
}

/// A static member of a registered type.
#[derive(Clone)]
pub enum StaticMember {
    Value(Object),
    Methods(MethodList),
}

impl fmt::Debug for StaticMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => write!(f, "StaticMember::Value({value})"),
            Self::Methods(methods) => write!(f, "StaticMember::Methods({})", methods.len()),
        }
    }
}

/// Descriptor for one host type, built fluently and registered on a
/// [`HostModel`].
pub struct HostType {
    namespace: Arc<str>,
    name: Arc<str>,
    fields: AHashMap<Arc<str>, Object>,
    properties: AHashMap<Arc<str>, PropertyInfo>,
    indexed_properties: AHashMap<Arc<str>, IndexedPropertyInfo>,
    methods: AHashMap<Arc<str>, MethodList>,
    statics: AHashMap<Arc<str>, StaticMember>,
    constructor: Option<StaticFn>,
    indexer: Option<IndexerFn>,
}

impl HostType {
    /// Starts a descriptor for `name` in `namespace` (empty string for the
    /// null namespace).
    pub fn new(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            fields: AHashMap::new(),
            properties: AHashMap::new(),
            indexed_properties: AHashMap::new(),
            methods: AHashMap::new(),
            statics: AHashMap::new(),
            constructor: None,
            indexer: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Adds a constant member shared by every instance of the type; member
    /// access resolves it directly to the value.
    #[must_use]
    pub fn field(mut self, name: &str, value: Object) -> Self {
        self.fields.insert(Arc::from(name), value);
        self
    }

    #[must_use]
    pub fn property(mut self, name: &str, getter: GetterFn) -> Self {
        self.properties.insert(Arc::from(name), PropertyInfo::new(name, getter));
        self
    }

    #[must_use]
    pub fn indexed_property(mut self, name: &str, func: IndexerFn) -> Self {
        self.indexed_properties.insert(Arc::from(name), IndexedPropertyInfo::new(name, func));
        self
    }

    /// Adds a method overload; repeated calls with the same name accumulate
    /// overloads in registration order.
    #[must_use]
    pub fn method(mut self, name: &str, arity: Option<usize>, func: MethodFn) -> Self {
        self.methods
            .entry(Arc::from(name))
            .or_default()
            .push(MethodInfo::new(name, arity, func));
        self
    }

    #[must_use]
    pub fn static_value(mut self, name: &str, value: Object) -> Self {
        self.statics.insert(Arc::from(name), StaticMember::Value(value));
        self
    }

    #[must_use]
    pub fn static_method(mut self, name: &str, arity: Option<usize>, func: StaticFn) -> Self {
        let body: MethodFn = Arc::new(move |_target: &Object, args: &[Object]| func(args));
        let info = MethodInfo::new(name, arity, body);
        match self.statics.entry(Arc::from(name)).or_insert_with(|| StaticMember::Methods(MethodList::new())) {
            StaticMember::Methods(methods) => methods.push(info),
            StaticMember::Value(_) => {}
        }
        self
    }

    #[must_use]
    pub fn constructor(mut self, func: StaticFn) -> Self {
        self.constructor = Some(func);
        self
    }

    #[must_use]
    pub fn indexer(mut self, func: IndexerFn) -> Self {
        self.indexer = Some(func);
        self
    }

    fn instance_member(&self, name: &str) -> Option<ResolvedMember> {
        if let Some(value) = self.fields.get(name) {
            return Some(ResolvedMember::Value(value.clone()));
        }
        if let Some(property) = self.properties.get(name) {
            return Some(ResolvedMember::Property(property.clone()));
        }
        if let Some(indexed) = self.indexed_properties.get(name) {
            return Some(ResolvedMember::IndexedProperty(indexed.clone()));
        }
        self.methods.get(name).map(|methods| ResolvedMember::Methods(methods.clone()))
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "HostType({})", self.name)
        } else {
            write!(f, "HostType({}.{})", self.namespace, self.name)
        }
    }
}

/// Registry of host types plus the process-wide member-resolution cache.
///
/// The model is the only process-wide state in the engine: it is built once,
/// wrapped in an `Arc`, and shared by every compiled expression. The static
/// member cache is read-mostly and sits behind a coarse `RwLock`.
pub struct HostModel {
    /// Registered types grouped by bare name; a name may exist in several
    /// namespaces. Registration order is preserved for diagnostics.
    types: IndexMap<Arc<str>, Vec<Arc<HostType>>>,
    /// Cache of static-member lookups keyed by `(type name, member name)`.
    /// Values record every namespace match so callers can filter by their
    /// own namespace configuration.
    static_cache: RwLock<AHashMap<(Arc<str>, Arc<str>), Arc<Vec<(Arc<str>, StaticMember)>>>>,
}

impl Default for HostModel {
    fn default() -> Self {
        Self::new()
    }
}

impl HostModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
            static_cache: RwLock::new(AHashMap::new()),
        }
    }

    /// Registers a host type. Later registrations of the same `(namespace,
    /// name)` pair replace earlier ones.
    pub fn register(&mut self, host_type: HostType) {
        let entry = self.types.entry(Arc::clone(&host_type.name)).or_default();
        entry.retain(|existing| existing.namespace != host_type.namespace);
        entry.push(Arc::new(host_type));
        self.static_cache.write().expect("member cache poisoned").clear();
    }

    /// Whether `name` names a registered type in any of `namespaces`.
    pub(crate) fn is_known_type<'a>(&self, namespaces: impl IntoIterator<Item = &'a str>, name: &str) -> bool {
        let Some(candidates) = self.types.get(name) else {
            return false;
        };
        namespaces
            .into_iter()
            .any(|ns| candidates.iter().any(|t| &*t.namespace == ns))
    }

    fn find_types<'a>(&self, namespaces: impl IntoIterator<Item = &'a str>, name: &str) -> Vec<Arc<HostType>> {
        let Some(candidates) = self.types.get(name) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for ns in namespaces {
            for candidate in candidates {
                if &*candidate.namespace == ns {
                    found.push(Arc::clone(candidate));
                }
            }
        }
        found
    }

    /// Resolves an instance member by name: registered members for host
    /// instances, built-in members (`Length`, `Count`) for primitive values.
    ///
    /// Returns `None` when the value's type has no such member.
    pub(crate) fn resolve_invoke_by_instance(&self, target: &Object, name: &str) -> Option<ResolvedMember> {
        if let Object::Host(handle) = target {
            if let Some(member) = self.host_instance_member(handle, name) {
                return Some(member);
            }
        }
        builtin_member(target, name)
    }

    fn host_instance_member(&self, handle: &HostHandle, name: &str) -> Option<ResolvedMember> {
        let candidates = self.types.get(handle.type_name())?;
        candidates.iter().find_map(|t| t.instance_member(name))
    }

    /// Descends `depth` collection levels below `target` and resolves `name`
    /// against every element, flattening as it goes.
    ///
    /// Errors are plain messages: the caller decides the error kind (the
    /// mixed property/method case is detected by the caller over the
    /// returned list).
    pub(crate) fn resolve_invoke_at_depth(
        &self,
        depth: u32,
        target: &Object,
        name: &str,
    ) -> Result<Vec<(Object, ResolvedMember)>, String> {
        let elements = target
            .enumerate()
            .ok_or_else(|| format!("cannot descend into non-collection value of type {}", target.type_name()))?;
        let mut resolved = Vec::with_capacity(elements.len());
        for element in elements {
            if depth > 1 {
                resolved.extend(self.resolve_invoke_at_depth(depth - 1, &element, name)?);
            } else {
                let member = self
                    .resolve_invoke_by_instance(&element, name)
                    .ok_or_else(|| format!("type {} has no member named '{name}'", element.type_name()))?;
                resolved.push((element, member));
            }
        }
        Ok(resolved)
    }

    /// Resolves a static member of `type_name` across `namespaces`, consulting
    /// the process-wide cache first.
    ///
    /// The cache records every namespace match for the `(type, member)` key so
    /// that callers with different namespace configurations can share it; the
    /// returned list is already filtered and ordered by the caller's
    /// namespace search order.
    pub(crate) fn cached_resolve_static(
        &self,
        namespaces: &[&str],
        type_name: &str,
        member: &str,
    ) -> Vec<StaticMember> {
        let key = (Arc::<str>::from(type_name), Arc::<str>::from(member));
        let cached = self.static_cache.read().expect("member cache poisoned").get(&key).cloned();
        let all_matches = match cached {
            Some(matches) => matches,
            None => {
                let mut matches = Vec::new();
                if let Some(candidates) = self.types.get(type_name) {
                    for candidate in candidates {
                        if let Some(found) = candidate.statics.get(member) {
                            matches.push((Arc::clone(&candidate.namespace), found.clone()));
                        }
                    }
                }
                let matches = Arc::new(matches);
                self.static_cache
                    .write()
                    .expect("member cache poisoned")
                    .insert(key, Arc::clone(&matches));
                matches
            }
        };
        let mut filtered = Vec::new();
        for ns in namespaces {
            for (match_ns, found) in all_matches.iter() {
                if &**match_ns == *ns {
                    filtered.push(found.clone());
                }
            }
        }
        filtered
    }

    /// Invokes a unit (argument-free) method from an overload set.
    pub(crate) fn execute_unit_method(&self, target: &Object, methods: &MethodList) -> HostResult {
        self.execute_parameterized_method(target, methods, &[])
    }

    /// Invokes a method from an overload set, selecting the overload by
    /// argument count: the first exact-arity match wins, then the first
    /// variadic overload.
    pub(crate) fn execute_parameterized_method(
        &self,
        target: &Object,
        methods: &MethodList,
        args: &[Object],
    ) -> HostResult {
        let selected = methods
            .iter()
            .find(|m| m.arity == Some(args.len()))
            .or_else(|| methods.iter().find(|m| m.accepts(args.len())));
        let Some(method) = selected else {
            let name = methods.first().map_or("<method>", MethodInfo::name);
            return Err(format!("no overload of '{name}' takes {} argument(s)", args.len()));
        };
        (method.func)(target, args).map(normalize_result)
    }

    /// Constructs an instance of `type_name`, searching `namespaces` in
    /// order. Returns `None` when no such type is registered (the caller
    /// treats the name as something else); a registered type without a
    /// constructor is an error.
    pub(crate) fn execute_constructor(
        &self,
        namespaces: &[&str],
        type_name: &str,
        args: &[Object],
    ) -> Option<HostResult> {
        let found = self.find_types(namespaces.iter().copied(), type_name);
        if found.is_empty() {
            return None;
        }
        let Some(with_ctor) = found.iter().find(|t| t.constructor.is_some()) else {
            return Some(Err(format!("type {type_name} has no constructor")));
        };
        let ctor = with_ctor.constructor.as_ref().expect("constructor checked above");
        Some(ctor(args).map(normalize_result))
    }

    /// Reads a parameterized property with the given index arguments.
    pub(crate) fn execute_indexed_property(
        &self,
        target: &Object,
        property: &IndexedPropertyInfo,
        args: &[Object],
    ) -> HostResult {
        property.call(target, args).map(normalize_result)
    }

    /// Indexes a host instance through its registered indexer.
    ///
    /// Returns `None` when the instance's type has no indexer.
    pub(crate) fn host_indexer(&self, handle: &HostHandle) -> Option<IndexerFn> {
        let candidates = self.types.get(handle.type_name())?;
        candidates.iter().find_map(|t| t.indexer.clone())
    }
}

impl fmt::Debug for HostModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.types.keys().map(|k| &**k).collect();
        write!(f, "HostModel{{types: {names:?}}}")
    }
}

/// Canonicalizes a host-call result before it re-enters reduction.
///
/// Today the only normalization is structural: host nulls are already the
/// canonical `Object::Null`. Every host-call result funnels through here so
/// the contract has a single seam.
pub(crate) fn normalize_result(value: Object) -> Object {
    value
}

/// Built-in members available on primitive values without registration.
fn builtin_member(target: &Object, name: &str) -> Option<ResolvedMember> {
    match (target, name) {
        (Object::Str(_), "Length") => Some(length_property()),
        (Object::Array(_) | Object::Tuple(_) | Object::Seq(_), "Count" | "Length") => Some(length_property()),
        _ => None,
    }
}

fn length_property() -> ResolvedMember {
    let getter: GetterFn = Arc::new(|target: &Object| {
        let len = match target {
            Object::Str(s) => s.chars().count(),
            Object::Array(array) => array.items.len(),
            Object::Tuple(items) => items.len(),
            Object::Seq(seq) => seq.values().len(),
            other => return Err(format!("{} has no length", other.type_name())),
        };
        Ok(Object::Int(len as i64))
    });
    ResolvedMember::Property(PropertyInfo::new("Length", getter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ArrayObject;

    fn point_type() -> HostType {
        HostType::new("geom", "Point")
            .property(
                "X",
                Arc::new(|target: &Object| match target {
                    Object::Tuple(items) => Ok(items[0].clone()),
                    other => Err(format!("not a point: {other}")),
                }),
            )
            .static_value("Origin", Object::Int(0))
    }

    #[test]
    fn builtin_length_on_string() {
        let model = HostModel::new();
        let member = model.resolve_invoke_by_instance(&Object::Str("héllo".to_owned()), "Length");
        let Some(ResolvedMember::Property(property)) = member else {
            panic!("expected a property");
        };
        assert_eq!(property.read(&Object::Str("héllo".to_owned())).unwrap(), Object::Int(5));
    }

    #[test]
    fn builtin_count_on_array() {
        let model = HostModel::new();
        let array = Object::Array(ArrayObject::from_items(vec![Object::Int(1), Object::Int(2)]));
        let Some(ResolvedMember::Property(property)) = model.resolve_invoke_by_instance(&array, "Count") else {
            panic!("expected a property");
        };
        assert_eq!(property.read(&array).unwrap(), Object::Int(2));
    }

    #[test]
    fn unknown_member_resolves_to_none() {
        let model = HostModel::new();
        assert!(model.resolve_invoke_by_instance(&Object::Int(3), "Nope").is_none());
    }

    #[test]
    fn static_resolution_filters_by_namespace() {
        let mut model = HostModel::new();
        model.register(point_type());
        assert_eq!(model.cached_resolve_static(&["geom"], "Point", "Origin").len(), 1);
        assert!(model.cached_resolve_static(&["other"], "Point", "Origin").is_empty());
    }

    #[test]
    fn static_resolution_is_cached() {
        let mut model = HostModel::new();
        model.register(point_type());
        model.cached_resolve_static(&["geom"], "Point", "Origin");
        let cache = model.static_cache.read().unwrap();
        assert!(cache.contains_key(&(Arc::from("Point"), Arc::from("Origin"))));
    }

    #[test]
    fn overload_selection_prefers_exact_arity() {
        let model = HostModel::new();
        let mut methods = MethodList::new();
        methods.push(MethodInfo::new("F", Some(1), Arc::new(|_t: &Object, _a: &[Object]| Ok(Object::Int(1)))));
        methods.push(MethodInfo::new("F", None, Arc::new(|_t: &Object, _a: &[Object]| Ok(Object::Int(2)))));
        let one = model.execute_parameterized_method(&Object::Null, &methods, &[Object::Null]).unwrap();
        assert_eq!(one, Object::Int(1));
        let two = model
            .execute_parameterized_method(&Object::Null, &methods, &[Object::Null, Object::Null])
            .unwrap();
        assert_eq!(two, Object::Int(2));
    }

    #[test]
    fn overload_mismatch_reports_method_name() {
        let model = HostModel::new();
        let mut methods = MethodList::new();
        methods.push(MethodInfo::new("F", Some(1), Arc::new(|_t: &Object, _a: &[Object]| Ok(Object::Null))));
        let err = model.execute_parameterized_method(&Object::Null, &methods, &[]).unwrap_err();
        assert!(err.contains("'F'"));
    }

    #[test]
    fn depth_descent_resolves_per_element() {
        let model = HostModel::new();
        let target = Object::Array(ArrayObject::from_items(vec![
            Object::Str("ab".to_owned()),
            Object::Str("c".to_owned()),
        ]));
        let resolved = model.resolve_invoke_at_depth(1, &target, "Length").unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn depth_descent_rejects_scalars() {
        let model = HostModel::new();
        let err = model.resolve_invoke_at_depth(1, &Object::Int(1), "Length").unwrap_err();
        assert!(err.contains("non-collection"));
    }

    #[test]
    fn constructor_lookup_misses_unknown_types() {
        let model = HostModel::new();
        assert!(model.execute_constructor(&[""], "Nope", &[]).is_none());
    }
}
