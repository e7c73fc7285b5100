use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    expressions::{ExprKind, ExprRep, LambdaWeak, SourceSpan},
    object::Object,
};

/// A bound expression template.
///
/// Stores the node as bound at definition time; `at()` re-stamps the
/// top-level span with the use site's span so error messages point at the
/// reference, not the definition.
#[derive(Debug, Clone)]
pub struct BoundNode {
    template: ExprRep,
}

impl BoundNode {
    #[must_use]
    pub fn new(template: ExprRep) -> Self {
        Self { template }
    }

    /// Reconstructs the bound node at a use site.
    #[must_use]
    pub fn at(&self, span: SourceSpan) -> ExprRep {
        let mut node = self.template.clone();
        node.span = span;
        node
    }
}

/// Contents of one environment entry.
#[derive(Debug, Clone)]
pub enum BindingContents {
    /// The name is promised but not yet supplied. A final reduction treats a
    /// reference to it as a hard error; a non-final reduction leaves the
    /// reference pending.
    ComingLater,
    /// The name is bound to an expression.
    Existing(BoundNode),
    /// Weak self-reference installed in a recursive lambda's own bindings.
    /// Upgrades to the lambda value on lookup.
    SelfLambda(LambdaWeak),
}

/// The binding environment: an ordered name-to-contents mapping.
///
/// Environments are persistent in use: reduction clones and extends them at
/// scope boundaries (`let` bindings, lambda application) rather than mutating
/// a shared copy, so an outer scope never observes inner bindings.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    map: IndexMap<Arc<str>, BindingContents>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BindingContents> {
        self.map.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Promises `name` for a later pass.
    pub fn set_coming_later(&mut self, name: impl Into<Arc<str>>) {
        self.map.insert(name.into(), BindingContents::ComingLater);
    }

    /// Binds `name` to an expression node.
    pub fn set_node(&mut self, name: impl Into<Arc<str>>, node: ExprRep) {
        self.map.insert(name.into(), BindingContents::Existing(BoundNode::new(node)));
    }

    /// Binds `name` to a resolved value.
    pub fn set_value(&mut self, name: impl Into<Arc<str>>, value: Object) {
        self.set_node(name, ExprRep::new(0, 0, ExprKind::Obj(value)));
    }

    pub(crate) fn set_self_lambda(&mut self, name: impl Into<Arc<str>>, weak: LambdaWeak) {
        self.map.insert(name.into(), BindingContents::SelfLambda(weak));
    }

    /// The environment extended with `overrides`; on conflict the override
    /// wins.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut map = self.map.clone();
        for (name, contents) in &overrides.map {
            map.insert(Arc::clone(name), contents.clone());
        }
        Self { map }
    }

    /// The environment with the given names removed.
    ///
    /// Used to strip bindings shadowed by lambda parameters before a lambda
    /// body is specialized.
    #[must_use]
    pub fn without(&self, names: &[Arc<str>]) -> Self {
        let mut map = self.map.clone();
        for name in names {
            map.shift_remove(name);
        }
        Self { map }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &BindingContents)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_node_restamps_use_site_span() {
        let bound = BoundNode::new(ExprRep::obj(100, 2, Object::Int(42)));
        let node = bound.at(SourceSpan::new(7, 1));
        assert_eq!(node.span, SourceSpan::new(7, 1));
        assert_eq!(node.as_obj(), Some(&Object::Int(42)));
    }

    #[test]
    fn merged_prefers_overrides() {
        let mut outer = Bindings::new();
        outer.set_value("x", Object::Int(1));
        let mut inner = Bindings::new();
        inner.set_value("x", Object::Int(2));
        let merged = outer.merged(&inner);
        let BindingContents::Existing(bound) = merged.get("x").unwrap() else {
            panic!("expected a value binding");
        };
        assert_eq!(bound.at(SourceSpan::new(0, 0)).as_obj(), Some(&Object::Int(2)));
    }

    #[test]
    fn merged_keeps_non_conflicting_entries() {
        let mut outer = Bindings::new();
        outer.set_value("x", Object::Int(1));
        let mut inner = Bindings::new();
        inner.set_coming_later("y");
        let merged = outer.merged(&inner);
        assert!(merged.contains("x"));
        assert!(matches!(merged.get("y"), Some(BindingContents::ComingLater)));
    }

    #[test]
    fn without_strips_shadowed_names() {
        let mut env = Bindings::new();
        env.set_value("n", Object::Int(1));
        env.set_value("m", Object::Int(2));
        let stripped = env.without(&[Arc::from("n")]);
        assert!(!stripped.contains("n"));
        assert!(stripped.contains("m"));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut env = Bindings::new();
        env.set_value("b", Object::Int(1));
        env.set_value("a", Object::Int(2));
        let names: Vec<&str> = env.iter().map(|(name, _)| &**name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
