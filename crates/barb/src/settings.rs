use indexmap::{IndexMap, IndexSet};

use crate::object::Object;

/// Options controlling a reduction.
///
/// A plain struct with documented defaults; callers construct one with
/// `ReduceSettings::default()` and override fields as needed.
#[derive(Debug, Clone)]
pub struct ReduceSettings {
    /// When true, static namespace lookups may occur during non-final passes,
    /// enabling constant folding of host constants at compile time. Enabled
    /// by default.
    pub bind_globals_when_reducing: bool,
    /// When true, a final reduction that ends on a node combination the
    /// walker has no rule for raises `unexpected-case`. When false the
    /// residual nodes are returned and result extraction reports them.
    ///
    /// A non-final reduction always falls through to "done reducing" and
    /// returns residual nodes, regardless of this flag.
    pub fail_on_catch_all: bool,
    /// Namespaces searched, in order, for static member lookups and
    /// constructor calls. Defaults to the null namespace plus `std`.
    pub namespaces: IndexSet<String>,
    /// Seed values injected into the environment before reduction.
    pub additional_bindings: IndexMap<String, Object>,
}

impl Default for ReduceSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl ReduceSettings {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_globals_when_reducing: true,
            fail_on_catch_all: false,
            namespaces: default_namespaces(),
            additional_bindings: IndexMap::new(),
        }
    }

    /// The namespace search list as borrowed strings, in configured order.
    #[must_use]
    pub(crate) fn namespace_refs(&self) -> Vec<&str> {
        self.namespaces.iter().map(String::as_str).collect()
    }
}

fn default_namespaces() -> IndexSet<String> {
    IndexSet::from([String::new(), "std".to_owned()])
}
