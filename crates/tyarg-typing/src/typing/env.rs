use tyarg_core::types::{MarkerKey, TypeId};

/// One recorded binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub key: MarkerKey,
    /// The marker node the binding was first discovered at.
    pub marker: TypeId,
    pub bound: TypeId,
}

/// Append-only list of marker bindings for one call-site resolution.
///
/// The first binding recorded for a marker is authoritative; later
/// encounters are checked against it and never replace it.
#[derive(Debug, Clone, Default)]
pub struct BindingEnv {
    entries: Vec<Binding>,
}

impl BindingEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &MarkerKey) -> Option<TypeId> {
        self.entries
            .iter()
            .find(|binding| &binding.key == key)
            .map(|binding| binding.bound)
    }

    /// Bound type of the first marker named `name`, in any scope.
    pub fn lookup_name(&self, name: &str) -> Option<TypeId> {
        self.entries
            .iter()
            .find(|binding| binding.key.name.as_str() == name)
            .map(|binding| binding.bound)
    }

    pub fn contains(&self, key: &MarkerKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Appends a binding for a marker that has none yet.
    pub(crate) fn record(&mut self, key: MarkerKey, marker: TypeId, bound: TypeId) {
        debug_assert!(!self.contains(&key), "marker {} bound twice", key);
        self.entries.push(Binding { key, marker, bound });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
