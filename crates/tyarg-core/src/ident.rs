use serde::{Deserialize, Serialize};

/// A simple identifier - a single name like `T` or `Person`
#[derive(Debug, Clone, Serialize, Deserialize, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        self.name.as_str()
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<Ident> for String {
    fn from(ident: Ident) -> Self {
        ident.name
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Ident::new(name)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident::new(name)
    }
}

/// Token for the scope (module, function) that declared a named type.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    derive_more::Display,
)]
#[display("scope#{_0}")]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// Scope of builtins and of types synthesized by the engine.
    pub const ROOT: ScopeId = ScopeId(0);
}

/// Mints scope tokens and remembers their names for display.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    names: Vec<Ident>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    pub fn new() -> Self {
        Self {
            names: vec![Ident::new("<root>")],
        }
    }

    pub fn mint(&mut self, name: impl Into<Ident>) -> ScopeId {
        let id = ScopeId(self.names.len() as u32);
        self.names.push(name.into());
        id
    }

    pub fn name(&self, scope: ScopeId) -> Option<&Ident> {
        self.names.get(scope.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
