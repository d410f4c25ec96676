#[macro_use]
pub mod macros;

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ident;
pub mod span;
pub mod subtype;
pub mod types;

// Re-export commonly used items for convenience
pub use tracing;

pub use ident::{Ident, ScopeId, ScopeTable};
pub use types::{TypeAlloc, TypeArena, TypeId, TypeKind, TypeLookup, TypeNode, TypeOverlay};

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
