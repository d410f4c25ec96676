use tyarg_core::config::ResolverConfig;
use tyarg_core::diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink};
use tyarg_core::span::Span;
use tyarg_core::types::{TypeDisplay, TypeId, TypeLookup};

/// Problems reported while resolving type parameters. None of them stops resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeParamErrorKind {
    /// A marker had no actual type to bind against.
    InferenceFailure,
    /// A bound marker met an actual type that is not compatible with its binding.
    IncompatibleRebinding,
    /// Structural recursion hit the configured depth ceiling.
    RecursionLimit,
}

impl TypeParamErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            TypeParamErrorKind::InferenceFailure => "E-TP001",
            TypeParamErrorKind::IncompatibleRebinding => "E-TP002",
            TypeParamErrorKind::RecursionLimit => "W-TP003",
        }
    }

    pub fn of(diagnostic: &Diagnostic) -> Option<Self> {
        match diagnostic.code.as_deref()? {
            "E-TP001" => Some(TypeParamErrorKind::InferenceFailure),
            "E-TP002" => Some(TypeParamErrorKind::IncompatibleRebinding),
            "W-TP003" => Some(TypeParamErrorKind::RecursionLimit),
            _ => None,
        }
    }
}

/// Position of a marker relative to the enclosing function type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    Covariant,
    /// Invokable parameter positions.
    Contravariant,
}

pub(crate) fn inference_failure(types: &dyn TypeLookup, marker: TypeId, span: Span) -> Diagnostic {
    let name = TypeDisplay::new(types, marker);
    Diagnostic::error(format!("cannot infer type for type parameter '{}'", name))
        .with_code(TypeParamErrorKind::InferenceFailure.code())
        .with_span(span)
        .with_suggestion(format!("provide an argument that determines '{}'", name))
}

pub(crate) fn incompatible_rebinding(
    types: &dyn TypeLookup,
    marker: TypeId,
    bound: TypeId,
    actual: TypeId,
    span: Span,
) -> Diagnostic {
    Diagnostic::error(format!(
        "incompatible types for type parameter '{}': expected '{}', found '{}'",
        TypeDisplay::new(types, marker),
        TypeDisplay::new(types, bound),
        TypeDisplay::new(types, actual)
    ))
    .with_code(TypeParamErrorKind::IncompatibleRebinding.code())
    .with_span(span)
}

pub(crate) fn recursion_limit(
    types: &dyn TypeLookup,
    at: TypeId,
    limit: usize,
    span: Span,
) -> Diagnostic {
    Diagnostic::warning(format!(
        "type '{}' is nested deeper than {} levels; type parameters below it are ignored",
        TypeDisplay::new(types, at),
        limit
    ))
    .with_code(TypeParamErrorKind::RecursionLimit.code())
    .with_span(span)
}

pub(crate) fn emit(log: &mut DiagnosticLog, config: &ResolverConfig, diagnostic: Diagnostic) {
    if config.lossy {
        log.report(diagnostic.downgraded());
    } else {
        log.report(diagnostic);
    }
}
