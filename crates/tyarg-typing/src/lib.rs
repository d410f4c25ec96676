//! Call-site resolution of type-parameter markers.

pub mod typing;

pub use typing::env::{Binding, BindingEnv};
pub use typing::marker::{contains_marker, markers_in};
pub use typing::types::{TypeParamErrorKind, Variance};

use itertools::{EitherOrBoth, Itertools};
use tyarg_core::config::ResolverConfig;
use tyarg_core::diagnostics::{Diagnostic, DiagnosticLog};
use tyarg_core::error::{Error, Result};
use tyarg_core::span::Span;
use tyarg_core::subtype::Assignability;
use tyarg_core::types::{LocalTypes, TypeArena, TypeId, TypeKind, TypeLookup, TypeOverlay};
use typing::matcher::Matcher;
use typing::reconstruct::Reconstructor;

/// Entry point of the engine, built once per compilation context.
///
/// The resolver holds no per-call state; every call site gets its own
/// [`Resolution`] from [`TypeParamResolver::begin_resolution`].
#[derive(Clone, Copy)]
pub struct TypeParamResolver<'c> {
    checker: &'c dyn Assignability,
    config: ResolverConfig,
}

impl<'c> TypeParamResolver<'c> {
    /// Resolver configured from the environment (`TYARG_MAX_DEPTH`, `TYARG_LOSSY`).
    pub fn new(checker: &'c dyn Assignability) -> Self {
        Self::with_config(checker, ResolverConfig::from_env())
    }

    pub fn with_config(checker: &'c dyn Assignability, config: ResolverConfig) -> Self {
        Self { checker, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Start resolving one call against signatures declared in `types`.
    pub fn begin_resolution<'a>(&self, types: &'a TypeArena) -> Resolution<'a, 'c> {
        Resolution {
            types: types.overlay(),
            checker: self.checker,
            config: self.config,
            env: BindingEnv::new(),
            diagnostics: DiagnosticLog::new(),
        }
    }
}

/// The state of one call-site resolution.
pub struct Resolution<'a, 'c> {
    types: TypeOverlay<'a>,
    checker: &'c dyn Assignability,
    config: ResolverConfig,
    env: BindingEnv,
    diagnostics: DiagnosticLog,
}

impl<'a, 'c> Resolution<'a, 'c> {
    /// Bind the markers of `declared` from the type of the argument passed for it.
    ///
    /// Pass [`TypeId::NO_TYPE`] for an omitted or untyped argument.
    pub fn bind_from_argument(&mut self, declared: TypeId, actual: TypeId, span: Span) {
        if !contains_marker(&self.types, declared) {
            return;
        }
        Matcher::new(
            &mut self.types,
            self.checker,
            &mut self.env,
            &mut self.diagnostics,
            self.config,
            span,
        )
        .match_types(declared, actual, Variance::Covariant);
    }

    /// Bind every argument of a call to `signature`, an invokable type.
    ///
    /// Arguments beyond the declared parameters go to the rest parameter, if
    /// any. Missing arguments are bound against [`TypeId::NO_TYPE`].
    pub fn bind_call(&mut self, signature: TypeId, args: &[TypeId], span: Span) -> Result<()> {
        let Some(invokable) = self.types.kind(signature).as_invokable().cloned() else {
            return Err(Error::Generic(format!(
                "expected a function type, found '{}'",
                self.types.display(signature)
            )));
        };
        let mut ignored = 0;
        for pair in invokable.params.iter().zip_longest(args) {
            match pair {
                EitherOrBoth::Both(param, actual) => self.bind_from_argument(*param, *actual, span),
                EitherOrBoth::Left(param) => self.bind_from_argument(*param, TypeId::NO_TYPE, span),
                EitherOrBoth::Right(actual) => match invokable.rest {
                    Some(rest) => self.bind_from_argument(rest, *actual, span),
                    None => ignored += 1,
                },
            }
        }
        if ignored > 0 {
            tracing::trace!(
                "{} arguments past the end of '{}' ignored",
                ignored,
                self.types.display(signature)
            );
        }
        Ok(())
    }

    /// Rebuild `declared` with every bound marker replaced by its binding.
    ///
    /// Unbound markers come back as [`TypeId::NO_TYPE`]; the failure was
    /// already reported while binding.
    pub fn instantiate(&mut self, declared: TypeId) -> TypeId {
        self.instantiate_at(declared, Span::null())
    }

    pub fn instantiate_at(&mut self, declared: TypeId, span: Span) -> TypeId {
        Reconstructor::new(
            &mut self.types,
            &self.env,
            &mut self.diagnostics,
            self.config,
            span,
        )
        .resolve(declared)
    }

    /// Instantiate a whole function signature: parameters, rest and return type.
    pub fn instantiate_signature(&mut self, signature: TypeId) -> Result<TypeId> {
        if !matches!(self.types.kind(signature), TypeKind::Invokable(_)) {
            return Err(Error::Generic(format!(
                "expected a function type, found '{}'",
                self.types.display(signature)
            )));
        }
        Ok(self.instantiate(signature))
    }

    /// Current binding of the marker node `marker`.
    pub fn bound_type(&self, marker: TypeId) -> Option<TypeId> {
        let key = self.types.marker_key(marker)?;
        self.env.lookup(&key)
    }

    pub fn env(&self) -> &BindingEnv {
        &self.env
    }

    /// Declared types plus everything this resolution has allocated.
    pub fn types(&self) -> &TypeOverlay<'a> {
        &self.types
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Render a type visible to this resolution.
    pub fn display(&self, id: TypeId) -> String {
        self.types.display(id).to_string()
    }

    pub fn finish(self) -> ResolutionOutcome {
        let has_errors = self.diagnostics.has_errors();
        ResolutionOutcome {
            env: self.env,
            diagnostics: self.diagnostics.into_vec(),
            has_errors,
            local: self.types.into_local(),
        }
    }
}

/// What a finished resolution hands back to the caller.
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub env: BindingEnv,
    pub diagnostics: Vec<Diagnostic>,
    pub has_errors: bool,
    /// Types created by the resolution; see [`TypeArena::commit`].
    pub local: LocalTypes,
}
