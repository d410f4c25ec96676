use crate::typing::env::BindingEnv;
use crate::typing::marker::contains_marker;
use crate::typing::types::{emit, recursion_limit};
use std::collections::HashMap;
use tyarg_core::config::ResolverConfig;
use tyarg_core::diagnostics::DiagnosticLog;
use tyarg_core::span::Span;
use tyarg_core::types::*;
use tyarg_core::ScopeId;

pub(crate) struct Reconstructor<'r, 'a> {
    types: &'r mut TypeOverlay<'a>,
    env: &'r BindingEnv,
    log: &'r mut DiagnosticLog,
    config: ResolverConfig,
    span: Span,
    /// Declared nodes currently being rebuilt. The slot gets an id only when
    /// the declaration is reached again from inside itself.
    in_progress: HashMap<TypeId, Option<TypeId>>,
    depth: usize,
    limit_reported: bool,
}

impl<'r, 'a> Reconstructor<'r, 'a> {
    pub(crate) fn new(
        types: &'r mut TypeOverlay<'a>,
        env: &'r BindingEnv,
        log: &'r mut DiagnosticLog,
        config: ResolverConfig,
        span: Span,
    ) -> Self {
        Self {
            types,
            env,
            log,
            config,
            span,
            in_progress: HashMap::new(),
            depth: 0,
            limit_reported: false,
        }
    }

    pub(crate) fn resolve(&mut self, expected: TypeId) -> TypeId {
        if let Some(key) = self.types.marker_key(expected) {
            return self.env.lookup(&key).unwrap_or(TypeId::NO_TYPE);
        }
        if let Some(slot) = self.in_progress.get_mut(&expected) {
            tracing::trace!("cycle through {} while instantiating", expected);
            return match *slot {
                Some(fresh) => fresh,
                None => {
                    let fresh = self.types.reserve();
                    *slot = Some(fresh);
                    fresh
                }
            };
        }

        let node = self.types.node(expected).clone();
        match &node.kind {
            kind if kind.is_leaf() => return expected,
            TypeKind::Error(_) if expected == TypeId::ERROR => return expected,
            TypeKind::Xml(_) if !contains_marker(&*self.types, expected) => return expected,
            _ => {}
        }
        if self.depth >= self.config.max_depth {
            self.report_depth(expected);
            return expected;
        }

        // a declaration without markers keeps its name on the copy
        let keeps_name = node.name.is_some() && !contains_marker(&*self.types, expected);

        self.in_progress.insert(expected, None);
        self.depth += 1;
        let kind = self.resolve_kind(&node.kind);
        self.depth -= 1;
        let slot = self.in_progress.remove(&expected).flatten();

        if let (TypeKind::Union(union), None) = (&kind, slot) {
            if let [single] = union.members.as_slice() {
                return *single;
            }
        }

        let fresh_node = TypeNode {
            kind,
            name: if keeps_name { node.name.clone() } else { None },
            scope: if keeps_name { node.scope } else { ScopeId::ROOT },
            flags: node.flags - TypeFlags::PARAMETERIZED,
        };
        match slot {
            Some(fresh) => {
                if let Err(err) = self.types.define(fresh, fresh_node) {
                    tracing::error!("failed to close instantiated cycle at {}: {}", fresh, err);
                }
                fresh
            }
            None => self.types.alloc(fresh_node),
        }
    }

    fn resolve_all(&mut self, ids: &[TypeId]) -> Vec<TypeId> {
        ids.iter().map(|id| self.resolve(*id)).collect()
    }

    fn resolve_fields(&mut self, fields: &[Field]) -> Vec<Field> {
        fields
            .iter()
            .map(|field| {
                let ty = self.resolve(field.ty);
                field.with_ty(ty)
            })
            .collect()
    }

    fn resolve_kind(&mut self, kind: &TypeKind) -> TypeKind {
        match kind {
            TypeKind::Array(array) => TypeKind::Array(TypeArray {
                elem: self.resolve(array.elem),
            }),
            TypeKind::Tuple(tuple) => TypeKind::Tuple(TypeTuple {
                members: self.resolve_all(&tuple.members),
                rest: tuple.rest.map(|rest| self.resolve(rest)),
            }),
            TypeKind::Map(map) => TypeKind::Map(TypeMap {
                constraint: self.resolve(map.constraint),
            }),
            TypeKind::Record(record) => TypeKind::Record(TypeRecord {
                fields: self.resolve_fields(&record.fields),
                rest: record.rest.map(|rest| self.resolve(rest)),
                sealed: record.sealed,
            }),
            TypeKind::Union(union) => {
                let mut members = Vec::with_capacity(union.members.len());
                for member in self.resolve_all(&union.members) {
                    if !members.contains(&member) {
                        members.push(member);
                    }
                }
                TypeKind::Union(TypeUnion { members })
            }
            TypeKind::Error(error) => TypeKind::Error(TypeError {
                detail: self.resolve(error.detail),
            }),
            TypeKind::Stream(stream) => TypeKind::Stream(TypeStream {
                constraint: self.resolve(stream.constraint),
                completion: stream.completion.map(|completion| self.resolve(completion)),
            }),
            TypeKind::Table(table) => TypeKind::Table(TypeTable {
                constraint: self.resolve(table.constraint),
                key_constraint: table.key_constraint.map(|key| self.resolve(key)),
                key_fields: table.key_fields.clone(),
            }),
            TypeKind::Invokable(invokable) => TypeKind::Invokable(TypeInvokable {
                params: self.resolve_all(&invokable.params),
                rest: invokable.rest.map(|rest| self.resolve(rest)),
                ret: self.resolve(invokable.ret),
                isolated: invokable.isolated,
            }),
            TypeKind::Object(object) => TypeKind::Object(TypeObject {
                fields: self.resolve_fields(&object.fields),
                methods: object
                    .methods
                    .iter()
                    .map(|method| {
                        let ty = self.resolve(method.ty);
                        method.with_ty(ty)
                    })
                    .collect(),
            }),
            TypeKind::Typedesc(typedesc) => TypeKind::Typedesc(TypeTypedesc {
                constraint: self.resolve(typedesc.constraint),
            }),
            TypeKind::Xml(xml) => TypeKind::Xml(TypeXml {
                constraint: self.resolve(xml.constraint),
            }),
            leaf => leaf.clone(),
        }
    }

    fn report_depth(&mut self, at: TypeId) {
        if self.limit_reported {
            return;
        }
        self.limit_reported = true;
        tracing::warn!(
            "type parameter instantiation stopped at depth {}",
            self.config.max_depth
        );
        let diag = recursion_limit(&*self.types, at, self.config.max_depth, self.span);
        emit(self.log, &self.config, diag);
    }
}
