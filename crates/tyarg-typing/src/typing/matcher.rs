use crate::typing::env::BindingEnv;
use crate::typing::marker::markers_in;
use crate::typing::types::{emit, incompatible_rebinding, inference_failure, recursion_limit, Variance};
use std::collections::HashSet;
use tyarg_core::config::ResolverConfig;
use tyarg_core::diagnostics::DiagnosticLog;
use tyarg_core::span::Span;
use tyarg_core::subtype::Assignability;
use tyarg_core::types::*;

pub(crate) struct Matcher<'r, 'a> {
    types: &'r mut TypeOverlay<'a>,
    checker: &'r dyn Assignability,
    env: &'r mut BindingEnv,
    log: &'r mut DiagnosticLog,
    config: ResolverConfig,
    span: Span,
    visited: HashSet<TypeId>,
    depth: usize,
    limit_reported: bool,
}

impl<'r, 'a> Matcher<'r, 'a> {
    pub(crate) fn new(
        types: &'r mut TypeOverlay<'a>,
        checker: &'r dyn Assignability,
        env: &'r mut BindingEnv,
        log: &'r mut DiagnosticLog,
        config: ResolverConfig,
        span: Span,
    ) -> Self {
        Self {
            types,
            checker,
            env,
            log,
            config,
            span,
            visited: HashSet::new(),
            depth: 0,
            limit_reported: false,
        }
    }

    pub(crate) fn match_types(&mut self, expected: TypeId, actual: TypeId, variance: Variance) {
        if self.visited.contains(&expected) {
            tracing::trace!("already matched {}, skipping", expected);
            return;
        }
        if let Some(key) = self.types.marker_key(expected) {
            self.bind_marker(expected, key, actual, variance);
            return;
        }
        if actual == TypeId::NO_TYPE {
            self.report_unbound(expected);
            return;
        }
        let kind = self.types.kind(expected).clone();
        if kind.is_leaf() {
            return;
        }
        if self.depth >= self.config.max_depth {
            self.report_depth(expected);
            return;
        }
        self.visited.insert(expected);
        self.depth += 1;
        self.match_kind(expected, &kind, actual, variance);
        self.depth -= 1;
    }

    fn bind_marker(&mut self, marker: TypeId, key: MarkerKey, actual: TypeId, variance: Variance) {
        match self.env.lookup(&key) {
            None => {
                if actual == TypeId::NO_TYPE {
                    let diag = inference_failure(&*self.types, marker, self.span);
                    emit(self.log, &self.config, diag);
                    return;
                }
                tracing::debug!(
                    "bound type parameter {} to {}",
                    key,
                    self.types.display(actual)
                );
                self.env.record(key, marker, actual);
            }
            Some(bound) => {
                if actual == TypeId::NO_TYPE {
                    return;
                }
                let compatible = match variance {
                    Variance::Covariant => {
                        self.checker.is_assignable(&*self.types, actual, bound)
                    }
                    Variance::Contravariant => {
                        self.checker.is_same_type(&*self.types, bound, actual)
                    }
                };
                if !compatible {
                    tracing::debug!(
                        "type parameter {} bound to {} rejects {} ({:?})",
                        key,
                        self.types.display(bound),
                        self.types.display(actual),
                        variance
                    );
                    let diag = incompatible_rebinding(&*self.types, marker, bound, actual, self.span);
                    emit(self.log, &self.config, diag);
                }
            }
        }
    }

    /// Nothing to match against: every marker below `expected` that is still
    /// unbound is an inference failure.
    fn report_unbound(&mut self, expected: TypeId) {
        let mut reported: Vec<MarkerKey> = Vec::new();
        for marker in markers_in(&*self.types, expected) {
            let Some(key) = self.types.marker_key(marker) else {
                continue;
            };
            if !self.env.contains(&key) && !reported.contains(&key) {
                reported.push(key);
                let diag = inference_failure(&*self.types, marker, self.span);
                emit(self.log, &self.config, diag);
            }
        }
    }

    fn match_kind(&mut self, expected: TypeId, kind: &TypeKind, actual: TypeId, variance: Variance) {
        let actual_kind = self.types.kind(actual).clone();
        match (kind, &actual_kind) {
            (TypeKind::Array(array), TypeKind::Array(actual_array)) => {
                self.match_types(array.elem, actual_array.elem, variance);
            }
            (TypeKind::Array(array), TypeKind::Tuple(tuple)) => {
                let members = tuple.members.iter().chain(tuple.rest.iter()).copied().collect();
                let bag = self.types.union_of(members);
                self.match_types(array.elem, bag, variance);
            }
            (TypeKind::Array(array), TypeKind::Union(union)) => {
                let elements = self.element_types(&union.members);
                if !elements.is_empty() {
                    let bag = self.types.union_of(elements);
                    self.match_types(array.elem, bag, variance);
                }
            }
            (TypeKind::Map(map), TypeKind::Map(actual_map)) => {
                self.match_types(map.constraint, actual_map.constraint, variance);
            }
            (TypeKind::Map(map), TypeKind::Record(record)) => {
                let constraint = self.record_constraint(record);
                self.match_types(map.constraint, constraint, variance);
            }
            (TypeKind::Stream(stream), TypeKind::Stream(actual_stream)) => {
                self.match_types(stream.constraint, actual_stream.constraint, variance);
                if let Some(completion) = stream.completion {
                    let actual_completion = actual_stream.completion.unwrap_or(TypeId::NIL);
                    self.match_types(completion, actual_completion, variance);
                }
            }
            (TypeKind::Stream(stream), TypeKind::Union(union)) => {
                self.match_stream_union(stream, &union.members, variance);
            }
            (TypeKind::Table(table), TypeKind::Table(actual_table)) => {
                self.match_types(table.constraint, actual_table.constraint, variance);
                if let Some(key) = table.key_constraint {
                    if let Some(actual_key) = self.table_key(actual_table) {
                        self.match_types(key, actual_key, variance);
                    }
                }
            }
            (TypeKind::Tuple(tuple), TypeKind::Tuple(actual_tuple)) => {
                for (member, actual_member) in tuple.members.iter().zip(&actual_tuple.members) {
                    self.match_types(*member, *actual_member, variance);
                }
                if let (Some(rest), Some(actual_rest)) = (tuple.rest, actual_tuple.rest) {
                    self.match_types(rest, actual_rest, variance);
                }
            }
            (TypeKind::Union(_), TypeKind::Union(_)) => {
                // only the `T?` shape is understood on both sides
                let inner = self.types.nilable_inner(expected);
                let actual_inner = self.types.nilable_inner(actual);
                if let (Some(inner), Some(actual_inner)) = (inner, actual_inner) {
                    self.match_types(inner, actual_inner, variance);
                } else {
                    tracing::trace!("general union matching is not supported, skipping");
                }
            }
            (TypeKind::Record(record), TypeKind::Record(actual_record)) => {
                self.match_fields(&record.fields, &actual_record.fields, variance);
            }
            (TypeKind::Invokable(invokable), TypeKind::Invokable(actual_invokable)) => {
                self.match_invokable(invokable, actual_invokable);
            }
            (TypeKind::Object(object), TypeKind::Object(actual_object)) => {
                self.match_fields(&object.fields, &actual_object.fields, variance);
                for method in &object.methods {
                    if let Some(actual_method) = actual_object.method(method.name.as_str()) {
                        self.match_types(method.ty, actual_method.ty, variance);
                    }
                }
            }
            (TypeKind::Error(error), _) => {
                if expected == TypeId::ERROR {
                    return;
                }
                match &actual_kind {
                    TypeKind::Error(actual_error) => {
                        self.match_types(error.detail, actual_error.detail, variance);
                    }
                    TypeKind::Union(_) if self.types.is_error_family(actual) => {
                        self.match_types(error.detail, TypeId::ERROR_DETAIL, variance);
                    }
                    _ => self.skip(expected, actual),
                }
            }
            (TypeKind::Xml(xml), TypeKind::Xml(actual_xml)) => {
                let constraint = self.peel_xml(actual_xml.constraint);
                self.match_types(xml.constraint, constraint, variance);
            }
            (TypeKind::Xml(xml), TypeKind::XmlItem(_)) => {
                self.match_types(xml.constraint, actual, variance);
            }
            (TypeKind::Xml(xml), TypeKind::Union(union)) => {
                let constraints = self.xml_constraints(&union.members);
                if !constraints.is_empty() {
                    let constraint = self.types.union_of(constraints);
                    self.match_types(xml.constraint, constraint, variance);
                }
            }
            (TypeKind::Typedesc(typedesc), TypeKind::Typedesc(actual_typedesc)) => {
                self.match_types(typedesc.constraint, actual_typedesc.constraint, variance);
            }
            _ => self.skip(expected, actual),
        }
    }

    fn skip(&self, expected: TypeId, actual: TypeId) {
        tracing::trace!(
            "no structural pairing for {} against {}",
            self.types.display(expected),
            self.types.display(actual)
        );
    }

    fn match_fields(&mut self, fields: &[Field], actual_fields: &[Field], variance: Variance) {
        for field in fields {
            let actual_field = actual_fields
                .iter()
                .find(|actual_field| actual_field.name == field.name);
            if let Some(actual_field) = actual_field {
                self.match_types(field.ty, actual_field.ty, variance);
            }
        }
    }

    fn match_invokable(&mut self, invokable: &TypeInvokable, actual: &TypeInvokable) {
        for (param, actual_param) in invokable.params.iter().zip(&actual.params) {
            self.match_types(*param, *actual_param, Variance::Contravariant);
        }
        if let (Some(rest), Some(actual_rest)) = (invokable.rest, actual.rest) {
            self.match_types(rest, actual_rest, Variance::Contravariant);
        }
        self.match_types(invokable.ret, actual.ret, Variance::Covariant);
    }

    fn match_stream_union(&mut self, stream: &TypeStream, members: &[TypeId], variance: Variance) {
        let mut constraints = Vec::new();
        let mut completions = Vec::new();
        for member in members {
            if let TypeKind::Stream(actual_stream) = self.types.kind(*member) {
                constraints.push(actual_stream.constraint);
                completions.push(actual_stream.completion.unwrap_or(TypeId::NIL));
            }
        }
        if constraints.is_empty() {
            return;
        }
        let constraint = self.types.union_of(constraints);
        self.match_types(stream.constraint, constraint, variance);
        if let Some(completion) = stream.completion {
            let actual_completion = self.types.union_of(completions);
            self.match_types(completion, actual_completion, variance);
        }
    }

    /// Element types contributed by each list- or mapping-shaped union member.
    fn element_types(&self, members: &[TypeId]) -> Vec<TypeId> {
        let mut elements = Vec::new();
        for member in members {
            match self.types.kind(*member) {
                TypeKind::Array(array) => elements.push(array.elem),
                TypeKind::Tuple(tuple) => {
                    elements.extend(tuple.members.iter().chain(tuple.rest.iter()).copied())
                }
                TypeKind::Map(map) => elements.push(map.constraint),
                TypeKind::Record(record) => elements.extend(
                    record
                        .fields
                        .iter()
                        .map(|field| field.ty)
                        .chain(record.effective_rest()),
                ),
                _ => {}
            }
        }
        elements
    }

    /// The single type a `map<T>` sees when handed `record`.
    fn record_constraint(&mut self, record: &TypeRecord) -> TypeId {
        let rest = record
            .effective_rest()
            .filter(|rest| !matches!(self.types.kind(*rest), TypeKind::Never | TypeKind::NoType));
        let mut distinct: Vec<TypeId> = Vec::new();
        for field in &record.fields {
            if let Some(rest) = rest {
                if self.checker.is_assignable(&*self.types, field.ty, rest) {
                    continue;
                }
            }
            self.push_distinct(&mut distinct, field.ty);
        }
        if let Some(rest) = rest {
            self.push_distinct(&mut distinct, rest);
        }
        match distinct.as_slice() {
            [single] => *single,
            _ => self.types.union_of(distinct),
        }
    }

    fn push_distinct(&self, distinct: &mut Vec<TypeId>, ty: TypeId) {
        let seen = distinct
            .iter()
            .any(|existing| self.checker.is_same_type(&*self.types, *existing, ty));
        if !seen {
            distinct.push(ty);
        }
    }

    /// Key type of a table: its key constraint, or the types of its key fields.
    fn table_key(&mut self, table: &TypeTable) -> Option<TypeId> {
        if let Some(key) = table.key_constraint {
            return Some(key);
        }
        if table.key_fields.is_empty() {
            return None;
        }
        let row = self.types.kind(table.constraint).as_record()?;
        let mut key_types = Vec::with_capacity(table.key_fields.len());
        for name in &table.key_fields {
            key_types.push(row.field(name.as_str())?.ty);
        }
        match key_types.as_slice() {
            [single] => Some(*single),
            _ => Some(self.types.tuple(key_types, None)),
        }
    }

    /// `xml<xml<...<C>>>` to `C`.
    fn peel_xml(&self, mut constraint: TypeId) -> TypeId {
        let mut steps = 0;
        while let TypeKind::Xml(inner) = self.types.kind(constraint) {
            if steps >= self.config.max_depth {
                break;
            }
            constraint = inner.constraint;
            steps += 1;
        }
        constraint
    }

    fn xml_constraints(&self, members: &[TypeId]) -> Vec<TypeId> {
        let mut constraints = Vec::new();
        for member in members {
            match self.types.kind(*member) {
                TypeKind::Xml(xml) => constraints.push(self.peel_xml(xml.constraint)),
                TypeKind::XmlItem(_) => constraints.push(*member),
                _ => {}
            }
        }
        constraints
    }

    fn report_depth(&mut self, at: TypeId) {
        if self.limit_reported {
            return;
        }
        self.limit_reported = true;
        tracing::warn!(
            "type parameter matching stopped at depth {}",
            self.config.max_depth
        );
        let diag = recursion_limit(&*self.types, at, self.config.max_depth, self.span);
        emit(self.log, &self.config, diag);
    }
}
