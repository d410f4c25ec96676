use crate::types::*;
use std::collections::HashSet;

/// Subtype checker interface.
///
/// Implementations must be shareable between concurrent resolutions.
pub trait Assignability: Send + Sync {
    /// Can a value of `source` be used where `target` is expected?
    fn is_assignable(&self, types: &dyn TypeLookup, source: TypeId, target: TypeId) -> bool;

    fn is_same_type(&self, types: &dyn TypeLookup, a: TypeId, b: TypeId) -> bool {
        a == b || (self.is_assignable(types, a, b) && self.is_assignable(types, b, a))
    }
}

/// A plain structural subtype relation over [`TypeKind`].
///
/// Recursive type pairs are assumed related while they are being checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSubtyping;

impl StructuralSubtyping {
    pub fn new() -> Self {
        Self
    }
}

impl Assignability for StructuralSubtyping {
    fn is_assignable(&self, types: &dyn TypeLookup, source: TypeId, target: TypeId) -> bool {
        Relation::new(types).assignable(source, target)
    }
}

struct Relation<'a> {
    types: &'a dyn TypeLookup,
    assumed: HashSet<(TypeId, TypeId)>,
    /// Insertion order of `assumed`, for rolling back a failed check.
    trail: Vec<(TypeId, TypeId)>,
    anydata_visiting: HashSet<TypeId>,
}

impl<'a> Relation<'a> {
    fn new(types: &'a dyn TypeLookup) -> Self {
        Self {
            types,
            assumed: HashSet::new(),
            trail: Vec::new(),
            anydata_visiting: HashSet::new(),
        }
    }

    fn assignable(&mut self, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        if !self.assumed.insert((source, target)) {
            return true;
        }
        let mark = self.trail.len();
        self.trail.push((source, target));
        let related = self.check(source, target);
        if !related {
            // anything proven under the failed assumption is unproven again
            for pair in self.trail.drain(mark..) {
                self.assumed.remove(&pair);
            }
        }
        related
    }

    fn check(&mut self, source: TypeId, target: TypeId) -> bool {
        let types = self.types;
        let s = types.kind(source);
        let t = types.kind(target);

        match (s, t) {
            (TypeKind::NoType, _) | (_, TypeKind::NoType) => return false,
            (TypeKind::Never, _) => return true,
            (TypeKind::Union(union), _) => {
                return union
                    .members
                    .iter()
                    .all(|member| self.assignable(*member, target));
            }
            _ => {}
        }

        match t {
            TypeKind::Union(union) => union
                .members
                .iter()
                .any(|member| self.assignable(source, *member)),
            TypeKind::Any => !types.is_error_family(source),
            TypeKind::Anydata => self.is_anydata(source),
            TypeKind::Readonly => self.is_readonly(source),
            TypeKind::Never => false,
            TypeKind::Nil => matches!(s, TypeKind::Nil),
            TypeKind::Int => matches!(s, TypeKind::Int | TypeKind::Byte),
            TypeKind::Float => matches!(s, TypeKind::Float),
            TypeKind::Decimal => matches!(s, TypeKind::Decimal),
            TypeKind::String => matches!(s, TypeKind::String),
            TypeKind::Boolean => matches!(s, TypeKind::Boolean),
            TypeKind::Byte => matches!(s, TypeKind::Byte),
            TypeKind::NoType => false,
            TypeKind::Array(target_array) => match s {
                TypeKind::Array(source_array) => {
                    self.assignable(source_array.elem, target_array.elem)
                }
                TypeKind::Tuple(tuple) => tuple
                    .members
                    .iter()
                    .chain(tuple.rest.iter())
                    .all(|member| self.assignable(*member, target_array.elem)),
                _ => false,
            },
            TypeKind::Tuple(target_tuple) => match s {
                TypeKind::Tuple(source_tuple) => self.tuple_to_tuple(source_tuple, target_tuple),
                TypeKind::Array(source_array) => {
                    target_tuple.members.is_empty()
                        && target_tuple
                            .rest
                            .is_some_and(|rest| self.assignable(source_array.elem, rest))
                }
                _ => false,
            },
            TypeKind::Map(map) => match s {
                TypeKind::Map(source_map) => self.assignable(source_map.constraint, map.constraint),
                TypeKind::Record(record) => {
                    let rest = record.effective_rest();
                    record
                        .fields
                        .iter()
                        .map(|field| field.ty)
                        .chain(rest)
                        .all(|ty| self.assignable(ty, map.constraint))
                }
                _ => false,
            },
            TypeKind::Record(target_record) => match s {
                TypeKind::Record(source_record) => {
                    self.record_to_record(source_record, target_record)
                }
                TypeKind::Map(map) => {
                    target_record.fields.iter().all(|field| {
                        field.optional && self.assignable(map.constraint, field.ty)
                    }) && target_record
                        .effective_rest()
                        .is_some_and(|rest| self.assignable(map.constraint, rest))
                }
                _ => false,
            },
            TypeKind::Error(target_error) => match s {
                TypeKind::Error(source_error) => {
                    target == TypeId::ERROR
                        || self.assignable(source_error.detail, target_error.detail)
                }
                _ => false,
            },
            TypeKind::Stream(target_stream) => match s {
                TypeKind::Stream(source_stream) => {
                    self.assignable(source_stream.constraint, target_stream.constraint)
                        && self.assignable(
                            source_stream.completion.unwrap_or(TypeId::NIL),
                            target_stream.completion.unwrap_or(TypeId::NIL),
                        )
                }
                _ => false,
            },
            TypeKind::Table(target_table) => match s {
                TypeKind::Table(source_table) => {
                    self.assignable(source_table.constraint, target_table.constraint)
                        && match (source_table.key_constraint, target_table.key_constraint) {
                            (Some(source_key), Some(target_key)) => {
                                self.assignable(source_key, target_key)
                            }
                            _ => true,
                        }
                }
                _ => false,
            },
            TypeKind::Invokable(target_fn) => match s {
                TypeKind::Invokable(source_fn) => self.invokable_to_invokable(source_fn, target_fn),
                _ => false,
            },
            TypeKind::Object(target_object) => match s {
                TypeKind::Object(source_object) => {
                    target_object.fields.iter().all(|field| {
                        source_object
                            .field(field.name.as_str())
                            .is_some_and(|source_field| self.assignable(source_field.ty, field.ty))
                    }) && target_object.methods.iter().all(|method| {
                        source_object
                            .method(method.name.as_str())
                            .is_some_and(|source_method| {
                                self.assignable(source_method.ty, method.ty)
                            })
                    })
                }
                _ => false,
            },
            TypeKind::Typedesc(target_desc) => match s {
                TypeKind::Typedesc(source_desc) => {
                    self.assignable(source_desc.constraint, target_desc.constraint)
                }
                _ => false,
            },
            TypeKind::Xml(target_xml) => match s {
                TypeKind::Xml(source_xml) => {
                    self.assignable(source_xml.constraint, target_xml.constraint)
                }
                TypeKind::XmlItem(_) => self.assignable(source, target_xml.constraint),
                _ => false,
            },
            TypeKind::XmlItem(target_item) => match s {
                TypeKind::XmlItem(source_item) => source_item == target_item,
                TypeKind::Xml(source_xml) => self.assignable(source_xml.constraint, target),
                _ => false,
            },
        }
    }

    fn tuple_to_tuple(&mut self, source: &TypeTuple, target: &TypeTuple) -> bool {
        if source.members.len() < target.members.len() {
            return false;
        }
        for (index, member) in source.members.iter().enumerate() {
            let expected = match target.members.get(index) {
                Some(expected) => *expected,
                None => match target.rest {
                    Some(rest) => rest,
                    None => return false,
                },
            };
            if !self.assignable(*member, expected) {
                return false;
            }
        }
        match (source.rest, target.rest) {
            (None, _) => true,
            (Some(source_rest), Some(target_rest)) => self.assignable(source_rest, target_rest),
            (Some(_), None) => false,
        }
    }

    fn record_to_record(&mut self, source: &TypeRecord, target: &TypeRecord) -> bool {
        for field in &target.fields {
            match source.field(field.name.as_str()) {
                Some(source_field) => {
                    if source_field.optional && !field.optional {
                        return false;
                    }
                    if !self.assignable(source_field.ty, field.ty) {
                        return false;
                    }
                }
                None => {
                    if !field.optional {
                        return false;
                    }
                }
            }
        }
        let target_rest = target.effective_rest();
        for field in &source.fields {
            if target.field(field.name.as_str()).is_some() {
                continue;
            }
            match target_rest {
                Some(rest) if self.assignable(field.ty, rest) => {}
                _ => return false,
            }
        }
        match (source.effective_rest(), target_rest) {
            (None, _) => true,
            (Some(source_rest), Some(target_rest)) => self.assignable(source_rest, target_rest),
            (Some(_), None) => false,
        }
    }

    fn invokable_to_invokable(&mut self, source: &TypeInvokable, target: &TypeInvokable) -> bool {
        if target.isolated && !source.isolated {
            return false;
        }
        if source.params.len() != target.params.len() {
            return false;
        }
        let params_ok = source
            .params
            .iter()
            .zip(&target.params)
            .all(|(source_param, target_param)| self.assignable(*target_param, *source_param));
        if !params_ok {
            return false;
        }
        let rest_ok = match (source.rest, target.rest) {
            (_, None) => true,
            (Some(source_rest), Some(target_rest)) => self.assignable(target_rest, source_rest),
            (None, Some(_)) => false,
        };
        rest_ok && self.assignable(source.ret, target.ret)
    }

    fn is_anydata(&mut self, id: TypeId) -> bool {
        if !self.anydata_visiting.insert(id) {
            return true;
        }
        let types = self.types;
        let result = match types.kind(id) {
            TypeKind::NoType
            | TypeKind::Any
            | TypeKind::Readonly
            | TypeKind::Error(_)
            | TypeKind::Stream(_)
            | TypeKind::Invokable(_)
            | TypeKind::Object(_)
            | TypeKind::Typedesc(_) => false,
            TypeKind::Nil
            | TypeKind::Never
            | TypeKind::Int
            | TypeKind::Float
            | TypeKind::Decimal
            | TypeKind::String
            | TypeKind::Boolean
            | TypeKind::Byte
            | TypeKind::Anydata
            | TypeKind::Xml(_)
            | TypeKind::XmlItem(_) => true,
            TypeKind::Array(array) => self.is_anydata(array.elem),
            TypeKind::Tuple(tuple) => tuple
                .members
                .iter()
                .chain(tuple.rest.iter())
                .all(|member| self.is_anydata(*member)),
            TypeKind::Map(map) => self.is_anydata(map.constraint),
            TypeKind::Record(record) => {
                record.fields.iter().all(|field| self.is_anydata(field.ty))
                    && record.rest.map_or(true, |rest| self.is_anydata(rest))
            }
            TypeKind::Union(union) => union.members.iter().all(|member| self.is_anydata(*member)),
            TypeKind::Table(table) => self.is_anydata(table.constraint),
        };
        self.anydata_visiting.remove(&id);
        result
    }

    fn is_readonly(&mut self, id: TypeId) -> bool {
        let types = self.types;
        let node = types.node(id);
        if node.flags.contains(TypeFlags::READONLY) {
            return true;
        }
        matches!(
            node.kind,
            TypeKind::Nil
                | TypeKind::Never
                | TypeKind::Int
                | TypeKind::Float
                | TypeKind::Decimal
                | TypeKind::String
                | TypeKind::Boolean
                | TypeKind::Byte
                | TypeKind::Readonly
                | TypeKind::Error(_)
                | TypeKind::Typedesc(_)
                | TypeKind::XmlItem(_)
        )
    }
}
