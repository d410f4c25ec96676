//! Discovery of type-parameter markers.

use std::collections::HashSet;
use tyarg_core::types::{TypeId, TypeKind, TypeLookup};

/// Does `id`, or anything structurally reachable from it, carry a marker?
///
/// This is the gate in front of matching: signatures without markers never
/// reach the matcher.
pub fn contains_marker(types: &dyn TypeLookup, id: TypeId) -> bool {
    MarkerScan {
        types,
        visited: HashSet::new(),
        found: None,
    }
    .scan(id)
}

/// Every distinct marker node reachable from `id`, in discovery order.
pub fn markers_in(types: &dyn TypeLookup, id: TypeId) -> Vec<TypeId> {
    let mut scan = MarkerScan {
        types,
        visited: HashSet::new(),
        found: Some(Vec::new()),
    };
    scan.scan(id);
    scan.found.unwrap_or_default()
}

struct MarkerScan<'a> {
    types: &'a dyn TypeLookup,
    visited: HashSet<TypeId>,
    /// When set, keep scanning past the first marker and collect them all.
    found: Option<Vec<TypeId>>,
}

impl MarkerScan<'_> {
    fn scan(&mut self, id: TypeId) -> bool {
        let types = self.types;
        let node = types.node(id);
        if node.is_marker() {
            if let Some(found) = &mut self.found {
                if !found.contains(&id) {
                    found.push(id);
                }
                return false;
            }
            return true;
        }
        if !self.visited.insert(id) {
            return false;
        }
        match &node.kind {
            TypeKind::Array(array) => self.scan(array.elem),
            TypeKind::Tuple(tuple) => self.any(tuple.members.iter().chain(tuple.rest.iter())),
            TypeKind::Map(map) => self.scan(map.constraint),
            TypeKind::Record(record) => {
                self.any(record.fields.iter().map(|field| &field.ty).chain(record.rest.iter()))
            }
            TypeKind::Union(union) => self.any(union.members.iter()),
            TypeKind::Error(error) => self.scan(error.detail),
            TypeKind::Stream(stream) => {
                self.any(std::iter::once(&stream.constraint).chain(stream.completion.iter()))
            }
            TypeKind::Table(table) => {
                self.any(std::iter::once(&table.constraint).chain(table.key_constraint.iter()))
            }
            TypeKind::Invokable(invokable) => self.any(
                invokable
                    .params
                    .iter()
                    .chain(invokable.rest.iter())
                    .chain(std::iter::once(&invokable.ret)),
            ),
            TypeKind::Object(object) => self.any(
                object
                    .fields
                    .iter()
                    .map(|field| &field.ty)
                    .chain(object.methods.iter().map(|method| &method.ty)),
            ),
            TypeKind::Typedesc(typedesc) => self.scan(typedesc.constraint),
            TypeKind::Xml(xml) => self.scan(xml.constraint),
            _ => false,
        }
    }

    fn any<'t>(&mut self, mut ids: impl Iterator<Item = &'t TypeId>) -> bool {
        ids.any(|id| self.scan(*id))
    }
}
