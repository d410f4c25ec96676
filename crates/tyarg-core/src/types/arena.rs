use super::*;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::ops::Range;

/// Read access to type nodes.
pub trait TypeLookup {
    fn try_node(&self, id: TypeId) -> Option<&TypeNode>;

    /// Number of addressable nodes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Panics on an id that was never allocated, like indexing a slice.
    fn node(&self, id: TypeId) -> &TypeNode {
        match self.try_node(id) {
            Some(node) => node,
            None => panic!("type id {} out of range ({} nodes)", id, self.len()),
        }
    }

    fn kind(&self, id: TypeId) -> &TypeKind {
        &self.node(id).kind
    }

    fn is_marker(&self, id: TypeId) -> bool {
        self.node(id).is_marker()
    }

    fn marker_key(&self, id: TypeId) -> Option<MarkerKey> {
        self.node(id).marker_key()
    }

    fn union_members(&self, id: TypeId) -> Option<&[TypeId]> {
        self.kind(id).as_union().map(|union| union.members.as_slice())
    }

    /// `T` for a two-member `T|()` union.
    fn nilable_inner(&self, id: TypeId) -> Option<TypeId> {
        let members = self.union_members(id)?;
        match members {
            [a, b] if matches!(self.kind(*b), TypeKind::Nil) => Some(*a),
            [a, b] if matches!(self.kind(*a), TypeKind::Nil) => Some(*b),
            _ => None,
        }
    }

    /// True for error types and for unions made only of error types.
    fn is_error_family(&self, id: TypeId) -> bool {
        match self.kind(id) {
            TypeKind::Error(_) => true,
            TypeKind::Union(union) => {
                !union.members.is_empty()
                    && union.members.iter().all(|member| self.is_error_family(*member))
            }
            _ => false,
        }
    }

    fn display(&self, id: TypeId) -> TypeDisplay<'_>
    where
        Self: Sized,
    {
        TypeDisplay::new(self, id)
    }
}

/// Allocation of new type nodes, plus typed constructors.
pub trait TypeAlloc: TypeLookup {
    fn alloc(&mut self, node: TypeNode) -> TypeId;

    /// Allocate an id whose node is supplied later by [`TypeAlloc::define`].
    /// This is how self-referential types are built.
    fn reserve(&mut self) -> TypeId;

    fn define(&mut self, id: TypeId, node: TypeNode) -> Result<()>;

    fn anonymous(&mut self, kind: TypeKind) -> TypeId {
        self.alloc(TypeNode::anonymous(kind))
    }

    fn named(&mut self, name: impl Into<Ident>, scope: ScopeId, kind: TypeKind) -> TypeId
    where
        Self: Sized,
    {
        self.alloc(TypeNode::named(name, scope, kind))
    }

    fn marker(&mut self, name: impl Into<Ident>, scope: ScopeId, witness: TypeKind) -> TypeId
    where
        Self: Sized,
    {
        self.alloc(TypeNode::marker(name, scope, witness))
    }

    fn array(&mut self, elem: TypeId) -> TypeId {
        self.anonymous(TypeKind::Array(TypeArray { elem }))
    }

    fn tuple(&mut self, members: Vec<TypeId>, rest: Option<TypeId>) -> TypeId {
        self.anonymous(TypeKind::Tuple(TypeTuple { members, rest }))
    }

    fn map(&mut self, constraint: TypeId) -> TypeId {
        self.anonymous(TypeKind::Map(TypeMap { constraint }))
    }

    fn record(&mut self, fields: Vec<Field>, rest: Option<TypeId>, sealed: bool) -> TypeId {
        self.anonymous(TypeKind::Record(TypeRecord {
            fields,
            rest,
            sealed,
        }))
    }

    fn error(&mut self, detail: TypeId) -> TypeId {
        self.anonymous(TypeKind::Error(TypeError { detail }))
    }

    fn stream(&mut self, constraint: TypeId, completion: Option<TypeId>) -> TypeId {
        self.anonymous(TypeKind::Stream(TypeStream {
            constraint,
            completion,
        }))
    }

    fn table(
        &mut self,
        constraint: TypeId,
        key_constraint: Option<TypeId>,
        key_fields: Vec<Ident>,
    ) -> TypeId {
        self.anonymous(TypeKind::Table(TypeTable {
            constraint,
            key_constraint,
            key_fields,
        }))
    }

    fn invokable(&mut self, params: Vec<TypeId>, rest: Option<TypeId>, ret: TypeId) -> TypeId {
        self.anonymous(TypeKind::Invokable(TypeInvokable {
            params,
            rest,
            ret,
            isolated: false,
        }))
    }

    fn object(&mut self, fields: Vec<Field>, methods: Vec<AttachedFunction>) -> TypeId {
        self.anonymous(TypeKind::Object(TypeObject { fields, methods }))
    }

    fn typedesc(&mut self, constraint: TypeId) -> TypeId {
        self.anonymous(TypeKind::Typedesc(TypeTypedesc { constraint }))
    }

    fn xml(&mut self, constraint: TypeId) -> TypeId {
        self.anonymous(TypeKind::Xml(TypeXml { constraint }))
    }

    /// A union over `members`, flattening anonymous unions and dropping
    /// repeated ids. Zero members give `never`, one member is returned as is.
    fn union_of(&mut self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        for member in members {
            let node = self.node(member);
            match &node.kind {
                TypeKind::Union(union) if node.name.is_none() && !node.is_marker() => {
                    for inner in &union.members {
                        if !flat.contains(inner) {
                            flat.push(*inner);
                        }
                    }
                }
                _ => {
                    if !flat.contains(&member) {
                        flat.push(member);
                    }
                }
            }
        }
        match flat.len() {
            0 => TypeId::NEVER,
            1 => flat[0],
            _ => self.anonymous(TypeKind::Union(TypeUnion { members: flat })),
        }
    }

    fn nilable(&mut self, ty: TypeId) -> TypeId {
        self.union_of(vec![ty, TypeId::NIL])
    }
}

/// Owner of declared type nodes.
#[derive(Debug, Clone)]
pub struct TypeArena {
    nodes: Vec<TypeNode>,
    pending: BTreeSet<TypeId>,
}

impl Default for TypeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeArena {
    pub fn new() -> Self {
        let mut arena = Self {
            nodes: Vec::with_capacity(TypeId::BUILTIN_COUNT * 4),
            pending: BTreeSet::new(),
        };
        arena.install_builtins();
        arena
    }

    fn install_builtins(&mut self) {
        let builtins = [
            (TypeId::NO_TYPE, TypeKind::NoType),
            (TypeId::NIL, TypeKind::Nil),
            (TypeId::NEVER, TypeKind::Never),
            (TypeId::INT, TypeKind::Int),
            (TypeId::FLOAT, TypeKind::Float),
            (TypeId::DECIMAL, TypeKind::Decimal),
            (TypeId::STRING, TypeKind::String),
            (TypeId::BOOLEAN, TypeKind::Boolean),
            (TypeId::BYTE, TypeKind::Byte),
            (TypeId::ANY, TypeKind::Any),
            (TypeId::ANYDATA, TypeKind::Anydata),
            (TypeId::READONLY, TypeKind::Readonly),
            (
                TypeId::DETAIL_VALUE,
                TypeKind::Union(TypeUnion {
                    members: vec![TypeId::ANYDATA, TypeId::READONLY],
                }),
            ),
            (
                TypeId::ERROR_DETAIL,
                TypeKind::Map(TypeMap {
                    constraint: TypeId::DETAIL_VALUE,
                }),
            ),
            (
                TypeId::ERROR,
                TypeKind::Error(TypeError {
                    detail: TypeId::ERROR_DETAIL,
                }),
            ),
            (TypeId::XML_ELEMENT, TypeKind::XmlItem(XmlItemKind::Element)),
            (TypeId::XML_COMMENT, TypeKind::XmlItem(XmlItemKind::Comment)),
            (
                TypeId::XML_PI,
                TypeKind::XmlItem(XmlItemKind::ProcessingInstruction),
            ),
            (TypeId::XML_TEXT, TypeKind::XmlItem(XmlItemKind::Text)),
            (
                TypeId::XML_ITEMS,
                TypeKind::Union(TypeUnion {
                    members: vec![
                        TypeId::XML_ELEMENT,
                        TypeId::XML_COMMENT,
                        TypeId::XML_PI,
                        TypeId::XML_TEXT,
                    ],
                }),
            ),
            (
                TypeId::XML,
                TypeKind::Xml(TypeXml {
                    constraint: TypeId::XML_ITEMS,
                }),
            ),
        ];
        for (expected, kind) in builtins {
            let id = self.anonymous(kind);
            debug_assert_eq!(id, expected);
        }
    }

    pub fn overlay(&self) -> TypeOverlay<'_> {
        TypeOverlay::new(self)
    }

    /// Ids reserved but not yet defined.
    pub fn pending(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.pending.iter().copied()
    }

    /// Fails if a reserved id was never defined.
    pub fn validate(&self) -> Result<()> {
        match self.pending.iter().next() {
            Some(id) => Err(Error::Undefined(*id)),
            None => Ok(()),
        }
    }

    /// Append types allocated by an overlay of this arena, keeping their ids.
    pub fn commit(&mut self, local: LocalTypes) -> Result<Range<TypeId>> {
        if local.base_len != self.nodes.len() {
            return Err(Error::StaleOverlay {
                expected: local.base_len,
                found: self.nodes.len(),
            });
        }
        let start = TypeId(self.nodes.len() as u32);
        self.nodes.extend(local.nodes);
        let end = TypeId(self.nodes.len() as u32);
        tracing::trace!("committed local types {}..{}", start, end);
        Ok(start..end)
    }
}

impl TypeLookup for TypeArena {
    fn try_node(&self, id: TypeId) -> Option<&TypeNode> {
        self.nodes.get(id.index())
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl TypeAlloc for TypeArena {
    fn alloc(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn reserve(&mut self) -> TypeId {
        let id = self.alloc(TypeNode::anonymous(TypeKind::NoType));
        self.pending.insert(id);
        id
    }

    fn define(&mut self, id: TypeId, node: TypeNode) -> Result<()> {
        if !self.pending.remove(&id) {
            if id.index() >= self.nodes.len() {
                return Err(Error::UnknownType(id));
            }
            bail!("type id {} is already defined", id);
        }
        self.nodes[id.index()] = node;
        Ok(())
    }
}

/// Resolution-private nodes stacked on a shared, read-only arena.
///
/// Ids handed out by the overlay continue after the arena's last id, so a
/// declared type is never mutated and never shared with instantiated ones.
#[derive(Debug, Clone)]
pub struct TypeOverlay<'a> {
    base: &'a TypeArena,
    local: Vec<TypeNode>,
    pending: BTreeSet<TypeId>,
}

impl<'a> TypeOverlay<'a> {
    pub fn new(base: &'a TypeArena) -> Self {
        Self {
            base,
            local: Vec::new(),
            pending: BTreeSet::new(),
        }
    }

    pub fn base(&self) -> &'a TypeArena {
        self.base
    }

    pub fn is_local(&self, id: TypeId) -> bool {
        id.index() >= self.base.len()
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub fn into_local(self) -> LocalTypes {
        LocalTypes {
            base_len: self.base.len(),
            nodes: self.local,
        }
    }
}

impl TypeLookup for TypeOverlay<'_> {
    fn try_node(&self, id: TypeId) -> Option<&TypeNode> {
        let base_len = self.base.len();
        if id.index() < base_len {
            self.base.try_node(id)
        } else {
            self.local.get(id.index() - base_len)
        }
    }

    fn len(&self) -> usize {
        self.base.len() + self.local.len()
    }
}

impl TypeAlloc for TypeOverlay<'_> {
    fn alloc(&mut self, node: TypeNode) -> TypeId {
        let id = TypeId((self.base.len() + self.local.len()) as u32);
        self.local.push(node);
        id
    }

    fn reserve(&mut self) -> TypeId {
        let id = self.alloc(TypeNode::anonymous(TypeKind::NoType));
        self.pending.insert(id);
        id
    }

    fn define(&mut self, id: TypeId, node: TypeNode) -> Result<()> {
        if !self.pending.remove(&id) {
            if id.index() >= self.len() {
                return Err(Error::UnknownType(id));
            }
            bail!("type id {} is not a pending local type", id);
        }
        let index = id.index() - self.base.len();
        self.local[index] = node;
        Ok(())
    }
}

/// Nodes produced by one overlay, detached from the arena borrow.
#[derive(Debug, Clone, Default)]
pub struct LocalTypes {
    base_len: usize,
    nodes: Vec<TypeNode>,
}

impl LocalTypes {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
