mod arena;
pub mod pretty;

pub use arena::{LocalTypes, TypeAlloc, TypeArena, TypeLookup, TypeOverlay};
pub use pretty::TypeDisplay;

use crate::ident::{Ident, ScopeId};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("#{_0}")]
pub struct TypeId(pub u32);

impl TypeId {
    /// Sentinel for "no type available", e.g. an omitted argument.
    pub const NO_TYPE: TypeId = TypeId(0);
    pub const NIL: TypeId = TypeId(1);
    pub const NEVER: TypeId = TypeId(2);
    pub const INT: TypeId = TypeId(3);
    pub const FLOAT: TypeId = TypeId(4);
    pub const DECIMAL: TypeId = TypeId(5);
    pub const STRING: TypeId = TypeId(6);
    pub const BOOLEAN: TypeId = TypeId(7);
    pub const BYTE: TypeId = TypeId(8);
    pub const ANY: TypeId = TypeId(9);
    pub const ANYDATA: TypeId = TypeId(10);
    pub const READONLY: TypeId = TypeId(11);
    /// `anydata|readonly`, the value type of the top error detail.
    pub const DETAIL_VALUE: TypeId = TypeId(12);
    /// `map<anydata|readonly>`
    pub const ERROR_DETAIL: TypeId = TypeId(13);
    /// The unconstrained top `error` type.
    pub const ERROR: TypeId = TypeId(14);
    pub const XML_ELEMENT: TypeId = TypeId(15);
    pub const XML_COMMENT: TypeId = TypeId(16);
    pub const XML_PI: TypeId = TypeId(17);
    pub const XML_TEXT: TypeId = TypeId(18);
    pub const XML_ITEMS: TypeId = TypeId(19);
    /// `xml`, i.e. a sequence of any XML item.
    pub const XML: TypeId = TypeId(20);

    pub const BUILTIN_COUNT: usize = 21;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_builtin(self) -> bool {
        self.index() < Self::BUILTIN_COUNT
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u8 {
        /// The node is a type-parameter marker.
        const PARAMETERIZED = 1 << 0;
        const READONLY      = 1 << 1;
    }
}

/// Logical identity of a type-parameter marker.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[display("{name}")]
pub struct MarkerKey {
    pub scope: ScopeId,
    pub name: Ident,
}

common_enum! {
    #[derive(Copy)]
    pub enum XmlItemKind {
        Element,
        Comment,
        ProcessingInstruction,
        Text,
    }
}

common_enum! {
    pub enum TypeKind {
        NoType,
        Nil,
        Never,
        Int,
        Float,
        Decimal,
        String,
        Boolean,
        Byte,
        Any,
        Anydata,
        Readonly,
        Array(TypeArray),
        Tuple(TypeTuple),
        Map(TypeMap),
        Record(TypeRecord),
        Union(TypeUnion),
        Error(TypeError),
        Stream(TypeStream),
        Table(TypeTable),
        Invokable(TypeInvokable),
        Object(TypeObject),
        Typedesc(TypeTypedesc),
        Xml(TypeXml),
        XmlItem(XmlItemKind),
    }
}

impl TypeKind {
    /// Leaves have no structural children.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            TypeKind::NoType
                | TypeKind::Nil
                | TypeKind::Never
                | TypeKind::Int
                | TypeKind::Float
                | TypeKind::Decimal
                | TypeKind::String
                | TypeKind::Boolean
                | TypeKind::Byte
                | TypeKind::Any
                | TypeKind::Anydata
                | TypeKind::Readonly
                | TypeKind::XmlItem(_)
        )
    }

    pub fn is_xml_family(&self) -> bool {
        matches!(self, TypeKind::Xml(_) | TypeKind::XmlItem(_))
    }

    pub fn as_union(&self) -> Option<&TypeUnion> {
        match self {
            TypeKind::Union(union) => Some(union),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&TypeRecord> {
        match self {
            TypeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_invokable(&self) -> Option<&TypeInvokable> {
        match self {
            TypeKind::Invokable(invokable) => Some(invokable),
            _ => None,
        }
    }
}

common_struct! {
    pub struct TypeArray {
        pub elem: TypeId,
    }
}

common_struct! {
    pub struct TypeTuple {
        pub members: Vec<TypeId>,
        pub rest: Option<TypeId>,
    }
}

common_struct! {
    pub struct TypeMap {
        pub constraint: TypeId,
    }
}

common_struct! {
    /// A record or object field.
    pub struct Field {
        pub name: Ident,
        pub ty: TypeId,
        pub optional: bool,
        pub readonly: bool,
    }
}

impl Field {
    pub fn new(name: impl Into<Ident>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            readonly: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Same field, different type.
    pub fn with_ty(&self, ty: TypeId) -> Self {
        Self {
            name: self.name.clone(),
            ty,
            optional: self.optional,
            readonly: self.readonly,
        }
    }
}

common_struct! {
    pub struct TypeRecord {
        pub fields: Vec<Field>,
        pub rest: Option<TypeId>,
        pub sealed: bool,
    }
}

impl TypeRecord {
    /// Type of the fields the record does not name. Open records admit `anydata`.
    pub fn effective_rest(&self) -> Option<TypeId> {
        match self.rest {
            Some(rest) => Some(rest),
            None if self.sealed => None,
            None => Some(TypeId::ANYDATA),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.as_str() == name)
    }
}

common_struct! {
    /// Members keep declaration order.
    pub struct TypeUnion {
        pub members: Vec<TypeId>,
    }
}

common_struct! {
    pub struct TypeError {
        pub detail: TypeId,
    }
}

common_struct! {
    pub struct TypeStream {
        pub constraint: TypeId,
        pub completion: Option<TypeId>,
    }
}

common_struct! {
    pub struct TypeTable {
        pub constraint: TypeId,
        pub key_constraint: Option<TypeId>,
        pub key_fields: Vec<Ident>,
    }
}

common_struct! {
    pub struct TypeInvokable {
        pub params: Vec<TypeId>,
        pub rest: Option<TypeId>,
        pub ret: TypeId,
        pub isolated: bool,
    }
}

common_struct! {
    /// Accessor and path of a resource method, e.g. `get` on `users/[string]`.
    pub struct ResourceAccessor {
        pub accessor: Ident,
        pub path: Vec<Ident>,
    }
}

common_struct! {
    pub struct AttachedFunction {
        pub name: Ident,
        /// Always an invokable type.
        pub ty: TypeId,
        pub resource: Option<ResourceAccessor>,
    }
}

impl AttachedFunction {
    pub fn new(name: impl Into<Ident>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            resource: None,
        }
    }

    pub fn resource(mut self, accessor: impl Into<Ident>, path: Vec<Ident>) -> Self {
        self.resource = Some(ResourceAccessor {
            accessor: accessor.into(),
            path,
        });
        self
    }

    /// Duplicate the descriptor for a new signature, keeping resource metadata.
    pub fn with_ty(&self, ty: TypeId) -> Self {
        Self {
            name: self.name.clone(),
            ty,
            resource: self.resource.clone(),
        }
    }
}

common_struct! {
    pub struct TypeObject {
        pub fields: Vec<Field>,
        pub methods: Vec<AttachedFunction>,
    }
}

impl TypeObject {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name.as_str() == name)
    }

    pub fn method(&self, name: &str) -> Option<&AttachedFunction> {
        self.methods.iter().find(|method| method.name.as_str() == name)
    }
}

common_struct! {
    pub struct TypeTypedesc {
        pub constraint: TypeId,
    }
}

common_struct! {
    pub struct TypeXml {
        pub constraint: TypeId,
    }
}

common_struct! {
    pub struct TypeNode {
        pub kind: TypeKind,
        pub name: Option<Ident>,
        pub scope: ScopeId,
        pub flags: TypeFlags,
    }
}

impl TypeNode {
    pub fn anonymous(kind: TypeKind) -> Self {
        Self {
            kind,
            name: None,
            scope: ScopeId::ROOT,
            flags: TypeFlags::empty(),
        }
    }

    pub fn named(name: impl Into<Ident>, scope: ScopeId, kind: TypeKind) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            scope,
            flags: TypeFlags::empty(),
        }
    }

    /// A type-parameter marker whose witness shape is `witness`.
    pub fn marker(name: impl Into<Ident>, scope: ScopeId, witness: TypeKind) -> Self {
        Self {
            kind: witness,
            name: Some(name.into()),
            scope,
            flags: TypeFlags::PARAMETERIZED,
        }
    }

    pub fn is_marker(&self) -> bool {
        self.flags.contains(TypeFlags::PARAMETERIZED)
    }

    pub fn marker_key(&self) -> Option<MarkerKey> {
        if !self.is_marker() {
            return None;
        }
        let name = self.name.clone()?;
        Some(MarkerKey {
            scope: self.scope,
            name,
        })
    }
}
