use super::*;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};

/// Renders a type through any [`TypeLookup`].
///
/// Named types print by name. Anonymous cycles print as `...` at the point
/// where they close.
pub struct TypeDisplay<'a> {
    types: &'a dyn TypeLookup,
    id: TypeId,
}

impl<'a> TypeDisplay<'a> {
    pub fn new(types: &'a dyn TypeLookup, id: TypeId) -> Self {
        Self { types, id }
    }
}

impl Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut printer = Printer {
            types: self.types,
            stack: Vec::new(),
        };
        f.write_str(&printer.render(self.id, true))
    }
}

/// Render `id` as a `String`.
pub fn render(types: &dyn TypeLookup, id: TypeId) -> String {
    TypeDisplay::new(types, id).to_string()
}

struct Printer<'a> {
    types: &'a dyn TypeLookup,
    stack: Vec<TypeId>,
}

impl Printer<'_> {
    fn render(&mut self, id: TypeId, top: bool) -> String {
        let types = self.types;
        let Some(node) = types.try_node(id) else {
            return format!("<invalid {}>", id);
        };
        if let Some(name) = &node.name {
            // a named type spells out its structure only at the top level
            if !top || node.is_marker() {
                return name.to_string();
            }
        }
        if self.stack.contains(&id) {
            return "...".to_string();
        }
        self.stack.push(id);
        let rendered = self.render_kind(&node.kind, id);
        self.stack.pop();
        rendered
    }

    fn child(&mut self, id: TypeId) -> String {
        self.render(id, false)
    }

    /// Parenthesize anonymous unions where postfix syntax follows.
    fn atom(&mut self, id: TypeId) -> String {
        let types = self.types;
        let rendered = self.child(id);
        let node = types.node(id);
        if node.name.is_none() && matches!(node.kind, TypeKind::Union(_)) {
            format!("({})", rendered)
        } else {
            rendered
        }
    }

    fn render_kind(&mut self, kind: &TypeKind, id: TypeId) -> String {
        let types = self.types;
        match kind {
            TypeKind::NoType => "<no type>".to_string(),
            TypeKind::Nil => "()".to_string(),
            TypeKind::Never => "never".to_string(),
            TypeKind::Int => "int".to_string(),
            TypeKind::Float => "float".to_string(),
            TypeKind::Decimal => "decimal".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Boolean => "boolean".to_string(),
            TypeKind::Byte => "byte".to_string(),
            TypeKind::Any => "any".to_string(),
            TypeKind::Anydata => "anydata".to_string(),
            TypeKind::Readonly => "readonly".to_string(),
            TypeKind::Array(array) => format!("{}[]", self.atom(array.elem)),
            TypeKind::Tuple(tuple) => {
                let mut members: Vec<String> =
                    tuple.members.iter().map(|member| self.child(*member)).collect();
                if let Some(rest) = tuple.rest {
                    members.push(format!("{}...", self.atom(rest)));
                }
                format!("[{}]", members.join(", "))
            }
            TypeKind::Map(map) => format!("map<{}>", self.child(map.constraint)),
            TypeKind::Record(record) => self.render_record(record),
            TypeKind::Union(union) => {
                if let Some(inner) = types.nilable_inner(id) {
                    return format!("{}?", self.atom(inner));
                }
                union.members.iter().map(|member| self.child(*member)).join("|")
            }
            TypeKind::Error(error) => {
                if id == TypeId::ERROR {
                    "error".to_string()
                } else {
                    format!("error<{}>", self.child(error.detail))
                }
            }
            TypeKind::Stream(stream) => match stream.completion {
                Some(completion) => format!(
                    "stream<{}, {}>",
                    self.child(stream.constraint),
                    self.child(completion)
                ),
                None => format!("stream<{}>", self.child(stream.constraint)),
            },
            TypeKind::Table(table) => {
                let mut out = format!("table<{}>", self.child(table.constraint));
                if let Some(key) = table.key_constraint {
                    out.push_str(&format!(" key<{}>", self.child(key)));
                } else if !table.key_fields.is_empty() {
                    out.push_str(&format!(" key({})", table.key_fields.iter().join(", ")));
                }
                out
            }
            TypeKind::Invokable(invokable) => self.render_invokable(invokable),
            TypeKind::Object(object) => {
                let mut parts = Vec::new();
                for field in &object.fields {
                    parts.push(format!("{} {};", self.child(field.ty), field.name));
                }
                for method in &object.methods {
                    let signature = match types.kind(method.ty) {
                        TypeKind::Invokable(invokable) => {
                            self.render_signature(invokable)
                        }
                        _ => format!("({})", self.child(method.ty)),
                    };
                    let prefix = match &method.resource {
                        Some(resource) => format!(
                            "resource function {} {}",
                            resource.accessor,
                            resource.path.iter().join("/")
                        ),
                        None => format!("function {}", method.name),
                    };
                    parts.push(format!("{}{};", prefix, signature));
                }
                if parts.is_empty() {
                    "object {}".to_string()
                } else {
                    format!("object {{ {} }}", parts.join(" "))
                }
            }
            TypeKind::Typedesc(typedesc) => {
                format!("typedesc<{}>", self.child(typedesc.constraint))
            }
            TypeKind::Xml(xml) => {
                if id == TypeId::XML || xml.constraint == TypeId::XML_ITEMS {
                    "xml".to_string()
                } else {
                    format!("xml<{}>", self.child(xml.constraint))
                }
            }
            TypeKind::XmlItem(item) => match item {
                XmlItemKind::Element => "xml:Element",
                XmlItemKind::Comment => "xml:Comment",
                XmlItemKind::ProcessingInstruction => "xml:ProcessingInstruction",
                XmlItemKind::Text => "xml:Text",
            }
            .to_string(),
        }
    }

    fn render_record(&mut self, record: &TypeRecord) -> String {
        let mut parts = Vec::new();
        for field in &record.fields {
            let readonly = if field.readonly { "readonly " } else { "" };
            let optional = if field.optional { "?" } else { "" };
            parts.push(format!(
                "{}{} {}{};",
                readonly,
                self.child(field.ty),
                field.name,
                optional
            ));
        }
        if let Some(rest) = record.rest {
            parts.push(format!("{}...;", self.atom(rest)));
        }
        let body = parts.join(" ");
        match (record.sealed || record.rest.is_some(), body.is_empty()) {
            (true, true) => "record {||}".to_string(),
            (true, false) => format!("record {{| {} |}}", body),
            (false, true) => "record {}".to_string(),
            (false, false) => format!("record {{ {} }}", body),
        }
    }

    fn render_signature(&mut self, invokable: &TypeInvokable) -> String {
        let mut params: Vec<String> = invokable
            .params
            .iter()
            .map(|param| self.child(*param))
            .collect();
        if let Some(rest) = invokable.rest {
            params.push(format!("{}...", self.atom(rest)));
        }
        let mut out = format!("({})", params.join(", "));
        if invokable.ret != TypeId::NIL {
            out.push_str(&format!(" returns {}", self.child(invokable.ret)));
        }
        out
    }

    fn render_invokable(&mut self, invokable: &TypeInvokable) -> String {
        let isolated = if invokable.isolated { "isolated " } else { "" };
        format!("{}function {}", isolated, self.render_signature(invokable))
    }
}
