use pretty_assertions::assert_eq;
use tyarg_core::config::ResolverConfig;
use tyarg_core::span::Span;
use tyarg_core::subtype::StructuralSubtyping;
use tyarg_core::types::{AttachedFunction, Field, TypeAlloc, TypeArena, TypeId, TypeKind, TypeLookup};
use tyarg_core::{Ident, ScopeId};
use tyarg_typing::{Resolution, TypeParamResolver};

static CHECKER: StructuralSubtyping = StructuralSubtyping;

const SCOPE: ScopeId = ScopeId(1);

fn resolve<'a>(arena: &'a TypeArena) -> Resolution<'a, 'static> {
    TypeParamResolver::with_config(&CHECKER, ResolverConfig::default()).begin_resolution(arena)
}

fn bound(resolution: &Resolution<'_, '_>, marker: TypeId) -> String {
    match resolution.bound_type(marker) {
        Some(ty) => resolution.display(ty),
        None => "<unbound>".to_string(),
    }
}

#[test]
fn stream_binds_constraint_and_completion() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let e = arena.marker("E", SCOPE, TypeKind::Any);
    let declared = arena.stream(t, Some(e));
    let actual = arena.stream(TypeId::INT, None);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::INT));
    // no declared completion means the stream completes with nil
    assert_eq!(resolution.bound_type(e), Some(TypeId::NIL));
}

#[test]
fn stream_against_union_of_streams() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let e = arena.marker("E", SCOPE, TypeKind::Any);
    let declared = arena.stream(t, Some(e));
    let ints = arena.stream(TypeId::INT, Some(TypeId::ERROR));
    let strings = arena.stream(TypeId::STRING, None);
    let actual = arena.union_of(vec![ints, strings]);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(bound(&resolution, t), "int|string");
    assert_eq!(bound(&resolution, e), "error?");
    let instantiated = resolution.instantiate(declared);
    assert_eq!(resolution.display(instantiated), "stream<int|string, error?>");
}

#[test]
fn table_binds_row_and_key() {
    let mut arena = TypeArena::new();
    let r = arena.marker("R", SCOPE, TypeKind::Anydata);
    let k = arena.marker("K", SCOPE, TypeKind::Anydata);
    let declared = arena.table(r, Some(k), Vec::new());
    let row = arena.record(
        vec![Field::new("id", TypeId::INT), Field::new("name", TypeId::STRING)],
        None,
        true,
    );
    let by_id = arena.table(row, None, vec![Ident::new("id")]);
    let by_both = arena.table(row, None, vec![Ident::new("id"), Ident::new("name")]);
    let explicit = arena.table(row, Some(TypeId::STRING), Vec::new());

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, by_id, Span::null());
    assert_eq!(resolution.bound_type(r), Some(row));
    assert_eq!(resolution.bound_type(k), Some(TypeId::INT));

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, by_both, Span::null());
    assert_eq!(bound(&resolution, k), "[int, string]");
    let instantiated = resolution.instantiate(declared);
    assert_eq!(
        resolution.display(instantiated),
        "table<record {| int id; string name; |}> key<[int, string]>"
    );

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, explicit, Span::null());
    assert_eq!(resolution.bound_type(k), Some(TypeId::STRING));
}

#[test]
fn keyless_table_leaves_key_unbound() {
    let mut arena = TypeArena::new();
    let r = arena.marker("R", SCOPE, TypeKind::Anydata);
    let k = arena.marker("K", SCOPE, TypeKind::Anydata);
    let declared = arena.table(r, Some(k), Vec::new());
    let row = arena.map(TypeId::INT);
    let actual = arena.table(row, None, Vec::new());

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(r), Some(row));
    assert_eq!(resolution.bound_type(k), None);
    assert!(resolution.diagnostics().is_empty());
}

#[test]
fn tuples_pair_members_up_to_the_shorter_length() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let u = arena.marker("U", SCOPE, TypeKind::Any);
    let v = arena.marker("V", SCOPE, TypeKind::Any);
    let declared = arena.tuple(vec![t, u, v], None);
    let short = arena.tuple(vec![TypeId::INT, TypeId::STRING], None);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, short, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::INT));
    assert_eq!(resolution.bound_type(u), Some(TypeId::STRING));
    assert_eq!(resolution.bound_type(v), None);
    assert!(resolution.diagnostics().is_empty());
}

#[test]
fn tuple_rest_types_are_paired() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let u = arena.marker("U", SCOPE, TypeKind::Any);
    let declared = arena.tuple(vec![t], Some(u));
    let actual = arena.tuple(vec![TypeId::INT, TypeId::BOOLEAN], Some(TypeId::STRING));

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::INT));
    assert_eq!(resolution.bound_type(u), Some(TypeId::STRING));
}

#[test]
fn array_against_union_collects_element_types() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let declared = arena.array(t);
    let ints = arena.array(TypeId::INT);
    let pair = arena.tuple(vec![TypeId::STRING, TypeId::BOOLEAN], None);
    let actual = arena.union_of(vec![ints, pair]);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(bound(&resolution, t), "int|string|boolean");
}

#[test]
fn records_match_by_field_name() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Anydata);
    let u = arena.marker("U", SCOPE, TypeKind::Anydata);
    let declared = arena.record(
        vec![Field::new("name", t), Field::new("age", u).optional()],
        None,
        false,
    );
    let actual = arena.record(
        vec![
            Field::new("email", TypeId::STRING),
            Field::new("name", TypeId::STRING),
        ],
        None,
        true,
    );

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::STRING));
    assert_eq!(resolution.bound_type(u), None);
    assert!(resolution.diagnostics().is_empty());
}

#[test]
fn nilable_unions_match_their_inner_types() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Anydata);
    let declared = arena.nilable(t);
    let actual = arena.nilable(TypeId::STRING);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::STRING));
    let instantiated = resolution.instantiate(declared);
    assert_eq!(resolution.display(instantiated), "string?");
}

#[test]
fn general_unions_are_not_matched() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Anydata);
    let declared = arena.union_of(vec![t, TypeId::INT]);
    let actual = arena.union_of(vec![TypeId::STRING, TypeId::INT, TypeId::BOOLEAN]);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert!(resolution.env().is_empty());
    assert!(resolution.diagnostics().is_empty());
}

#[test]
fn error_detail_is_bound() {
    let mut arena = TypeArena::new();
    let d = arena.marker("D", SCOPE, TypeKind::Anydata);
    let declared = arena.error(d);
    let detail = arena.record(vec![Field::new("code", TypeId::INT)], None, true);
    let actual = arena.error(detail);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(d), Some(detail));
    let instantiated = resolution.instantiate(declared);
    assert_eq!(resolution.display(instantiated), "error<record {| int code; |}>");
}

#[test]
fn union_of_errors_acts_as_top_error() {
    let mut arena = TypeArena::new();
    let d = arena.marker("D", SCOPE, TypeKind::Anydata);
    let declared = arena.error(d);
    let detail = arena.record(vec![Field::new("code", TypeId::INT)], None, true);
    let coded = arena.error(detail);
    let actual = arena.union_of(vec![TypeId::ERROR, coded]);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(d), Some(TypeId::ERROR_DETAIL));
    assert_eq!(bound(&resolution, d), "map<anydata|readonly>");
}

#[test]
fn unpaired_shapes_are_skipped_silently() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Anydata);
    let map = arena.map(t);
    let err = arena.error(t);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(map, TypeId::ERROR, Span::null());
    resolution.bind_from_argument(err, TypeId::INT, Span::null());

    assert!(resolution.env().is_empty());
    assert!(resolution.diagnostics().is_empty());
}

#[test]
fn xml_constraints_are_peeled() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::XmlItem(tyarg_core::types::XmlItemKind::Text));
    let declared = arena.xml(t);
    let text = arena.xml(TypeId::XML_TEXT);
    let nested = arena.xml(text);
    let element = arena.xml(TypeId::XML_ELEMENT);
    let mixed = arena.union_of(vec![element, TypeId::XML_COMMENT]);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, nested, Span::null());
    assert_eq!(resolution.bound_type(t), Some(TypeId::XML_TEXT));

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, TypeId::XML_TEXT, Span::null());
    assert_eq!(resolution.bound_type(t), Some(TypeId::XML_TEXT));

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, TypeId::XML, Span::null());
    assert_eq!(resolution.bound_type(t), Some(TypeId::XML_ITEMS));

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, mixed, Span::null());
    assert_eq!(bound(&resolution, t), "xml:Element|xml:Comment");
    let instantiated = resolution.instantiate(declared);
    assert_eq!(
        resolution.display(instantiated),
        "xml<xml:Element|xml:Comment>"
    );
}

#[test]
fn concrete_xml_is_not_copied() {
    let mut arena = TypeArena::new();
    let text = arena.xml(TypeId::XML_TEXT);

    let mut resolution = resolve(&arena);
    assert_eq!(resolution.instantiate(text), text);
    assert_eq!(resolution.instantiate(TypeId::XML), TypeId::XML);
    assert_eq!(resolution.instantiate(TypeId::ERROR), TypeId::ERROR);
}

#[test]
fn typedesc_constraint_is_bound() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let declared = arena.typedesc(t);
    let actual = arena.typedesc(TypeId::DECIMAL);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::DECIMAL));
}

#[test]
fn function_rest_parameters_are_paired() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Any);
    let declared = arena.invokable(Vec::new(), Some(t), TypeId::NIL);
    let actual = arena.invokable(Vec::new(), Some(TypeId::FLOAT), TypeId::NIL);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());

    assert_eq!(resolution.bound_type(t), Some(TypeId::FLOAT));
    let instantiated = resolution.instantiate(declared);
    assert_eq!(resolution.display(instantiated), "function (float...)");
}

#[test]
fn objects_match_fields_and_methods_by_name() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Anydata);
    let getter = arena.invokable(Vec::new(), None, t);
    let setter = arena.invokable(vec![t], None, TypeId::NIL);
    let declared = arena.object(
        vec![Field::new("value", t)],
        vec![
            AttachedFunction::new("get", getter).resource("get", vec![Ident::new("value")]),
            AttachedFunction::new("set", setter),
        ],
    );
    let actual_getter = arena.invokable(Vec::new(), None, TypeId::INT);
    let actual = arena.object(
        vec![Field::new("value", TypeId::INT)],
        vec![AttachedFunction::new("get", actual_getter)],
    );

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());
    assert_eq!(resolution.bound_type(t), Some(TypeId::INT));
    assert!(resolution.diagnostics().is_empty());

    let instantiated = resolution.instantiate(declared);
    assert_eq!(
        resolution.display(instantiated),
        "object { int value; resource function get value() returns int; function set(int); }"
    );
    let types = resolution.types();
    let TypeKind::Object(object) = types.kind(instantiated) else {
        panic!("expected an object");
    };
    let get = object.method("get").expect("get");
    assert_ne!(get.ty, getter);
    let resource = get.resource.as_ref().expect("resource metadata survives");
    assert_eq!(resource.accessor.as_str(), "get");
}

#[test]
fn named_concrete_types_keep_their_name() {
    let mut arena = TypeArena::new();
    let t = arena.marker("T", SCOPE, TypeKind::Anydata);
    let point = arena.named(
        "Point",
        SCOPE,
        TypeKind::Record(tyarg_core::types::TypeRecord {
            fields: vec![Field::new("x", TypeId::INT), Field::new("y", TypeId::INT)],
            rest: None,
            sealed: true,
        }),
    );
    let declared = arena.tuple(vec![t, point], None);
    let actual = arena.tuple(vec![TypeId::STRING, point], None);

    let mut resolution = resolve(&arena);
    resolution.bind_from_argument(declared, actual, Span::null());
    let instantiated = resolution.instantiate(declared);

    assert_eq!(resolution.display(instantiated), "[string, Point]");
}
