use ramfuzz_ast::parse::parse_tu;
use ramfuzz_ast::types::{Builtin, Decl, MethodKind, QualType, Type, TypeName};
use ramfuzz_ast::DeclIndex;

#[test]
fn test_parse_unit_from_file() {
    let json_str = include_str!("fixtures/shapes.json");
    let tu = parse_tu(json_str).unwrap();
    assert_eq!(tu.file, "shapes.hpp");
    assert_eq!(tu.decls.len(), 2); // namespace shapes, struct Foo
    assert!(!tu.has_errors());
    assert_eq!(tu.diagnostics.len(), 1);
}

#[test]
fn test_parse_invalid_json() {
    let result = parse_tu("not json at all");
    assert!(result.is_err());
}

#[test]
fn test_parse_defaults() {
    let tu = parse_tu(r#"{ "file": "a.hpp", "decls": [ { "kind": "record", "name": "A" } ] }"#)
        .unwrap();
    let Decl::Record(a) = &tu.decls[0] else {
        panic!("expected record, got {:?}", tu.decls[0]);
    };
    assert!(a.is_definition);
    assert!(a.from_main_file);
    assert!(!a.is_implicit);
    assert!(a.template_params.is_none());
    assert!(a.methods.is_empty());
}

#[test]
fn test_index_lookups() {
    let units = vec![parse_tu(include_str!("fixtures/shapes.json")).unwrap()];
    let index = DeclIndex::new(&units);

    let circle = index.record("shapes::Circle").unwrap();
    assert!(circle.is_globally_visible());
    assert_eq!(
        circle.decl.bases[0].ty.record_name(),
        Some(&TypeName::parse("shapes::Shape"))
    );
    assert_eq!(circle.decl.methods[0].kind, MethodKind::Constructor);

    let color = index.enumeration("shapes::Color").unwrap();
    assert_eq!(color.decl.enumerators, vec!["Red", "Green", "Blue"]);

    // Forward declaration only.
    assert!(index.record("Foo").is_none());
}

#[test]
fn test_sugar_is_looked_through() {
    let units = vec![parse_tu(include_str!("fixtures/shapes.json")).unwrap()];
    let index = DeclIndex::new(&units);
    let canvas = index.record("shapes::Canvas").unwrap();
    let label = &canvas.decl.methods[2];
    let param = &label.params[0].ty;
    assert!(param.is_reference());

    let (value, depth) = param.ultimate_pointee();
    assert_eq!(depth, 0);
    assert_eq!(value.record_name(), Some(&TypeName::parse("std::basic_string")));

    let referent = param.non_reference().desugared();
    assert!(referent.is_const);
}

#[test]
fn test_ultimate_pointee_counts_pointers() {
    let ty = QualType::lvalue_ref(QualType::pointer_to(QualType::pointer_to(
        QualType::builtin(Builtin::Int).with_const(),
    )));
    let (value, depth) = ty.ultimate_pointee();
    assert_eq!(depth, 2);
    assert_eq!(value.ty, Type::Builtin { name: Builtin::Int });
    assert!(!value.is_const);
}

#[test]
fn test_signature_ignores_typedefs() {
    let units = vec![parse_tu(
        r#"{ "file": "a.hpp", "decls": [ { "kind": "record", "name": "A", "methods": [
            { "name": "f", "params": [ { "type": { "kind": "builtin", "name": "int" } } ] },
            { "name": "f", "params": [ { "type": { "kind": "typedef", "name": "myint",
                "underlying": { "kind": "builtin", "name": "int" } } } ] }
        ] } ] }"#,
    )
    .unwrap()];
    let index = DeclIndex::new(&units);
    let a = index.record("A").unwrap();
    assert_eq!(a.decl.methods[0].signature(), a.decl.methods[1].signature());
}

#[test]
fn test_type_name_spelling() {
    let name = TypeName::parse("::a::(anonymous namespace)::B");
    assert_eq!(name.last(), "B");
    assert!(name.has_anonymous_segment());
    assert_eq!(name.spell(true), "a::B");
    assert_eq!(name.to_string(), "a::(anonymous namespace)::B");
}
