//! Integration tests for building the plugin type registry.

#[allow(dead_code)]
mod helpers;

use helpers::*;
use pretty_assertions::assert_eq;
use serde_yaml::Value;
use task_engine::types::{StructureKind, Type, TypeError, TypeKind, TypeRegistry};

#[test]
fn builtins_only() {
    let reg = registry("{}");
    let names: Vec<&str> = reg.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["any", "boolean", "integer", "null", "number", "string"]);
    assert!(reg["integer"].is_subtype_of(&reg["number"]));
    assert_eq!(TypeRegistry::builtin().len(), 6);
}

#[test]
fn user_type_is_subtype_of_its_super_type() {
    let reg = registry("{A: null, B: {is_a: A}}");
    assert!(reg["B"].is_subtype_of(&reg["A"]));
    assert!(!reg["A"].is_subtype_of(&reg["B"]));
}

#[test]
fn subtyping_is_transitive_along_chains() {
    let reg = registry("{C: {is_a: B}, B: {is_a: A}, A: {is_a: integer}}");
    assert!(reg["C"].is_subtype_of(&reg["A"]));
    assert!(reg["C"].is_subtype_of(&reg["number"]));
    assert!(reg["C"].is_subtype_of(&reg["any"]));
    assert!(!reg["C"].is_subtype_of(&reg["string"]));
}

#[test]
fn invalid_mapping_key_type() {
    let TypeError::InvalidKeyType(key) =
        registry_err("{A: null, bad_mapping_type: {mapping: [A, integer]}}")
    else {
        panic!("expected an invalid key type");
    };
    assert_eq!(*key, Type::simple("A", None));
    assert_eq!(key.name(), Some("A"));
    assert!(key.is_simple());
    assert!(!key.is_builtin());
}

#[test]
fn valid_mapping_key_types() {
    let reg = registry("{by_name: {mapping: [string, number]}, by_index: {mapping: [integer, any]}}");
    assert!(reg["by_name"].accepts(&doc("{a: 1, b: 2.5}")));
    assert!(!reg["by_name"].accepts(&doc("{a: x}")));
    assert!(reg["by_index"].accepts(&doc("{1: x, 2: [y]}")));
    assert!(!reg["by_index"].accepts(&doc("{a: x}")));
}

#[test]
fn structured_key_type_is_rejected() {
    let TypeError::InvalidKeyType(key) =
        registry_err("{pairs: {mapping: [{list: string}, integer]}}")
    else {
        panic!("expected an invalid key type");
    };
    assert_eq!(key.name(), None);
    assert_eq!(key.to_string(), "list[string]");
}

#[test]
fn union_with_structure_is_rejected() {
    let err = registry_err("{U: {union: [integer, string], list: integer}}");
    assert_eq!(err, TypeError::UnionWithStructure(StructureKind::List));
}

#[test]
fn super_type_with_structure_is_rejected() {
    let err = registry_err("{A: {is_a: integer, mapping: {x: integer}}}");
    assert_eq!(err, TypeError::SuperTypeOnNonSimple("mapping"));
    let err = registry_err("{A: {is_a: integer, union: [string]}}");
    assert_eq!(err, TypeError::SuperTypeOnNonSimple("union"));
}

#[test]
fn multiple_structures_are_rejected() {
    let err = registry_err("{A: {tuple: [integer], list: integer, mapping: [string, any]}}");
    assert_eq!(
        err,
        TypeError::TooManyTypeStructures(vec![
            StructureKind::List,
            StructureKind::Tuple,
            StructureKind::Mapping
        ])
    );
}

#[test]
fn builtin_redefinition_is_rejected() {
    for name in ["any", "number", "integer", "boolean", "string", "null"] {
        // Quoted so that `null` stays a string key.
        let err = registry_err(&format!("{{'{}': {{is_a: any}}}}", name));
        assert_eq!(err, TypeError::BuiltinTypeRedefinition(name.into()));
    }
}

#[test]
fn undefined_type_reference() {
    let err = registry_err("{A: {list: Missing}}");
    assert_eq!(err, TypeError::TypeNotFound("Missing".into()));
    let err = registry_err("{A: {is_a: Missing}}");
    assert_eq!(err, TypeError::TypeNotFound("Missing".into()));
}

#[test]
fn non_simple_super_type_is_rejected() {
    let err = registry_err("{L: {list: integer}, A: {is_a: L}}");
    assert_eq!(err, TypeError::NonSimpleSuperType("L".into()));
}

#[test]
fn anonymous_simple_types_are_rejected() {
    assert_eq!(
        registry_err("{A: {tuple: [integer, {is_a: string}]}}"),
        TypeError::AnonymousSimpleType
    );
    assert_eq!(registry_err("{A: {union: [integer, null]}}"), TypeError::AnonymousSimpleType);
}

#[test]
fn reference_cycles_report_closed_path() {
    let cases: [(&str, &[&str]); 4] = [
        ("{A: {is_a: A}}", &["A", "A"]),
        ("{A: {list: B}, B: {list: A}}", &["A", "B", "A"]),
        ("{A: {union: [integer, B]}, B: {tuple: [C]}, C: {mapping: {x: A}}}", &["A", "B", "C", "A"]),
        (
            "{A: {is_a: B}, B: {is_a: C}, C: {is_a: D}, D: {is_a: A}}",
            &["A", "B", "C", "D", "A"],
        ),
    ];
    for (yaml, expected) in cases {
        let TypeError::TypeReferenceCycle(cycle) = registry_err(yaml) else {
            panic!("{} should contain a cycle", yaml);
        };
        assert_eq!(cycle, expected.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(cycle.first(), cycle.last());
    }
}

#[test]
fn cycle_through_inline_definition() {
    let err = registry_err("{A: {list: {mapping: {child: A}}}}");
    assert_eq!(err, TypeError::TypeReferenceCycle(vec!["A".into(), "A".into()]));
}

#[test]
fn structural_subtyping() {
    let reg = registry(
        "\
ints: {list: integer}
nums: {list: number}
pair: {tuple: [integer, string]}
num_pair: {tuple: [number, string]}
point: {mapping: {x: integer, y: integer}}
num_point: {mapping: {x: number, y: number}}
num_table: {mapping: [string, number]}
id: {union: [integer, string]}
",
    );
    assert!(reg["ints"].is_subtype_of(&reg["nums"]));
    assert!(!reg["nums"].is_subtype_of(&reg["ints"]));
    assert!(reg["pair"].is_subtype_of(&reg["num_pair"]));
    assert!(reg["point"].is_subtype_of(&reg["num_point"]));
    assert!(reg["point"].is_subtype_of(&reg["num_table"]));
    assert!(!reg["ints"].is_subtype_of(&reg["pair"]));

    assert!(reg["integer"].is_subtype_of(&reg["id"]));
    assert!(reg["string"].is_subtype_of(&reg["id"]));
    assert!(!reg["boolean"].is_subtype_of(&reg["id"]));
    assert!(!reg["id"].is_subtype_of(&reg["integer"]));
    assert!(reg["id"].is_subtype_of(&reg["any"]));
}

#[test]
fn inline_definitions_are_anonymous() {
    let reg = registry("{matrix: {list: {list: number}}}");
    let TypeKind::Structured(_) = reg["matrix"].kind() else {
        panic!("matrix should be structured");
    };
    assert_eq!(reg["matrix"].name(), Some("matrix"));
    assert!(reg["matrix"].accepts(&doc("[[1, 2], [3.5]]")));
    assert!(!reg["matrix"].accepts(&doc("[1, 2]")));
}

#[test]
fn values_are_checked_against_structure() {
    let reg = registry(
        "\
point: {mapping: {x: number, y: number}}
pair: {tuple: [string, integer]}
maybe_int: {union: [integer, 'null']}
",
    );
    assert!(reg["point"].accepts(&doc("{x: 1, y: 2.5}")));
    assert!(!reg["point"].accepts(&doc("{x: 1}")));
    assert!(!reg["point"].accepts(&doc("{x: 1, y: 2, z: 3}")));
    assert!(reg["pair"].accepts(&doc("[a, 1]")));
    assert!(!reg["pair"].accepts(&doc("[1, a]")));
    assert!(reg["maybe_int"].accepts(&Value::Null));
    assert!(reg["maybe_int"].accepts(&Value::from(4)));
    assert!(!reg["maybe_int"].accepts(&Value::from("4")));
}

#[test]
fn malformed_declarations() {
    for yaml in ["[A, B]", "{A: 5}", "{A: {shape: circle}}", "{A: {union: []}}", "{A: {tuple: integer}}"] {
        assert!(
            matches!(registry_err(yaml), TypeError::MalformedTypeDefinition { .. }),
            "{} should be malformed",
            yaml
        );
    }
}

#[test]
fn error_messages_name_the_offender() {
    assert_eq!(
        registry_err("{id: {is_a: string}, by_id: {mapping: [id, number]}}").to_string(),
        "Invalid mapping key type 'id': must be 'string' or 'integer'"
    );
    assert_eq!(
        registry_err("{A: {list: B}, B: {list: A}}").to_string(),
        "Type reference cycle: A -> B -> A"
    );
    assert_eq!(
        registry_err("{string: null}").to_string(),
        "Built-in type 'string' cannot be redefined"
    );
}
