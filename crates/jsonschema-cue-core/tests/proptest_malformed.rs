//! Rejection tests for schemas that are valid JSON but not valid JSON Schema.
//!
//! Every malformed keyword shape must come back as `ConvertError::Schema`
//! with a diagnostic pointing at the offending keyword. Schemas that are
//! accepted are pushed through `host::compile` and `generate()`, whose
//! failures must stay typed errors about the value.
//!
//! `fuzz/fuzz_targets/fuzz_extract.rs` covers arbitrary bytes; this file
//! pins down the diagnostics for the shapes we know about.

use jsonschema_cue_core::{
    ast, extract, generate, host, Config, ConvertError, Diagnostic, ErrorKind, GenerateConfig,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Diagnostics for a schema that extraction has to reject.
fn rejected(schema: &Value) -> Vec<Diagnostic> {
    match extract(schema, &Config::default()) {
        Ok(file) => panic!("expected {schema} to be rejected, got:\n{file}"),
        Err(e) => {
            assert!(matches!(e, ConvertError::Schema(_)), "{e:?}");
            e.diagnostics().to_vec()
        }
    }
}

/// Asserts the first diagnostic for `schema`.
fn assert_first(schema: Value, location: &str, message: &str) {
    let diags = rejected(&schema);
    assert!(!diags.is_empty());
    assert_eq!(diags[0].location, location, "{diags:?}");
    assert_eq!(diags[0].message, message, "{diags:?}");
}

/// Runs an extracted file through the host and back to JSON Schema.
/// `None` when the host cannot compile it.
fn regenerate(file: &ast::File) -> Option<Result<Value, ConvertError>> {
    let pkg = host::compile(file).ok()?;
    Some(generate(&host::Value::new(pkg), &GenerateConfig::default()))
}

/// The generator may refuse a value, but with default settings never for
/// configuration or version reasons.
fn check_generated(result: &Result<Value, ConvertError>) {
    match result {
        Ok(out) => assert!(out.is_object() || out.is_boolean(), "{out}"),
        Err(ConvertError::InvalidValue { message, .. }) => assert!(!message.is_empty()),
        Err(ConvertError::Schema(errs)) => assert!(!errs.is_empty()),
        Err(other) => panic!("unexpected generate error: {other:?}"),
    }
}

// ===========================================================================
// Keyword shapes
// ===========================================================================

#[test]
fn test_required_as_string() {
    assert_first(
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": "not_an_array"
        }),
        "#/required",
        r#"value of "required" must be list of strings, found string"#,
    );
}

#[test]
fn test_any_of_as_object() {
    let diags = rejected(&json!({ "anyOf": { "not": "an_array" } }));
    let messages: Vec<&str> = diags.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            r#"value of "anyOf" must be an array, found struct"#,
            "anyOf requires at least one subschema",
        ]
    );
    assert!(diags.iter().all(|d| d.location == "#/anyOf"));
}

#[test]
fn test_one_of_as_string() {
    assert_first(
        json!({ "oneOf": "not_an_array" }),
        "#/oneOf",
        r#"value of "oneOf" must be an array, found string"#,
    );
}

#[test]
fn test_all_of_as_object() {
    assert_first(
        json!({ "allOf": { "type": "string" } }),
        "#/allOf",
        r#"value of "allOf" must be an array, found struct"#,
    );
}

#[test]
fn test_properties_as_string() {
    assert_first(
        json!({ "type": "object", "properties": "a_string" }),
        "#/properties",
        r#""properties" expected an object, found string"#,
    );
}

#[test]
fn test_type_as_number() {
    assert_first(
        json!({ "type": 42 }),
        "#/type",
        r#"value of "type" must be a string or list of strings, found number"#,
    );
}

#[test]
fn test_type_list_of_numbers() {
    let diags = rejected(&json!({ "type": [1, "string"] }));
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].location, "#/type/0");
    assert_eq!(diags[0].message, "type value should be a string");
}

#[test]
fn test_items_as_number() {
    assert_first(
        json!({ "type": "array", "items": 42 }),
        "#/items",
        r#"value of "items" must be an object, boolean or array, found number"#,
    );
}

#[test]
fn test_enum_as_string() {
    assert_first(
        json!({ "enum": "not_an_array" }),
        "#/enum",
        r#"value of "enum" must be an array, found string"#,
    );
}

#[test]
fn test_ref_as_number() {
    let diags = rejected(&json!({ "$ref": 42 }));
    assert_eq!(diags[0].kind, ErrorKind::Structural);
    assert_eq!(diags[0].location, "#/$ref");
    assert_eq!(diags[0].message, "invalid string");
}

#[test]
fn test_additional_properties_as_list() {
    assert_first(
        json!({ "additionalProperties": [1, 2] }),
        "#/additionalProperties",
        r#"value of "additionalProperties" must be an object or boolean"#,
    );
}

#[test]
fn test_negative_min_items() {
    assert_first(
        json!({ "type": "array", "items": { "type": "string" }, "minItems": -1 }),
        "#/minItems",
        "invalid uint",
    );
}

#[test]
fn test_invalid_pattern_regex() {
    let diags = rejected(&json!({ "type": "string", "pattern": "[invalid" }));
    assert_eq!(diags[0].location, "#/pattern");
    assert!(
        diags[0].message.starts_with(r#"invalid regexp "[invalid": "#),
        "{}",
        diags[0].message
    );
}

#[test]
fn test_unresolvable_ref() {
    let diags = rejected(&json!({ "$ref": "#/$defs/DoesNotExist" }));
    assert_eq!(diags[0].kind, ErrorKind::Reference);
    assert_eq!(diags[0].location, "#/$ref");
    assert_eq!(
        diags[0].message,
        "reference https://cue.jsonschema.invalid/#/$defs/DoesNotExist not found"
    );
}

// ===========================================================================
// Nesting
// ===========================================================================

#[test]
fn test_error_inside_valid_parent() {
    let diags = rejected(&json!({
        "type": "object",
        "properties": {
            "good": { "type": "string" },
            "bad": { "type": "object", "properties": "not_an_object" }
        }
    }));
    assert_eq!(diags.len(), 1, "{diags:?}");
    assert_eq!(diags[0].location, "#/properties/bad/properties");
    assert_eq!(diags[0].message, r#""properties" expected an object, found string"#);
}

#[test]
fn test_error_deep_in_tree() {
    assert_first(
        json!({
            "type": "object",
            "properties": {
                "level1": {
                    "type": "object",
                    "properties": {
                        "level2": {
                            "type": "object",
                            "properties": { "level3": { "required": 42 } }
                        }
                    }
                }
            }
        }),
        "#/properties/level1/properties/level2/properties/level3/required",
        r#"value of "required" must be list of strings, found number"#,
    );
}

// ===========================================================================
// Top-level values
// ===========================================================================

#[test]
fn test_non_object_roots() {
    for (schema, kind) in [
        (json!(null), "null"),
        (json!([1, 2, 3]), "list"),
        (json!("just_a_string"), "string"),
        (json!(42), "number"),
    ] {
        let diags = rejected(&schema);
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert_eq!(diags[0].to_string(), format!("#: schema expects mapping node, found {kind}"));
    }
}

#[test]
fn test_true_schema_regenerates_as_empty_schema() {
    let file = extract(&json!(true), &Config::default()).unwrap();
    let out = regenerate(&file).expect("top compiles").unwrap();
    assert_eq!(out, json!({ "$schema": "https://json-schema.org/draft/2020-12/schema" }));
}

#[test]
fn test_false_schema_is_refused_by_generate() {
    let file = extract(&json!(false), &Config::default()).unwrap();
    let result = regenerate(&file).expect("bottom compiles");
    let err = result.unwrap_err();
    assert!(matches!(err, ConvertError::InvalidValue { .. }), "{err}");
    check_generated(&Err(err));
}

// ===========================================================================
// Generated shapes
// ===========================================================================

/// A keyword paired with a value of the wrong type.
fn arb_malformed_keyword() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        Just(("required", json!("not_an_array"))),
        Just(("required", json!(42))),
        Just(("required", json!({"key": "value"}))),
        Just(("properties", json!("not_an_object"))),
        Just(("properties", json!(["a", "b"]))),
        Just(("properties", json!(99))),
        Just(("type", json!(42))),
        Just(("type", json!([1, 2, 3]))),
        Just(("type", json!(null))),
        Just(("allOf", json!({"type": "string"}))),
        Just(("anyOf", json!("bad"))),
        Just(("oneOf", json!(true))),
        Just(("items", json!(99))),
        Just(("items", json!("bad"))),
        Just(("enum", json!("bad"))),
        Just(("$ref", json!(42))),
        Just(("$ref", json!(["a", "b"]))),
        Just(("additionalProperties", json!([1, 2]))),
        Just(("additionalProperties", json!("bad"))),
        Just(("minLength", json!(-3))),
        Just(("maxItems", json!(1.5))),
    ]
}

/// An object holding one to three malformed keywords.
fn arb_malformed_schema() -> impl Strategy<Value = Value> {
    proptest::collection::vec(arb_malformed_keyword(), 1..=3).prop_map(|keywords| {
        let obj: serde_json::Map<String, Value> =
            keywords.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Value::Object(obj)
    })
}

/// A well-formed schema built from a few independent keywords.
fn arb_valid_schema() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(json!({"type": "string", "minLength": 1})),
        Just(json!({"type": "integer", "minimum": 0})),
        Just(json!({"enum": ["a", "b", null]})),
        Just(json!({"type": "array", "items": {"type": "boolean"}})),
        Just(json!(true)),
        Just(json!(false)),
    ];
    proptest::collection::vec(("[a-z]{1,6}", leaf), 0..4).prop_map(|fields| {
        let required: Vec<&str> = fields.iter().take(1).map(|(k, _)| k.as_str()).collect();
        let properties: serde_json::Map<String, Value> = fields.iter().cloned().collect();
        json!({"type": "object", "properties": properties, "required": required})
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, ..Default::default() })]

    /// Every malformed shape is rejected, and every diagnostic sits under
    /// one of the keywords that was malformed.
    #[test]
    fn test_malformed_keywords_are_located(schema in arb_malformed_schema()) {
        let diags = rejected(&schema);
        prop_assert!(!diags.is_empty());
        let keys: Vec<String> = schema
            .as_object()
            .map(|obj| obj.keys().map(|k| format!("#/{k}")).collect())
            .unwrap_or_default();
        for d in &diags {
            prop_assert!(
                keys.iter().any(|k| d.location == *k || d.location.starts_with(&format!("{k}/"))),
                "location {:?} is not under any of {:?}", d.location, keys
            );
            prop_assert!(!d.message.is_empty());
            prop_assert_eq!(d.to_string(), format!("{}: {}", d.location, d.message));
        }
    }

    /// Accepted schemas survive the trip through the host and generator,
    /// or fail there with a typed value error.
    #[test]
    fn test_accepted_schemas_regenerate(schema in arb_valid_schema()) {
        let file = match extract(&schema, &Config::default()) {
            Ok(file) => file,
            Err(e) => return Err(TestCaseError::fail(format!("{schema} rejected: {e}"))),
        };
        if let Some(result) = regenerate(&file) {
            check_generated(&result);
        }
    }
}
