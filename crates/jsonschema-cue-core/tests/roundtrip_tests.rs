//! Round-trip tests: JSON Schema → `extract` → `host::compile` → `generate`.
//!
//! The schemas here use only constructs that both directions express the
//! same way, so the regenerated document must equal the input plus the
//! `$schema` keyword.

use jsonschema_cue_core::{extract, generate, host, Config, GenerateConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn roundtrip(schema: &Value) -> Value {
    let file = extract(schema, &Config::default()).expect("extract should succeed");
    let pkg = host::compile(&file).unwrap_or_else(|e| panic!("compile failed: {e}\n{file}"));
    generate(&host::Value::new(pkg), &GenerateConfig::default())
        .unwrap_or_else(|e| panic!("generate failed: {e}\n{file}"))
}

fn with_schema(mut schema: Value) -> Value {
    schema["$schema"] = json!(DRAFT_2020_12);
    schema
}

fn assert_identity(schema: Value) {
    assert_eq!(roundtrip(&schema), with_schema(schema));
}

// ── Scalars ─────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_string_length() {
    assert_identity(json!({"type": "string", "minLength": 2, "maxLength": 5}));
}

#[test]
fn test_roundtrip_formats() {
    assert_identity(json!({"type": "string", "format": "date-time"}));
    assert_identity(json!({"type": "string", "format": "date"}));
}

#[test]
fn test_roundtrip_enum() {
    assert_identity(json!({"enum": ["a", null, 3]}));
}

#[test]
fn test_roundtrip_one_of_constants() {
    assert_identity(json!({"oneOf": [{"const": "a"}, {"const": "b"}]}));
}

#[test]
fn test_roundtrip_conditional() {
    assert_identity(json!({"if": {"type": "string"}, "else": {"type": "integer"}}));
}

// ── Arrays ──────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_array_items() {
    assert_identity(json!({"type": "array", "items": {"type": "string"}}));
}

#[test]
fn test_roundtrip_array_counts() {
    assert_identity(json!({"type": "array", "minItems": 1, "maxItems": 3}));
}

#[test]
fn test_roundtrip_contains() {
    assert_identity(json!({
        "type": "array",
        "contains": {"type": "integer"},
        "minContains": 2,
        "maxContains": 4
    }));
}

// ── Objects ─────────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_closed_object() {
    assert_identity(json!({
        "type": "object",
        "properties": {"a": {"type": "string"}},
        "additionalProperties": false
    }));
}

#[test]
fn test_roundtrip_required_properties() {
    assert_identity(json!({
        "type": "object",
        "properties": {
            "name": {"type": "string"},
            "tags": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["name"],
        "additionalProperties": false
    }));
}

#[test]
fn test_roundtrip_pattern_and_additional_properties() {
    assert_identity(json!({
        "type": "object",
        "properties": {"a": {"type": "string"}},
        "patternProperties": {"^x-": {"type": "boolean"}},
        "additionalProperties": {"type": "integer"}
    }));
}

#[test]
fn test_roundtrip_min_properties() {
    assert_identity(json!({"type": "object", "minProperties": 1}));
}

// ── Definitions ─────────────────────────────────────────────────────────────

#[test]
fn test_roundtrip_definition_reference() {
    assert_identity(json!({"$ref": "#/$defs/foo", "$defs": {"foo": {"type": "integer"}}}));
}

#[test]
fn test_roundtrip_recursive_definition() {
    assert_identity(json!({
        "$ref": "#/$defs/node",
        "$defs": {
            "node": {
                "type": "object",
                "properties": {
                    "value": {"type": "integer"},
                    "next": {"$ref": "#/$defs/node"}
                }
            }
        }
    }));
}

#[test]
fn test_root_self_reference_becomes_definition() {
    let schema = json!({"type": "object", "properties": {"next": {"$ref": "#"}}});
    assert_eq!(
        roundtrip(&schema),
        json!({
            "$schema": DRAFT_2020_12,
            "$defs": {
                "_schema": {
                    "type": "object",
                    "properties": {"next": {"$ref": "#/$defs/_schema"}}
                }
            },
            "$ref": "#/$defs/_schema"
        })
    );
}

// ── Lossy constructs ────────────────────────────────────────────────────────

#[test]
fn test_not_type_null_regenerates_as_not_const() {
    // `{"not": {"type": "null"}}` extracts as `matchN(0, [null])`, and the
    // only JSON value of kind null is the `null` constant.
    let out = roundtrip(&json!({"not": {"type": "null"}}));
    assert_eq!(out, json!({"$schema": DRAFT_2020_12, "not": {"const": null}}));
}

#[test]
fn test_openapi_int32_regenerates_as_bounds() {
    let cfg = Config {
        default_version: jsonschema_cue_core::Version::OpenApi,
        ..Config::default()
    };
    let file = extract(&json!({"type": "integer", "format": "int32"}), &cfg).unwrap();
    let pkg = host::compile(&file).unwrap();
    let out = generate(&host::Value::new(pkg), &GenerateConfig::default()).unwrap();
    assert_eq!(
        out,
        json!({
            "$schema": DRAFT_2020_12,
            "type": "integer",
            "minimum": -2147483648i64,
            "maximum": 2147483647
        })
    );
}

#[test]
fn test_roundtrip_is_deterministic() {
    let schema = json!({
        "type": "object",
        "properties": {
            "b": {"$ref": "#/$defs/x"},
            "a": {"enum": [1, 2]}
        },
        "$defs": {"x": {"type": "string", "pattern": "^x"}}
    });
    let first = serde_json::to_string(&roundtrip(&schema)).unwrap();
    let second = serde_json::to_string(&roundtrip(&schema)).unwrap();
    assert_eq!(first, second);
}
