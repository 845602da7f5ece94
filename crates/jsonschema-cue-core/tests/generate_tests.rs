//! Generation tests driven by serialized host values, the same form the CLI
//! `generate` subcommand reads.

use jsonschema_cue_core::host::{self, Expr};
use jsonschema_cue_core::{generate, ConvertError, GenerateConfig, Version};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn host_value(v: Value) -> host::Value {
    let expr: Expr = serde_json::from_value(v).expect("host expression should deserialize");
    host::Value::from_expr(expr)
}

fn gen(v: Value) -> Value {
    generate(&host_value(v), &GenerateConfig::default()).expect("generate should succeed")
}

#[test]
fn test_closed_struct() {
    let v = json!({"struct": {
        "fields": [
            {"label": "a", "value": {"kind": "string"}},
            {"label": "b", "constraint": "optional", "value": {"kind": "number"}}
        ],
        "openness": "closed"
    }});
    assert_eq!(
        gen(v),
        json!({
            "$schema": DRAFT_2020_12,
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "number"}},
            "required": ["a"],
            "additionalProperties": false
        })
    );
}

#[test]
fn test_keyword_order() {
    let v = json!({"struct": {
        "fields": [
            {"label": "#id", "value": {"and": [
                {"kind": "string"},
                {"unary": {"op": "=~", "arg": {"lit": "^[a-z]+$"}}}
            ]}},
            {"label": "id", "constraint": "required", "value": {"ref": "#id"}}
        ],
        "openness": "closed"
    }});
    let out = serde_json::to_string(&gen(v)).unwrap();
    assert_eq!(
        out,
        concat!(
            r##"{"$schema":"https://json-schema.org/draft/2020-12/schema","##,
            r##""$defs":{"id":{"type":"string","pattern":"^[a-z]+$"}},"##,
            r##""type":"object","##,
            r##""additionalProperties":false,"properties":{"id":{"$ref":"#/$defs/id"}},"##,
            r##""required":["id"]}"##
        )
    );
}

#[test]
fn test_builtin_validators() {
    let v = json!({"and": [
        {"kind": "int"},
        {"call": {"func": "math.MultipleOf", "args": [{"lit": 5}]}},
        {"unary": {"op": ">", "arg": {"lit": 0}}}
    ]});
    assert_eq!(
        gen(v),
        json!({
            "$schema": DRAFT_2020_12,
            "type": "integer",
            "multipleOf": 5,
            "exclusiveMinimum": 0
        })
    );
}

#[test]
fn test_list_with_struct_items() {
    let v = json!({"list": {
        "rest": {"struct": {"fields": [
            {"label": "x", "constraint": "optional", "value": {"kind": "float"}}
        ]}}
    }});
    assert_eq!(
        gen(v),
        json!({
            "$schema": DRAFT_2020_12,
            "type": "array",
            "items": {"type": "object", "properties": {"x": {"type": "number"}}}
        })
    );
}

#[test]
fn test_nullable_disjunction() {
    let v = json!({"or": [{"lit": null}, {"kind": "string"}]});
    assert_eq!(
        gen(v),
        json!({"$schema": DRAFT_2020_12, "anyOf": [{"const": null}, {"type": "string"}]})
    );
}

#[test]
fn test_errors_are_collected() {
    let v = json!({"struct": {"fields": [
        {"label": "a", "value": {"call": {"func": "strings.MinRunes"}}},
        {"label": "b", "value": {"call": {"func": "list.MaxItems", "args": [{"lit": -1}]}}}
    ]}});
    let err = generate(&host_value(v), &GenerateConfig::default()).unwrap_err();
    let messages: Vec<String> = err.diagnostics().iter().map(|d| d.to_string()).collect();
    assert_eq!(
        messages,
        vec![
            "a: strings.MinRunes expects 1 argument, got 0",
            "b: list.MaxItems argument must be a non-negative integer",
        ]
    );
}

#[test]
fn test_dangling_reference_is_rejected() {
    let err = generate(&host_value(json!({"ref": "#missing"})), &GenerateConfig::default())
        .unwrap_err();
    assert!(
        matches!(&err, ConvertError::InvalidValue { message, .. } if message.contains("#missing")),
        "{err}"
    );
}

#[test]
fn test_older_versions_are_rejected() {
    let cfg = GenerateConfig {
        version: Version::Draft2019_09,
        ..GenerateConfig::default()
    };
    let err = generate(&host_value(json!("top")), &cfg).unwrap_err();
    assert_eq!(
        err.to_string(),
        "only version https://json-schema.org/draft/2020-12/schema is supported for generating JSON Schema for now (requested https://json-schema.org/draft/2019-09/schema)"
    );
}

#[test]
fn test_generate_config_from_json() {
    let cfg: GenerateConfig =
        serde_json::from_value(json!({"version": "draft2020-12", "explicit-open": true})).unwrap();
    assert!(cfg.explicit_open);
    assert_eq!(cfg.version, Version::Draft2020_12);
}
