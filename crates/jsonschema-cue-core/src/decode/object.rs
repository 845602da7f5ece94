//! Object keywords.
//!
//! `properties` and `required` fill in the fields of the struct literal in
//! progress. `patternProperties` and `additionalProperties` add pattern
//! constraints that exclude the names already covered, so each field is
//! constrained by exactly the schemas that apply to it.

use serde_json::Value;

use crate::ast::{Attribute, Constraint, Decl, Expr, Field, Label, UnaryOp};
use crate::error::ErrorKind;
use crate::kind::Kind;

use super::state::{CoreType, Openness, State};
use super::Node;

/// The regular field name a label declares.
fn label_name(label: &Label) -> Option<&str> {
    match label {
        Label::Ident(name) | Label::String(name) => Some(name.as_str()),
        Label::Pattern(_) => None,
    }
}

/// `!~"^(a|b)$"` for the named fields in `decls`; empty if there are none.
pub(super) fn exclude_fields(decls: &[Decl]) -> Vec<Expr> {
    let names: Vec<String> = decls
        .iter()
        .filter_map(|d| match d {
            Decl::Field(f) => label_name(&f.label).map(regex::escape),
            _ => None,
        })
        .collect();
    if names.is_empty() {
        return Vec::new();
    }
    let re = format!("^({})$", names.join("|"));
    vec![Expr::unary(UnaryOp::NotMatch, Expr::string(re))]
}

fn embed_pattern(pattern: Expr, value: Expr) -> Decl {
    let field = Field::new(Label::pattern(pattern), value);
    Decl::Embed(Expr::struct_lit(vec![Decl::Field(field)]))
}

pub(super) fn properties<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if !n.value.is_object() {
        let msg = format!(r#""properties" expected an object, found {}"#, n.kind_name());
        s.errf(ErrorKind::Structural, n, msg);
        return;
    }
    s.object(n);
    s.has_properties = true;
    for (name, child) in n.entries() {
        let (value, info) = s.schema_state(&child, Kind::TOP, |c| c.preserve_unknown_fields = false);
        let mut field = Field::new(Label::name(name), value)
            .optional()
            .with_doc(info.comment());
        if info.deprecated {
            field = field.with_attr(Attribute::deprecated());
        }
        s.object(n).push(Decl::Field(field));
    }
}

pub(super) fn required<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if !n.value.is_array() {
        let msg = format!(r#"value of "required" must be list of strings, found {}"#, n.kind_name());
        s.errf(ErrorKind::Structural, n, msg);
        return;
    }
    s.object(n);
    for item in n.elements() {
        let Some(name) = s.str_value(&item) else {
            continue;
        };
        let obj = s.object(n);
        let existing = obj.iter_mut().find_map(|d| match d {
            Decl::Field(f) if label_name(&f.label) == Some(name) => Some(f),
            _ => None,
        });
        let duplicate = match existing {
            Some(f) => {
                let was_optional = f.constraint == Constraint::Optional;
                f.constraint = Constraint::Required;
                !was_optional
            }
            None => {
                obj.push(Decl::Field(Field::new(Label::name(name), Expr::top()).required()));
                false
            }
        };
        if duplicate {
            s.errf(ErrorKind::Structural, &item, format!("duplicate required field {name:?}"));
        }
    }
}

pub(super) fn pattern_properties<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if !n.value.is_object() {
        let msg = format!(r#"value of "patternProperties" must be an object, found {}"#, n.kind_name());
        s.errf(ErrorKind::Structural, n, msg);
        return;
    }
    let existing = exclude_fields(s.object(n));
    for (re, child) in n.entries() {
        if !super::string::check_regexp(s, &child, re) {
            continue;
        }
        s.patterns.push(Expr::unary(UnaryOp::NotMatch, Expr::string(re)));
        let mut label = vec![Expr::unary(UnaryOp::Match, Expr::string(re))];
        label.extend(existing.iter().cloned());
        let value = s.schema(&child);
        s.object(n).push(embed_pattern(Expr::and_all(label), value));
    }
}

pub(super) fn additional_properties<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    match n.value {
        Value::Bool(open) => {
            s.openness = if *open {
                Openness::ExplicitlyOpen
            } else {
                Openness::ExplicitlyClosed
            };
            s.object(n);
        }
        Value::Object(_) => {
            s.openness = Openness::AllFieldsCovered;
            s.has_additional_properties = true;
            if s.object(n).is_empty() {
                let value = s.schema_state(n, Kind::TOP, |c| c.preserve_unknown_fields = false).0;
                let field = Field::new(Label::pattern(Expr::ident("string")), value);
                s.object(n).push(Decl::Field(field));
                return;
            }
            let mut rest = s.patterns.clone();
            rest.extend(exclude_fields(s.object(n)));
            let value = s.schema_state(n, Kind::TOP, |c| c.preserve_unknown_fields = false).0;
            s.object(n).push(embed_pattern(Expr::and_all(rest), value));
        }
        _ => {
            s.errf(
                ErrorKind::Structural,
                n,
                r#"value of "additionalProperties" must be an object or boolean"#,
            );
        }
    }
}

pub(super) fn min_properties<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(count) = s.uint(n) {
        s.add(CoreType::Object, n, Expr::call("struct", "MinFields", vec![Expr::int(count)]));
    }
}

pub(super) fn max_properties<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(count) = s.uint(n) {
        s.add(CoreType::Object, n, Expr::call("struct", "MaxFields", vec![Expr::int(count)]));
    }
}

pub(super) fn property_names<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let (names, _) = s.schema_state(n, Kind::STRING, |_| {});
    if names.is_top() {
        return;
    }
    let field = Field::new(Label::pattern(names), Expr::top());
    s.add(CoreType::Object, n, Expr::struct_lit(vec![Decl::Field(field)]));
}

/// `x-kubernetes-preserve-unknown-fields`.
pub(super) fn preserve_unknown_fields<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    match s.bool_value(n) {
        Some(true) => s.preserve_unknown_fields = true,
        Some(false) => {
            s.errf(
                ErrorKind::Version,
                n,
                "x-kubernetes-preserve-unknown-fields value may not be false",
            );
        }
        None => {}
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::decode::extract;
    use crate::version::Version;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn extract_with(schema: Value, cfg: &Config) -> Result<String, Vec<String>> {
        extract(&schema, cfg)
            .map(|f| f.to_string())
            .map_err(|e| e.diagnostics().iter().map(|d| d.to_string()).collect())
    }

    fn text(schema: Value) -> String {
        extract_with(schema, &Config::default()).unwrap()
    }

    #[test]
    fn test_exclude_fields_escapes_names() {
        let decls = vec![
            Decl::Field(Field::new(Label::name("a.b"), Expr::top())),
            Decl::Field(Field::new(Label::name("c"), Expr::top())),
            Decl::Ellipsis,
        ];
        assert_eq!(exclude_fields(&decls)[0].to_string(), "!~\"^(a\\\\.b|c)$\"");
        assert!(exclude_fields(&[Decl::Ellipsis]).is_empty());
    }

    #[test]
    fn test_properties_and_required() {
        let out = text(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "The name."},
                "age": {"type": "integer"}
            },
            "required": ["name", "id"]
        }));
        assert_eq!(
            out,
            "// The name.\nname!: string\nage?: int\nid!: _\n...\n"
        );
    }

    #[test]
    fn test_duplicate_required_field() {
        let errs = extract_with(json!({"required": ["a", "a"]}), &Config::default()).unwrap_err();
        assert_eq!(errs, vec!["#/required/1: duplicate required field \"a\""]);
    }

    #[test]
    fn test_deprecated_property() {
        let out = text(json!({"type": "object", "properties": {"old": {"deprecated": true}}}));
        assert_eq!(out, "old?: _ @deprecated()\n...\n");
    }

    #[test]
    fn test_closed_object() {
        let out = text(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false
        }));
        assert_eq!(out, "close({\n\ta?: string\n})\n");
    }

    #[test]
    fn test_additional_properties_schema_only() {
        let out = text(json!({"type": "object", "additionalProperties": {"type": "integer"}}));
        assert_eq!(out, "[string]: int\n");
    }

    #[test]
    fn test_additional_properties_excludes_known_fields() {
        let out = text(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "patternProperties": {"^x-": {"type": "boolean"}},
            "additionalProperties": {"type": "integer"}
        }));
        assert_eq!(
            out,
            "a?: string\n{\n\t[=~\"^x-\" & !~\"^(a)$\"]: bool\n}\n{\n\t[!~\"^x-\" & !~\"^(a)$\"]: int\n}\n"
        );
    }

    #[test]
    fn test_property_names() {
        let out = text(json!({"type": "object", "propertyNames": {"pattern": "^[a-z]+$"}}));
        assert_eq!(out, "[=~\"^[a-z]+$\"]: _\n");
    }

    #[test]
    fn test_min_properties() {
        let out = text(json!({"type": "object", "minProperties": 1}));
        assert_eq!(out, "import \"struct\"\n\nstruct.MinFields(1)\n");
    }

    #[test]
    fn test_open_only_when_explicit() {
        let cfg = Config {
            open_only_when_explicit: true,
            ..Config::default()
        };
        let out = extract_with(json!({"type": "object", "properties": {"a": {}}}), &cfg).unwrap();
        assert_eq!(out, "a?: _\n");
    }

    #[test]
    fn test_preserve_unknown_fields_false_is_rejected() {
        let cfg = Config {
            default_version: Version::KubernetesCrd,
            ..Config::default()
        };
        let errs = extract_with(json!({"x-kubernetes-preserve-unknown-fields": false}), &cfg).unwrap_err();
        assert_eq!(
            errs,
            vec!["#/x-kubernetes-preserve-unknown-fields: x-kubernetes-preserve-unknown-fields value may not be false"]
        );
    }

    #[test]
    fn test_properties_with_additional_properties_in_crd() {
        let cfg = Config {
            default_version: Version::KubernetesCrd,
            ..Config::default()
        };
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": {"type": "string"}
        });
        let errs = extract_with(schema, &cfg).unwrap_err();
        assert_eq!(
            errs,
            vec!["#: additionalProperties may not be combined with properties in Kubernetes CRD"]
        );
    }
}
