//! Keywords that apply to every schema: identification, documentation,
//! literal values and `type`.

use serde_json::Value;

use crate::ast::{BinaryOp, Expr};
use crate::error::ErrorKind;
use crate::kind::Kind;
use crate::version::{Version, VersionSet};

use super::state::{CoreType, State};
use super::Node;

/// Keywords that are understood but have no effect on the output.
pub(super) fn noop<'a>(_s: &mut State<'_, 'a>, _key: &str, _n: &Node<'a>) {}

pub(super) fn not_implemented<'a>(s: &mut State<'_, 'a>, key: &str, n: &Node<'a>) {
    if s.d.cfg.strict_features {
        s.errf(ErrorKind::Feature, n, format!("keyword {key:?} not yet implemented"));
    } else {
        tracing::debug!(keyword = key, location = %n.location(), "ignoring unimplemented keyword");
    }
}

// ---------------------------------------------------------------------------
// Identification
// ---------------------------------------------------------------------------

pub(super) fn definitions<'a>(s: &mut State<'_, 'a>, key: &str, n: &Node<'a>) {
    if !n.value.is_object() {
        let msg = format!("{key:?} expected an object, found {}", n.kind_name());
        s.errf(ErrorKind::Structural, n, msg);
        return;
    }
    add_definitions(s, n);
}

/// Decodes every member of `n` as a schema that needs a definition.
pub(super) fn add_definitions<'a>(s: &mut State<'_, 'a>, n: &Node<'a>) {
    for (_, child) in n.entries() {
        s.d.ensure_definition(&child.tokens);
        s.schema(&child);
    }
}

/// `$id`, or `id` in draft 4.
pub(super) fn id<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let Some(mut u) = s.resolve_uri(n) else {
        return;
    };
    if u.fragment().is_some_and(|f| !f.is_empty()) {
        // Older drafts used `$id: "#name"` for anchors.
        if s.d.cfg.strict_features && s.info.version.is(VersionSet::since(Version::Draft2019_09)) {
            s.errf(ErrorKind::Structural, n, "$id URI may not contain a fragment");
        }
        return;
    }
    u.set_fragment(None);
    s.base = u.clone();
    s.info.id = Some(u);
}

pub(super) fn reference<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let Some(u) = s.resolve_uri(n) else {
        return;
    };
    let expr = s.make_ref(n, &u);
    s.add_all(n, expr);
}

pub(super) fn schema_uri<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let version = s.info.version;
    if !s.is_root && !version.is(VersionSet::since(Version::Draft2019_09)) {
        let msg = format!("$schema can only appear at the root in JSON Schema version {version}");
        s.errf(ErrorKind::Version, n, msg);
        return;
    }
    let Some(uri) = s.str_value(n) else {
        return;
    };
    match Version::parse_schema_uri(uri) {
        Some(v) => {
            s.info.version = v;
            s.info.version_present = true;
        }
        None => {
            let msg = format!("invalid $schema URL {uri:?}: unknown schema version");
            s.errf(ErrorKind::Version, n, msg);
        }
    }
}

// ---------------------------------------------------------------------------
// Documentation
// ---------------------------------------------------------------------------

pub(super) fn title<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(t) = s.str_value(n) {
        s.info.title = t.to_string();
    }
}

pub(super) fn description<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(d) = s.str_value(n) {
        s.info.description = d.to_string();
    }
}

pub(super) fn deprecated<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if s.bool_value(n) == Some(true) {
        s.info.deprecated = true;
    }
}

pub(super) fn examples<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if !n.value.is_array() {
        let msg = format!(r#"value of "examples" must be an array, found {}"#, n.kind_name());
        s.errf(ErrorKind::Structural, n, msg);
    }
}

// ---------------------------------------------------------------------------
// Values and types
// ---------------------------------------------------------------------------

pub(super) fn constant<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let kind = Kind::of_json(n.value);
    let expr = s.const_value(n);
    s.add_all(n, expr);
    s.info.allowed_types &= kind;
    s.info.known_types &= kind;
}

pub(super) fn enumeration<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let mut values = Vec::new();
    let mut types = Kind::BOTTOM;
    for item in s.list_items("enum", n, true) {
        let kind = Kind::of_json(item.value);
        if !s.info.allowed_types.intersects(kind) {
            // Cannot match anyway.
            continue;
        }
        values.push(s.const_value(&item));
        types |= kind;
    }
    s.info.known_types &= types;
    s.info.allowed_types &= types;
    if let Some(expr) = Expr::or_all(values) {
        s.add_all(n, expr);
    }
}

pub(super) fn type_<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let names = match n.value {
        Value::String(_) => vec![n.clone()],
        Value::Array(_) => n.elements(),
        _ => {
            let msg = format!(
                r#"value of "type" must be a string or list of strings, found {}"#,
                n.kind_name()
            );
            s.errf(ErrorKind::Structural, n, msg);
            return;
        }
    };

    let mut types = Kind::BOTTOM;
    for name_node in &names {
        let Value::String(name) = name_node.value else {
            s.errf(ErrorKind::Structural, name_node, "type value should be a string");
            continue;
        };
        match name.as_str() {
            "null" => types |= Kind::NULL,
            "boolean" => types |= Kind::BOOL,
            "string" => types |= Kind::STRING,
            "number" => types |= Kind::NUMBER,
            "integer" => {
                types |= Kind::INT;
                s.add(CoreType::Number, name_node, Expr::ident("int"));
            }
            "array" => {
                types |= Kind::LIST;
                s.is_array = true;
            }
            "object" => types |= Kind::STRUCT,
            other => {
                s.errf(ErrorKind::Structural, name_node, format!("unknown type {other:?}"));
            }
        }
    }
    s.info.allowed_types &= types;
}

/// OpenAPI `nullable: true`.
pub(super) fn nullable<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if s.bool_value(n) == Some(true) {
        s.nullable = true;
    }
}

/// `x-kubernetes-int-or-string: true`.
pub(super) fn int_or_string<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if s.bool_value(n) != Some(true) {
        return;
    }
    let types = Kind::INT | Kind::STRING;
    s.info.allowed_types &= types;
    s.info.known_types &= types;
    s.add_all(
        n,
        Expr::binary(BinaryOp::Or, Expr::ident("int"), Expr::ident("string")),
    );
}

// ===========================================================================
// Tests
// ===========================================================================
