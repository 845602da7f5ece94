//! Rendering IR to JSON.
//!
//! A schema is either a boolean or an object. `allOf` is rendered by merging
//! the keyword sets of its members into one object where that cannot change
//! the meaning: a keyword already present, or one that interacts with a
//! keyword already present, keeps its member in a separate `allOf` entry.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use super::item::{Handle, Item};
use crate::pointer::escape_segment;

/// Keywords whose meaning depends on their siblings in the same object.
const KEYWORD_GROUPS: &[&[&str]] = &[
    &["properties", "patternProperties", "additionalProperties"],
    &["contains", "maxContains", "minContains"],
    &["items", "additionalItems", "prefixItems"],
    &["if", "then", "else"],
];

/// Priority given to keywords not listed in [`label_priorities`].
const DEFAULT_PRIORITY: usize = 1000;

/// Keyword to the group it interacts with, itself included.
fn keyword_interactions() -> &'static HashMap<&'static str, &'static [&'static str]> {
    static INTERACTIONS: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    INTERACTIONS.get_or_init(|| {
        KEYWORD_GROUPS
            .iter()
            .flat_map(|group| group.iter().map(move |k| (*k, *group)))
            .collect()
    })
}

/// `$schema`, `$defs` and `type` first, then each interaction group
/// together, then everything else.
fn label_priorities() -> &'static HashMap<&'static str, usize> {
    static PRIORITIES: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();
    PRIORITIES.get_or_init(|| {
        let mut m = HashMap::from([("$schema", 0), ("$defs", 1), ("type", 2)]);
        let n = m.len();
        for (i, group) in KEYWORD_GROUPS.iter().enumerate() {
            for name in group.iter() {
                m.insert(*name, n + i + 1);
            }
        }
        m
    })
}

fn priority(label: &str) -> usize {
    label_priorities()
        .get(label)
        .copied()
        .unwrap_or(DEFAULT_PRIORITY)
}

pub(crate) fn compare_keywords(a: &str, b: &str) -> Ordering {
    priority(a).cmp(&priority(b)).then_with(|| a.cmp(b))
}

/// A schema object with its keywords in conventional order.
pub(crate) fn schema_object(mut fields: Vec<(String, Value)>) -> Value {
    fields.sort_by(|a, b| compare_keywords(&a.0, &b.0));
    Value::Object(fields.into_iter().collect())
}

fn keyword(name: &str, value: impl Into<Value>) -> Value {
    schema_object(vec![(name.to_string(), value.into())])
}

fn render_list(items: &[Handle]) -> Value {
    Value::Array(items.iter().map(render).collect())
}

/// JSON Schema for `item`.
pub fn render(item: &Handle) -> Value {
    match item.item() {
        Item::True => Value::Bool(true),
        Item::False => Value::Bool(false),
        Item::Type(kind) => match kind.json_schema_types().as_slice() {
            [t] => keyword("type", *t),
            types => keyword("type", types.to_vec()),
        },
        Item::Bounds { op, n } => keyword(op.keyword(), n.clone()),
        Item::MultipleOf(n) => keyword("multipleOf", n.clone()),
        Item::LengthBounds { limit, n } => keyword(limit.pick("minLength", "maxLength"), *n),
        Item::ItemsBounds { limit, n } => keyword(limit.pick("minItems", "maxItems"), *n),
        Item::PropertyBounds { limit, n } => {
            keyword(limit.pick("minProperties", "maxProperties"), *n)
        }
        Item::Pattern(re) => keyword("pattern", re.as_str()),
        Item::Format(name) => keyword("format", name.as_str()),
        Item::Const(lit) => keyword("const", lit.0.clone()),
        Item::Enum(values) => keyword(
            "enum",
            Value::Array(values.iter().map(|v| v.0.clone()).collect()),
        ),
        Item::AllOf(elems) => render_all_of(elems),
        Item::AnyOf(elems) => keyword("anyOf", render_list(elems)),
        Item::OneOf(elems) => keyword("oneOf", render_list(elems)),
        Item::Not(elem) => keyword("not", render(elem)),
        Item::Ref(name) => keyword("$ref", format!("#/$defs/{}", escape_segment(name))),
        Item::Properties(p) => {
            let mut fields = Vec::new();
            if !p.properties.is_empty() {
                let props: Map<String, Value> = p
                    .properties
                    .iter()
                    .map(|(name, it)| (name.clone(), render(it)))
                    .collect();
                fields.push(("properties".to_string(), Value::Object(props)));
            }
            if !p.required.is_empty() {
                fields.push(("required".to_string(), p.required.clone().into()));
            }
            if let Some(additional) = &p.additional {
                fields.push(("additionalProperties".to_string(), render(additional)));
            }
            if !p.pattern_properties.is_empty() {
                let patterns: Map<String, Value> = p
                    .pattern_properties
                    .iter()
                    .map(|(re, it)| (re.clone(), render(it)))
                    .collect();
                fields.push(("patternProperties".to_string(), Value::Object(patterns)));
            }
            schema_object(fields)
        }
        Item::Items { prefix, rest } => {
            let mut fields = Vec::new();
            if !prefix.is_empty() {
                fields.push(("prefixItems".to_string(), render_list(prefix)));
            }
            if let Some(rest) = rest {
                fields.push(("items".to_string(), render(rest)));
            }
            schema_object(fields)
        }
        Item::Contains { elem, min, max } => {
            let mut fields = vec![("contains".to_string(), render(elem))];
            if let Some(min) = min {
                fields.push(("minContains".to_string(), (*min).into()));
            }
            if let Some(max) = max {
                fields.push(("maxContains".to_string(), (*max).into()));
            }
            schema_object(fields)
        }
        Item::IfThenElse {
            cond,
            then,
            otherwise,
        } => {
            let mut fields = vec![("if".to_string(), render(cond))];
            if let Some(then) = then {
                fields.push(("then".to_string(), render(then)));
            }
            if let Some(otherwise) = otherwise {
                fields.push(("else".to_string(), render(otherwise)));
            }
            schema_object(fields)
        }
    }
}

/// A single schema object is already a conjunction of its keywords, so
/// members of an `allOf` are folded into one object unless they would
/// collide with, or interact with, a keyword that is already there.
fn render_all_of(elems: &[Handle]) -> Value {
    let mut unmerged = Vec::new();
    let mut merged: Vec<(String, Value)> = Vec::new();

    for elem in elems {
        let obj = match render(elem) {
            Value::Bool(true) => continue,
            Value::Bool(false) => return Value::Bool(false),
            Value::Object(obj) => obj,
            other => {
                unmerged.push(other);
                continue;
            }
        };
        let conflicts = obj.keys().any(|name| {
            let group = keyword_interactions()
                .get(name.as_str())
                .copied()
                .unwrap_or(&[]);
            merged
                .iter()
                .any(|(m, _)| m == name || group.contains(&m.as_str()))
        });
        if conflicts {
            unmerged.push(Value::Object(obj));
        } else {
            merged.extend(obj);
        }
    }

    if unmerged.is_empty() {
        return schema_object(merged);
    }
    if !merged.is_empty() {
        unmerged.push(schema_object(merged));
    }
    keyword("allOf", unmerged)
}

// ===========================================================================
// Tests
// ===========================================================================
