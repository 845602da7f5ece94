//! Array keywords.
//!
//! `prefixItems` and the array form of `items` build a list literal whose
//! tail is then set by `items` or `additionalItems`. Everything else is a
//! validator from the `list` package.

use serde_json::Value;

use crate::ast::{BinaryOp, Expr, ListLit, UnaryOp};
use crate::error::ErrorKind;
use crate::version::{Version, VersionSet};

use super::state::{CoreType, State};
use super::Node;

pub(super) fn min_items<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(count) = s.uint(n) {
        s.add(CoreType::Array, n, Expr::call("list", "MinItems", vec![Expr::int(count)]));
    }
}

pub(super) fn max_items<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(count) = s.uint(n) {
        s.add(CoreType::Array, n, Expr::call("list", "MaxItems", vec![Expr::int(count)]));
    }
}

pub(super) fn unique_items<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if s.bool_value(n) != Some(true) {
        return;
    }
    if s.info.version.is(VersionSet::K8S) {
        s.errf(ErrorKind::Version, n, "cannot set uniqueItems to true in a Kubernetes schema");
        return;
    }
    s.add(CoreType::Array, n, Expr::call("list", "UniqueItems", Vec::new()));
}

fn start_list<'a>(s: &mut State<'_, 'a>, name: &str, n: &Node<'a>, allow_empty: bool) {
    let mut elems = Vec::new();
    for item in s.list_items(name, n, allow_empty) {
        elems.push(s.schema(&item));
    }
    s.list = Some(ListLit {
        elems,
        rest: Some(Box::new(Expr::top())),
    });
    s.list_at = n.location();
}

pub(super) fn prefix_items<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    start_list(s, "prefixItems", n, false);
}

/// Sets the tail of the list in progress: `false` closes it.
fn set_rest<'a>(s: &mut State<'_, 'a>, n: &Node<'a>) {
    let rest = match n.value {
        Value::Bool(false) => None,
        _ => Some(Box::new(s.schema(n))),
    };
    if let Some(list) = &mut s.list {
        list.rest = rest;
    }
}

pub(super) fn items<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    s.has_items = true;
    match n.value {
        Value::Array(_) => {
            let version = s.info.version;
            if version.is(VersionSet::since(Version::Draft2020_12)) {
                let msg = format!(
                    r#"from version {version} onwards, the value of "items" must be an object or a boolean"#
                );
                s.errf(ErrorKind::Version, n, msg);
                return;
            }
            s.list_items_is_array = true;
            start_list(s, "items", n, true);
        }
        Value::Object(_) | Value::Bool(_) => {
            if s.list.is_some() {
                set_rest(s, n);
            } else {
                let elem = s.schema(n);
                s.add(CoreType::Array, n, Expr::open_list(Vec::new(), elem));
            }
        }
        _ => {
            let msg = format!(
                r#"value of "items" must be an object, boolean or array, found {}"#,
                n.kind_name()
            );
            s.errf(ErrorKind::Structural, n, msg);
        }
    }
}

/// Tail of an `items` array; ignored otherwise.
pub(super) fn additional_items<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    match n.value {
        Value::Object(_) | Value::Bool(_) => {
            if s.list_items_is_array {
                set_rest(s, n);
            }
        }
        _ => {
            s.errf(
                ErrorKind::Structural,
                n,
                r#"value of "additionalItems" must be an object or boolean"#,
            );
        }
    }
}

pub(super) fn min_contains<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(v) = s.uint(n) {
        s.min_contains = Some(v);
    }
}

pub(super) fn max_contains<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    if let Some(v) = s.uint(n) {
        s.max_contains = Some(v);
    }
}

pub(super) fn contains<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let elem = s.schema(n);
    let mut count = Expr::unary(UnaryOp::Ge, Expr::int(s.min_contains.unwrap_or(1)));
    if let Some(max) = s.max_contains {
        count = Expr::binary(BinaryOp::And, count, Expr::unary(UnaryOp::Le, Expr::int(max)));
    }
    s.add(CoreType::Array, n, Expr::call("list", "MatchN", vec![count, elem]));
}

// ===========================================================================
// Tests
// ===========================================================================
