//! Numeric bounds and `multipleOf`.

use serde_json::Value;

use crate::ast::{Expr, UnaryOp};
use crate::error::ErrorKind;
use crate::version::{Version, VersionSet};

use super::state::{CoreType, State};
use super::Node;

/// Versions where `exclusiveMinimum`/`exclusiveMaximum` are booleans
/// modifying `minimum`/`maximum`.
fn boolean_exclusive(v: Version) -> bool {
    v.is(VersionSet::only(Version::Draft4) | VersionSet::OPEN_API_LIKE)
}

fn bound<'a>(s: &mut State<'_, 'a>, n: &Node<'a>, op: UnaryOp) {
    if let Some(num) = s.number(n) {
        s.add(CoreType::Number, n, Expr::unary(op, Expr::number(num)));
    }
}

pub(super) fn minimum<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let op = if s.exclusive_min { UnaryOp::Gt } else { UnaryOp::Ge };
    bound(s, n, op);
}

pub(super) fn maximum<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let op = if s.exclusive_max { UnaryOp::Lt } else { UnaryOp::Le };
    bound(s, n, op);
}

/// Either form of `exclusiveMinimum`/`exclusiveMaximum`. The form that does
/// not belong to the schema's version is reported under strict keywords,
/// and honored otherwise.
fn exclusive<'a>(s: &mut State<'_, 'a>, key: &str, n: &Node<'a>, op: UnaryOp) -> Option<bool> {
    let version = s.info.version;
    match n.value {
        Value::Bool(b) => {
            if !boolean_exclusive(version) {
                let msg = format!("boolean value for {key:?} is not supported in JSON schema version {version}");
                s.warn_unrecognized(key, n, msg);
            }
            Some(*b)
        }
        Value::Number(_) => {
            if boolean_exclusive(version) {
                let msg = format!("numeric value for {key:?} is not supported in JSON schema version {version}");
                s.warn_unrecognized(key, n, msg);
            }
            bound(s, n, op);
            None
        }
        _ => {
            let msg = format!("value of {key:?} must be a number or boolean, found {}", n.kind_name());
            s.errf(ErrorKind::Structural, n, msg);
            None
        }
    }
}

pub(super) fn exclusive_minimum<'a>(s: &mut State<'_, 'a>, key: &str, n: &Node<'a>) {
    if let Some(b) = exclusive(s, key, n, UnaryOp::Gt) {
        s.exclusive_min = b;
    }
}

pub(super) fn exclusive_maximum<'a>(s: &mut State<'_, 'a>, key: &str, n: &Node<'a>) {
    if let Some(b) = exclusive(s, key, n, UnaryOp::Lt) {
        s.exclusive_max = b;
    }
}

pub(super) fn multiple_of<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let Some(num) = s.number(n) else {
        return;
    };
    if num.as_f64().is_some_and(|f| f <= 0.0) {
        let msg = format!(r#""multipleOf" value must be > 0; found {num}"#);
        s.errf(ErrorKind::Structural, n, msg);
        return;
    }
    s.add(CoreType::Number, n, Expr::call("math", "MultipleOf", vec![Expr::number(num)]));
}

// ===========================================================================
// Tests
// ===========================================================================
