//! `allOf`, `anyOf`, `oneOf`, `not` and `if`/`then`/`else`.
//!
//! Combinators become `matchN(n, [...])` and `matchIf(if, then, else)`
//! calls. Member schemas are decoded with the types still allowed by their
//! parent, so the parent can narrow its own type set from theirs.

use crate::ast::{Expr, UnaryOp};
use crate::error::ErrorKind;
use crate::kind::Kind;

use super::state::State;
use super::Node;

fn match_n(count: Expr, members: Vec<Expr>) -> Expr {
    Expr::builtin("matchN", vec![count, Expr::list(members)])
}

fn members<'a>(s: &mut State<'_, 'a>, name: &str, n: &Node<'a>) -> Vec<Node<'a>> {
    let items = s.list_items(name, n, true);
    if items.is_empty() {
        s.errf(ErrorKind::Structural, n, format!("{name} requires at least one subschema"));
    }
    items
}

pub(super) fn all_of<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let items = members(s, "allOf", n);
    let mut known = Kind::BOTTOM;
    let mut kept = Vec::with_capacity(items.len());
    for item in &items {
        let allowed = s.info.allowed_types;
        let (x, sub) = s.schema_state(item, allowed, |_| {});
        s.info.allowed_types &= sub.allowed_types;
        if sub.has_constraints {
            // Only used to avoid redundant type disjuncts, so the union is
            // what matters here.
            known |= sub.known_types;
            kept.push(x);
        }
    }
    if kept.is_empty() {
        return;
    }
    s.info.known_types &= known;
    if kept.len() == 1 {
        s.add_all(n, kept.remove(0));
        return;
    }
    let count = Expr::int(kept.len() as u64);
    s.add_all(n, match_n(count, kept));
}

pub(super) fn any_of<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let items = members(s, "anyOf", n);
    if items.is_empty() {
        return;
    }
    let mut types = Kind::BOTTOM;
    let mut known = Kind::BOTTOM;
    let mut kept = Vec::with_capacity(items.len());
    for item in &items {
        let allowed = s.info.allowed_types;
        let (x, sub) = s.schema_state(item, allowed, |_| {});
        if sub.allowed_types.is_empty() {
            continue;
        }
        types |= sub.allowed_types;
        known |= sub.known_types;
        kept.push(x);
    }
    if kept.is_empty() {
        s.info.allowed_types = Kind::BOTTOM;
        return;
    }
    s.info.allowed_types &= types;
    s.info.known_types &= known;
    if kept.len() == 1 {
        s.add_all(n, kept.remove(0));
        return;
    }
    let at_least_one = Expr::unary(UnaryOp::Ge, Expr::int(1));
    s.add_all(n, match_n(at_least_one, kept));
}

pub(super) fn one_of<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let items = members(s, "oneOf", n);
    let mut types = Kind::BOTTOM;
    let mut known = Kind::BOTTOM;
    let mut needs_constraint = false;
    let mut kept = Vec::with_capacity(items.len());
    for item in &items {
        let allowed = s.info.allowed_types;
        let (x, sub) = s.schema_state(item, allowed, |_| {});
        if sub.allowed_types.is_empty() {
            continue;
        }
        // Unconstrained members with disjoint types are exclusive already;
        // anything else needs the explicit count.
        if sub.has_constraints || types.intersects(sub.allowed_types) {
            needs_constraint = true;
        }
        types |= sub.allowed_types;
        known |= sub.known_types;
        kept.push(x);
    }
    s.info.allowed_types &= types;
    if kept.is_empty() || !needs_constraint {
        return;
    }
    s.info.known_types &= known;
    if kept.len() == 1 {
        s.add_all(n, kept.remove(0));
        return;
    }
    s.add_all(n, match_n(Expr::int(1), kept));
}

pub(super) fn not<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    let sub = s.schema(n);
    s.add_all(n, match_n(Expr::int(0), vec![sub]));
}

pub(super) fn if_<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    s.if_node = Some(n.clone());
}

pub(super) fn then<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    s.then_node = Some(n.clone());
}

pub(super) fn else_<'a>(s: &mut State<'_, 'a>, _key: &str, n: &Node<'a>) {
    s.else_node = Some(n.clone());
}

/// Combines `if`, `then` and `else` once all three have been seen. An `if`
/// without either branch has no effect.
pub(super) fn if_then_else(s: &mut State<'_, '_>) {
    let (if_node, then_node, else_node) = (s.if_node.take(), s.then_node.take(), s.else_node.take());
    let Some(if_node) = if_node else {
        return;
    };
    if then_node.is_none() && else_node.is_none() {
        return;
    }
    let allowed = s.info.allowed_types;
    let (if_expr, if_info) = s.schema_state(&if_node, allowed, |_| {});
    let then_expr = match &then_node {
        Some(t) => s.schema_state(t, allowed & if_info.allowed_types, |_| {}).0,
        None => Expr::top(),
    };
    let else_expr = match &else_node {
        Some(e) => s.schema_state(e, allowed, |_| {}).0,
        None => Expr::top(),
    };
    let at = s.node.clone();
    s.add_all(&at, Expr::builtin("matchIf", vec![if_expr, then_expr, else_expr]));
}

// ===========================================================================
// Tests
// ===========================================================================
