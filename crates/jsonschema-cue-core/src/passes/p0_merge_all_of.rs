//! Pass 0: `allOf` flattening
//!
//! Nested `allOf` items are hoisted into their parent, so each conjunction
//! is a single flat list. Members that are identical to an earlier member
//! are dropped, and a conjunction left with one member is replaced by that
//! member. Applied recursively through every item.
//!
//! `type` members of one conjunction are unified into the first of them:
//!
//! ```text
//! allOf(type(number), minimum(0), type(integer))  ->  allOf(type(integer), minimum(0))
//! ```

use crate::generate::item::{Handle, Interner, Item};
use crate::kind::Kind;

/// Flatten and deduplicate every `allOf` reachable from `item`.
pub fn merge_all_of(item: &Handle, interner: &mut Interner) -> Handle {
    if !matches!(item.item(), Item::AllOf(_)) {
        return item.map_children(interner, merge_all_of);
    }

    let mut elems: Vec<Handle> = Vec::new();
    let mut flat = Vec::new();
    conjuncts(item, &mut flat);
    let mut types: Option<(usize, Kind)> = None;
    for elem in flat {
        if let Item::Type(kind) = elem.item() {
            let kind = json_kind(*kind);
            match &mut types {
                Some((_, acc)) => *acc &= kind,
                None => {
                    types = Some((elems.len(), kind));
                    elems.push(elem);
                }
            }
            continue;
        }
        // Children are merged before deduplication so that members which
        // only become equal after merging collapse in the same pass.
        let elem = elem.map_children(interner, merge_all_of);
        if !elems.contains(&elem) {
            elems.push(elem);
        }
    }
    if let Some((i, kind)) = types {
        elems[i] = if kind.is_empty() {
            interner.intern(Item::False)
        } else {
            interner.intern(Item::Type(kind))
        };
    }
    match elems.len() {
        0 => interner.intern(Item::True),
        1 => elems.swap_remove(0),
        _ => interner.intern(Item::AllOf(elems)),
    }
}

/// The kinds accepted by the JSON Schema rendering of `kind`: a float
/// renders as `number`, which admits integers too.
fn json_kind(kind: Kind) -> Kind {
    if kind.intersects(Kind::FLOAT) {
        kind | Kind::NUMBER
    } else {
        kind
    }
}

/// The non-`allOf` leaves of a nest of `allOf` items, in order.
fn conjuncts(item: &Handle, out: &mut Vec<Handle>) {
    match item.item() {
        Item::AllOf(elems) => {
            for elem in elems {
                conjuncts(elem, out);
            }
        }
        _ => out.push(item.clone()),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::item::{BoundOp, Properties};
    use crate::generate::render::render;
    use crate::kind::Kind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ty(u: &mut Interner, kind: Kind) -> Handle {
        u.intern(Item::Type(kind))
    }

    #[test]
    fn test_flattens_nested_all_of() {
        let mut u = Interner::new();
        let s = ty(&mut u, Kind::STRING);
        let p = u.intern(Item::Pattern("^a".into()));
        let f = u.intern(Item::Format("date".into()));
        let inner = u.intern(Item::AllOf(vec![s.clone(), p.clone()]));
        let outer = u.intern(Item::AllOf(vec![inner, f.clone()]));

        let merged = merge_all_of(&outer, &mut u);
        assert_eq!(merged, u.intern(Item::AllOf(vec![s, p, f])));
    }

    #[test]
    fn test_drops_duplicates_and_unwraps_single_member() {
        let mut u = Interner::new();
        let s = ty(&mut u, Kind::STRING);
        let inner = u.intern(Item::AllOf(vec![s.clone(), s.clone()]));
        let outer = u.intern(Item::AllOf(vec![s.clone(), inner]));
        assert_eq!(merge_all_of(&outer, &mut u), s);
    }

    #[test]
    fn test_merges_inside_other_items() {
        let mut u = Interner::new();
        let n = ty(&mut u, Kind::NUMBER);
        let min = u.intern(Item::Bounds {
            op: BoundOp::Ge,
            n: 0.into(),
        });
        let a = u.intern(Item::AllOf(vec![n.clone(), min.clone()]));
        let b = u.intern(Item::AllOf(vec![a.clone(), n.clone()]));
        let props = u.intern(Item::Properties(Properties {
            properties: [("x".to_string(), b)].into(),
            ..Properties::default()
        }));

        let merged = merge_all_of(&props, &mut u);
        assert_eq!(
            render(&merged),
            json!({"properties": {"x": {"type": "number", "minimum": 0}}})
        );
    }

    #[test]
    fn test_members_equal_after_merging_collapse() {
        let mut u = Interner::new();
        let s = ty(&mut u, Kind::STRING);
        let wrapped = u.intern(Item::AllOf(vec![s.clone()]));
        let not_wrapped = u.intern(Item::Not(wrapped));
        let not_plain = u.intern(Item::Not(s));
        let all = u.intern(Item::AllOf(vec![not_wrapped, not_plain.clone()]));
        assert_eq!(merge_all_of(&all, &mut u), not_plain);
    }

    #[test]
    fn test_unifies_types() {
        let mut u = Interner::new();
        let n = ty(&mut u, Kind::NUMBER);
        let i = ty(&mut u, Kind::INT | Kind::STRING);
        let min = u.intern(Item::Bounds {
            op: BoundOp::Ge,
            n: 0.into(),
        });
        let all = u.intern(Item::AllOf(vec![n, min, i]));
        let merged = merge_all_of(&all, &mut u);
        assert_eq!(render(&merged), json!({"type": "integer", "minimum": 0}));
    }

    #[test]
    fn test_disjoint_types_are_unsatisfiable() {
        let mut u = Interner::new();
        let s = ty(&mut u, Kind::STRING);
        let b = ty(&mut u, Kind::BOOL);
        let all = u.intern(Item::AllOf(vec![s, b]));
        assert_eq!(render(&merge_all_of(&all, &mut u)), json!(false));
    }

    #[test]
    fn test_empty_all_of_is_true() {
        let mut u = Interner::new();
        let empty = u.intern(Item::AllOf(Vec::new()));
        assert_eq!(*merge_all_of(&empty, &mut u).item(), Item::True);
    }

    #[test]
    fn test_idempotent() {
        let mut u = Interner::new();
        let s = ty(&mut u, Kind::STRING);
        let n = ty(&mut u, Kind::NUMBER);
        let p = u.intern(Item::Pattern("x".into()));
        let inner = u.intern(Item::AllOf(vec![s.clone(), p]));
        let any = u.intern(Item::AnyOf(vec![inner.clone(), n]));
        let outer = u.intern(Item::AllOf(vec![inner, any, s]));

        let once = merge_all_of(&outer, &mut u);
        let twice = merge_all_of(&once, &mut u);
        assert_eq!(once, twice);
    }
}
