//! Generator IR.
//!
//! Every JSON Schema construct the generator can emit is an [`Item`]. Items
//! are immutable once built and are hash-consed by an [`Interner`], so two
//! structurally equal items built by the same interner share one [`Handle`]
//! and compare by pointer.

use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

use serde_json::{Number, Value};

use crate::kind::Kind;

/// Numeric bound operator, in unary position (`>=10`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl BoundOp {
    pub fn keyword(self) -> &'static str {
        match self {
            BoundOp::Lt => "exclusiveMaximum",
            BoundOp::Le => "maximum",
            BoundOp::Gt => "exclusiveMinimum",
            BoundOp::Ge => "minimum",
        }
    }
}

/// Which end of a count a `*Bounds` item limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Min,
    Max,
}

impl Limit {
    pub fn pick(self, min: &'static str, max: &'static str) -> &'static str {
        match self {
            Limit::Min => min,
            Limit::Max => max,
        }
    }
}

/// A JSON value used by `const` and `enum`.
///
/// Hashing ignores object key order so that it agrees with equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal(pub Value);

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_json(&self.0, state);
    }
}

fn hash_json<H: Hasher>(v: &Value, state: &mut H) {
    std::mem::discriminant(v).hash(state);
    match v {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Number(n) => n.hash(state),
        Value::String(s) => s.hash(state),
        Value::Array(xs) => {
            xs.len().hash(state);
            for x in xs {
                hash_json(x, state);
            }
        }
        Value::Object(m) => {
            let mut entries: Vec<_> = m.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries.len().hash(state);
            for (k, x) in entries {
                k.hash(state);
                hash_json(x, state);
            }
        }
    }
}

/// `properties` and the keywords that interact with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Properties {
    pub properties: BTreeMap<String, Handle>,
    pub pattern_properties: BTreeMap<String, Handle>,
    pub additional: Option<Handle>,
    pub required: Vec<String>,
}

impl Properties {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.pattern_properties.is_empty()
            && self.additional.is_none()
            && self.required.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Item {
    True,
    False,
    Type(Kind),
    Bounds { op: BoundOp, n: Number },
    MultipleOf(Number),
    LengthBounds { limit: Limit, n: u64 },
    ItemsBounds { limit: Limit, n: u64 },
    PropertyBounds { limit: Limit, n: u64 },
    Pattern(String),
    Format(String),
    Const(Literal),
    Enum(Vec<Literal>),
    AllOf(Vec<Handle>),
    AnyOf(Vec<Handle>),
    OneOf(Vec<Handle>),
    Not(Handle),
    /// Reference to an entry of `$defs`, by name.
    Ref(String),
    Properties(Properties),
    Items {
        prefix: Vec<Handle>,
        rest: Option<Handle>,
    },
    Contains {
        elem: Handle,
        min: Option<u64>,
        max: Option<u64>,
    },
    IfThenElse {
        cond: Handle,
        then: Option<Handle>,
        otherwise: Option<Handle>,
    },
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// A shared, interned item. Equality and hashing are by identity.
#[derive(Debug, Clone)]
pub struct Handle(Rc<Item>);

impl Handle {
    pub fn item(&self) -> &Item {
        &self.0
    }

    /// Applies `f` to each direct child of the item and returns the
    /// rebuilt item, or `self` when every child came back unchanged.
    /// `f` is not applied to the item itself.
    pub fn map_children<F>(&self, interner: &mut Interner, mut f: F) -> Handle
    where
        F: FnMut(&Handle, &mut Interner) -> Handle,
    {
        let f: &mut MapFn<'_> = &mut f;
        let rebuilt = match self.item() {
            Item::AllOf(xs) => map_elems(xs, interner, f).map(Item::AllOf),
            Item::AnyOf(xs) => map_elems(xs, interner, f).map(Item::AnyOf),
            Item::OneOf(xs) => map_elems(xs, interner, f).map(Item::OneOf),
            Item::Not(x) => map_one(x, interner, f).map(Item::Not),
            Item::Properties(p) => {
                let properties = map_map(&p.properties, interner, f);
                let pattern_properties = map_map(&p.pattern_properties, interner, f);
                let additional = map_opt(&p.additional, interner, f);
                if properties.is_none() && pattern_properties.is_none() && additional.is_none() {
                    None
                } else {
                    Some(Item::Properties(Properties {
                        properties: properties.unwrap_or_else(|| p.properties.clone()),
                        pattern_properties: pattern_properties
                            .unwrap_or_else(|| p.pattern_properties.clone()),
                        additional: additional.unwrap_or_else(|| p.additional.clone()),
                        required: p.required.clone(),
                    }))
                }
            }
            Item::Items { prefix, rest } => {
                let new_prefix = map_elems(prefix, interner, f);
                let new_rest = map_opt(rest, interner, f);
                if new_prefix.is_none() && new_rest.is_none() {
                    None
                } else {
                    Some(Item::Items {
                        prefix: new_prefix.unwrap_or_else(|| prefix.clone()),
                        rest: new_rest.unwrap_or_else(|| rest.clone()),
                    })
                }
            }
            Item::Contains { elem, min, max } => map_one(elem, interner, f).map(|elem| Item::Contains {
                elem,
                min: *min,
                max: *max,
            }),
            Item::IfThenElse {
                cond,
                then,
                otherwise,
            } => {
                let new_cond = map_one(cond, interner, f);
                let new_then = map_opt(then, interner, f);
                let new_otherwise = map_opt(otherwise, interner, f);
                if new_cond.is_none() && new_then.is_none() && new_otherwise.is_none() {
                    None
                } else {
                    Some(Item::IfThenElse {
                        cond: new_cond.unwrap_or_else(|| cond.clone()),
                        then: new_then.unwrap_or_else(|| then.clone()),
                        otherwise: new_otherwise.unwrap_or_else(|| otherwise.clone()),
                    })
                }
            }
            Item::True
            | Item::False
            | Item::Type(_)
            | Item::Bounds { .. }
            | Item::MultipleOf(_)
            | Item::LengthBounds { .. }
            | Item::ItemsBounds { .. }
            | Item::PropertyBounds { .. }
            | Item::Pattern(_)
            | Item::Format(_)
            | Item::Const(_)
            | Item::Enum(_)
            | Item::Ref(_) => None,
        };
        match rebuilt {
            Some(item) => interner.intern(item),
            None => self.clone(),
        }
    }
}

impl Deref for Handle {
    type Target = Item;

    fn deref(&self) -> &Item {
        &self.0
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

type MapFn<'f> = dyn FnMut(&Handle, &mut Interner) -> Handle + 'f;

fn map_one(x: &Handle, interner: &mut Interner, f: &mut MapFn<'_>) -> Option<Handle> {
    let y = f(x, interner);
    (y != *x).then_some(y)
}

fn map_opt(x: &Option<Handle>, interner: &mut Interner, f: &mut MapFn<'_>) -> Option<Option<Handle>> {
    let x = x.as_ref()?;
    map_one(x, interner, f).map(Some)
}

fn map_elems(xs: &[Handle], interner: &mut Interner, f: &mut MapFn<'_>) -> Option<Vec<Handle>> {
    let ys: Vec<Handle> = xs.iter().map(|x| f(x, interner)).collect();
    (ys.as_slice() != xs).then_some(ys)
}

fn map_map(
    m: &BTreeMap<String, Handle>,
    interner: &mut Interner,
    f: &mut MapFn<'_>,
) -> Option<BTreeMap<String, Handle>> {
    let mut changed = false;
    let mut out = BTreeMap::new();
    for (k, x) in m {
        let y = f(x, interner);
        changed |= y != *x;
        out.insert(k.clone(), y);
    }
    changed.then_some(out)
}

// ---------------------------------------------------------------------------
// Interner
// ---------------------------------------------------------------------------

/// Hash-consing store for items. One interner is owned by one generation
/// run; handles from different interners must not be mixed.
#[derive(Debug, Default)]
pub struct Interner {
    items: HashSet<Rc<Item>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The unique handle for `item`.
    pub fn intern(&mut self, item: Item) -> Handle {
        if let Some(existing) = self.items.get(&item) {
            return Handle(Rc::clone(existing));
        }
        let rc = Rc::new(item);
        self.items.insert(Rc::clone(&rc));
        Handle(rc)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_interning_collapses_equal_items() {
        let mut u = Interner::new();
        let a = u.intern(Item::Type(Kind::STRING));
        let b = u.intern(Item::Type(Kind::STRING));
        let c = u.intern(Item::Type(Kind::INT));
        assert_eq!(a, b);
        assert_ne!(a, c);

        let x = u.intern(Item::AllOf(vec![a.clone(), c.clone()]));
        let y = u.intern(Item::AllOf(vec![b, c]));
        assert_eq!(x, y);
        assert_eq!(u.len(), 3);
    }

    #[test]
    fn test_literal_hash_ignores_key_order() {
        let mut u = Interner::new();
        let a = u.intern(Item::Const(Literal(json!({"a": 1, "b": 2}))));
        let b = u.intern(Item::Const(Literal(json!({"b": 2, "a": 1}))));
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_children_keeps_unchanged_handle() {
        let mut u = Interner::new();
        let s = u.intern(Item::Type(Kind::STRING));
        let not = u.intern(Item::Not(s));
        let same = not.map_children(&mut u, |h, _| h.clone());
        assert_eq!(same, not);
    }

    #[test]
    fn test_map_children_rebuilds_changed_item() {
        let mut u = Interner::new();
        let s = u.intern(Item::Type(Kind::STRING));
        let n = u.intern(Item::Type(Kind::NUMBER));
        let items = u.intern(Item::Items {
            prefix: vec![s.clone()],
            rest: Some(s.clone()),
        });
        let swapped = items.map_children(&mut u, |h, u| {
            if *h == s {
                u.intern(Item::Type(Kind::NUMBER))
            } else {
                h.clone()
            }
        });
        let expected = u.intern(Item::Items {
            prefix: vec![n.clone()],
            rest: Some(n),
        });
        assert_eq!(swapped, expected);
    }

    #[test]
    fn test_map_children_does_not_visit_self() {
        let mut u = Interner::new();
        let t = u.intern(Item::True);
        let mut visited = 0;
        let out = t.map_children(&mut u, |h, _| {
            visited += 1;
            h.clone()
        });
        assert_eq!(visited, 0);
        assert_eq!(out, t);
    }
}
