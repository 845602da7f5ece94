//! Pass 1: `const` disjunctions to `enum`
//!
//! An `anyOf` whose members are all `const` is replaced by a single `enum`
//! listing the same values in the same order:
//!
//! ```text
//! anyOf(const("a"), const("b"))  ->  enum("a", "b")
//! ```
//!
//! A disjunction mixing constants with other schemas is left alone.

use crate::generate::item::{Handle, Interner, Item, Literal};

/// Replace every all-`const` `anyOf` reachable from `item` with an `enum`.
pub fn enum_from_const(item: &Handle, interner: &mut Interner) -> Handle {
    if let Item::AnyOf(elems) = item.item() {
        let values: Option<Vec<Literal>> = elems
            .iter()
            .map(|e| match e.item() {
                Item::Const(v) => Some(v.clone()),
                _ => None,
            })
            .collect();
        if let Some(values) = values.filter(|v| !v.is_empty()) {
            return interner.intern(Item::Enum(values));
        }
    }
    item.map_children(interner, enum_from_const)
}

// ===========================================================================
// Tests
// ===========================================================================
