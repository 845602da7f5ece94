//! IR rewrite passes.
//!
//! Each pass is a self-contained transformation over generator items.
//! Passes run in order (0-1) after the IR is built and before it is
//! rendered. Each is idempotent.

pub mod p0_merge_all_of;
pub mod p1_enum_from_const;

use crate::generate::item::{Handle, Interner};

/// Run every pass over `item`.
pub fn run_all(item: &Handle, interner: &mut Interner) -> Handle {
    let item = p0_merge_all_of::merge_all_of(item, interner);
    let item = p1_enum_from_const::enum_from_const(&item, interner);
    tracing::debug!(interned = interner.len(), "rewrite passes complete");
    item
}
