//! Proptest generators for property-based testing.

use proptest::prelude::*;

use keel_store::Label;

/// Generate a Label.
pub fn label() -> impl Strategy<Value = Label> {
    prop::sample::select(Label::ALL.to_vec())
}

/// Generate a migration name.
pub fn migration_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,23}".prop_map(String::from)
}

/// Generate a catalog of 1..=`max` unique migration names, in catalog order.
pub fn catalog(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(migration_name(), 1..=max.max(1))
        .prop_map(|names| names.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

/// A catalog plus the index of the migration that fails on the first run.
pub fn catalog_with_failure(max: usize) -> impl Strategy<Value = (Vec<String>, usize)> {
    catalog(max).prop_flat_map(|names| {
        let len = names.len();
        (Just(names), 0..len)
    })
}

/// Generate a block number.
pub fn block_number() -> impl Strategy<Value = u64> {
    any::<u64>()
}
