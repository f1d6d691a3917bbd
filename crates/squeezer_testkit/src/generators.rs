//! Property-based test generators using proptest.
//!
//! Provides strategies for generating entity names, attribute maps and
//! upload geometries.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating valid entity names.
pub fn entity_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,23}").expect("Invalid regex")
}

/// Strategy for generating flat attribute values.
pub fn attribute_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<u32>().prop_map(Value::from),
        prop::string::string_regex("[ -~]{0,16}")
            .expect("Invalid regex")
            .prop_map(Value::from),
    ]
}

/// Strategy for generating attribute maps with up to `max` fields.
///
/// Field names never collide with `name` or `pulp_href`.
pub fn attributes_strategy(max: usize) -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        prop::string::string_regex("attr_[a-z]{1,8}").expect("Invalid regex"),
        attribute_value_strategy(),
        0..=max,
    )
    .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for generating `(payload size, chunk size)` pairs.
///
/// Sizes stay small enough to upload in memory, and the chunk size may
/// exceed the payload.
pub fn upload_geometry_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..20_000, 1u64..4_096)
}

/// Strategy for generating page sizes.
pub fn page_size_strategy() -> impl Strategy<Value = u32> {
    1u32..50
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn names_are_not_empty(name in entity_name_strategy()) {
            prop_assert!(!name.is_empty());
        }

        #[test]
        fn attributes_avoid_reserved_fields(attributes in attributes_strategy(6)) {
            prop_assert!(!attributes.contains_key("name"));
            prop_assert!(!attributes.contains_key("pulp_href"));
        }
    }
}
