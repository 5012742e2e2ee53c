//! Deep merge of an annotated overlay into a plain base value.
//!
//! Rules, first match wins:
//! - overlay is `!overwrite`: the overlay replaces the base entirely
//! - both sequences: the overlay elements are appended
//! - base sequence, overlay `!merge_by:<key>`: elements are matched on `key` and merged
//!   in place, unmatched overlay elements are appended
//! - both mappings: merged key by key, recursively
//! - anything else: the overlay wins

use serde_yaml::{Mapping, Value};

use crate::value::Node;

/// Merge `overlay` on top of `base`.
///
/// The base is always an already merged, annotation-free value, and so is the result.
///
/// # Example
/// ```
/// use ycg::merge::merge;
/// use ycg::value::Node;
///
/// let base: serde_yaml::Value = serde_yaml::from_str("{a: {x: 1, y: 2}, l: [1]}").unwrap();
/// let overlay: serde_yaml::Value = serde_yaml::from_str("{a: {y: 3}, l: [2]}").unwrap();
/// let merged = merge(base, Node::from(overlay));
/// let expected: serde_yaml::Value = serde_yaml::from_str("{a: {x: 1, y: 3}, l: [1, 2]}").unwrap();
/// assert_eq!(merged, expected);
/// ```
pub fn merge(base: Value, overlay: Node) -> Value {
    match (base, overlay) {
        (_, Node::Overwrite(inner)) => inner.into_value(),
        (Value::Sequence(mut base_items), Node::Sequence(items)) => {
            base_items.extend(items.into_iter().map(Node::into_value));
            Value::Sequence(base_items)
        }
        (Value::Sequence(base_items), Node::MergeBy { key, items }) => {
            Value::Sequence(merge_by_key(base_items, &key, items))
        }
        (Value::Mapping(base_map), Node::Mapping(entries)) => {
            let mut result = base_map;
            for (key, overlay_value) in entries {
                let merged = match result.get_mut(&key) {
                    // Take the base entry out; insert below puts it back in place.
                    Some(slot) => merge(std::mem::take(slot), overlay_value),
                    None => overlay_value.into_value(),
                };
                result.insert(key, merged);
            }
            Value::Mapping(result)
        }
        (_, overlay) => overlay.into_value(),
    }
}

/// Fold a list of overlays left to right, starting from an empty mapping.
pub fn merge_all(layers: impl IntoIterator<Item = Node>) -> Value {
    layers.into_iter().fold(Value::Mapping(Mapping::new()), merge)
}

fn merge_by_key(base: Vec<Value>, key: &str, items: Vec<Node>) -> Vec<Value> {
    // Match candidates are fixed up front: appended items never become targets.
    let base_keys: Vec<Option<Value>> = base.iter().map(|element| match_key(element, key)).collect();
    let mut result = base;

    for item in items {
        let item_key = item
            .field(key)
            .map(|node| node.clone().into_value())
            .filter(|value| !value.is_null());

        let matched = item_key.and_then(|item_key| {
            base_keys
                .iter()
                .position(|candidate| candidate.as_ref() == Some(&item_key))
        });

        match matched {
            Some(idx) => {
                let current = std::mem::take(&mut result[idx]);
                result[idx] = merge(current, item);
            }
            None => result.push(item.into_value()),
        }
    }

    result
}

fn match_key(element: &Value, key: &str) -> Option<Value> {
    element.as_mapping()?.get(key).cloned()
}
