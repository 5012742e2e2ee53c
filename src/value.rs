//! Annotated document tree.
//!
//! A loaded document is a [`Node`] tree: plain YAML scalars, sequences and mappings,
//! plus the two merge annotations produced by the `!overwrite` and `!merge_by:<key>`
//! tags. Annotations live only until the merge step that consumes them; anything
//! coming out of [`crate::merge::merge`] is a plain [`serde_yaml::Value`].

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Null, bool, number or string.
    Scalar(Value),
    Sequence(Vec<Node>),
    Mapping(IndexMap<Value, Node>),
    /// Replace the destination wholesale instead of deep-merging.
    Overwrite(Box<Node>),
    /// Merge into the destination sequence by matching elements on `key`.
    MergeBy { key: String, items: Vec<Node> },
}

impl Node {
    pub fn overwrite(inner: Node) -> Self {
        Node::Overwrite(Box::new(inner))
    }

    pub fn merge_by(key: impl Into<String>, items: Vec<Node>) -> Self {
        Node::MergeBy { key: key.into(), items }
    }

    /// Strip every annotation in the tree, yielding a plain value.
    pub fn into_value(self) -> Value {
        match self {
            Node::Scalar(value) => value,
            Node::Sequence(items) | Node::MergeBy { items, .. } => {
                Value::Sequence(items.into_iter().map(Node::into_value).collect())
            }
            Node::Mapping(entries) => {
                let mut mapping = Mapping::with_capacity(entries.len());
                for (key, node) in entries {
                    mapping.insert(key, node.into_value());
                }
                Value::Mapping(mapping)
            }
            Node::Overwrite(inner) => inner.into_value(),
        }
    }

    /// Look up `field` in a mapping node, seeing through an overwrite wrapper.
    pub fn field(&self, field: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries.get(&Value::String(field.to_string())),
            Node::Overwrite(inner) => match inner.as_ref() {
                Node::Mapping(entries) => entries.get(&Value::String(field.to_string())),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Sequence(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Value::Mapping(mapping) => {
                Node::Mapping(mapping.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
            // Tags are resolved by the loader; a stray one here keeps only its payload.
            Value::Tagged(tagged) => Node::from(tagged.value),
            scalar => Node::Scalar(scalar),
        }
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}
