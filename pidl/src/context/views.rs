//! Read-only named views registered at context construction.

use serde_json::Value;

/// A read-only auxiliary view attached to a [`Context`](super::Context).
///
/// The shape is fixed by the value the view was built from: an object
/// becomes a keyed mapping, an array a sequence, anything else a scalar.
/// Sequences and scalars are returned verbatim; mappings are queried one
/// key at a time or snapshotted whole.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextView {
    /// A keyed mapping, e.g. a `config` or `params` block.
    Mapping(serde_json::Map<String, Value>),
    /// An ordered sequence.
    Sequence(Vec<Value>),
    /// A single value.
    Scalar(Value),
}

impl ContextView {
    /// Classifies a value into its view shape.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Mapping(map),
            Value::Array(items) => Self::Sequence(items),
            other => Self::Scalar(other),
        }
    }

    /// Looks up a key in a mapping view. Returns `None` both for an absent
    /// key and for non-mapping views; the owning context distinguishes the
    /// two when reporting errors.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Mapping(map) => map.get(key).cloned(),
            Self::Sequence(_) | Self::Scalar(_) => None,
        }
    }

    /// Returns the entire view contents verbatim.
    #[must_use]
    pub fn value(&self) -> Value {
        match self {
            Self::Mapping(map) => Value::Object(map.clone()),
            Self::Sequence(items) => Value::Array(items.clone()),
            Self::Scalar(value) => value.clone(),
        }
    }

    /// Returns true for mapping-shaped views.
    #[must_use]
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }
}
