//! Node types for the document tree

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside its owning [`Document`](crate::Document) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Byte span of a node in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    /// Byte offset of the first byte
    pub offset: usize,

    /// Length in bytes
    pub length: usize,
}

impl TextRange {
    /// Create a range from an offset and a length
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Create a range from start and end offsets
    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self {
            offset: start,
            length: end.saturating_sub(start),
        }
    }

    /// Empty range anchored at an offset
    pub fn empty(offset: usize) -> Self {
        Self { offset, length: 0 }
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Whether `offset` lies inside the range. With `include_end` the offset
    /// right after the last byte also counts.
    pub fn contains(&self, offset: usize, include_end: bool) -> bool {
        (self.offset <= offset && offset < self.end()) || (include_end && offset == self.end())
    }
}

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node kind and kind-specific children
    pub kind: NodeKind,

    /// Source span
    pub range: TextRange,

    /// Owning node, `None` for the root
    pub parent: Option<NodeId>,
}

/// Kinds of nodes in the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Mapping with ordered properties
    Object { properties: Vec<NodeId> },

    /// Sequence with ordered items
    Array { items: Vec<NodeId> },

    /// Key/value pair inside an object. `value` is `None` for a dangling key.
    Property {
        key: NodeId,
        value: Option<NodeId>,
        /// Offset of the key/value separator, when present
        colon: Option<usize>,
    },

    /// Leaf value
    Scalar(ScalarValue),
}

/// Values that can be stored in scalar nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

/// Coarse value shape, used when reporting what was found at a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueShape {
    String,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl ValueShape {
    /// Lowercase name as it appears in messages
    pub fn name(self) -> &'static str {
        match self {
            ValueShape::String => "string",
            ValueShape::Number => "number",
            ValueShape::Boolean => "boolean",
            ValueShape::Null => "null",
            ValueShape::Object => "object",
            ValueShape::Array => "array",
        }
    }
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Node {
    /// Whether this is an object node
    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object { .. })
    }

    /// Whether this is an array node
    pub fn is_array(&self) -> bool {
        matches!(self.kind, NodeKind::Array { .. })
    }

    /// Whether this is a property node
    pub fn is_property(&self) -> bool {
        matches!(self.kind, NodeKind::Property { .. })
    }

    /// Scalar payload, if this is a scalar
    pub fn scalar(&self) -> Option<&ScalarValue> {
        match &self.kind {
            NodeKind::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Child ids in source order. For a property this is the key followed by
    /// the value, if any.
    pub fn children(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Object { properties } => properties.clone(),
            NodeKind::Array { items } => items.clone(),
            NodeKind::Property { key, value, .. } => {
                let mut children = vec![*key];
                children.extend(value.iter().copied());
                children
            }
            NodeKind::Scalar(_) => Vec::new(),
        }
    }

    /// Shape of the value this node holds. Properties have none.
    pub fn shape(&self) -> Option<ValueShape> {
        match &self.kind {
            NodeKind::Object { .. } => Some(ValueShape::Object),
            NodeKind::Array { .. } => Some(ValueShape::Array),
            NodeKind::Property { .. } => None,
            NodeKind::Scalar(value) => Some(value.shape()),
        }
    }
}

impl ScalarValue {
    /// Convert value to string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way it would be spelled in a document
    pub fn to_text(&self) -> String {
        match self {
            ScalarValue::String(s) => s.clone(),
            ScalarValue::Integer(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::Boolean(b) => b.to_string(),
            ScalarValue::Null => "null".to_string(),
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Coarse shape of the value
    pub fn shape(&self) -> ValueShape {
        match self {
            ScalarValue::String(_) => ValueShape::String,
            ScalarValue::Integer(_) | ScalarValue::Float(_) => ValueShape::Number,
            ScalarValue::Boolean(_) => ValueShape::Boolean,
            ScalarValue::Null => ValueShape::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_contains() {
        let range = TextRange::new(4, 3);
        assert!(!range.contains(3, false));
        assert!(range.contains(4, false));
        assert!(range.contains(6, false));
        assert!(!range.contains(7, false));
        assert!(range.contains(7, true));
    }

    #[test]
    fn test_range_from_bounds_saturates() {
        let range = TextRange::from_bounds(10, 4);
        assert_eq!(range.offset, 10);
        assert_eq!(range.length, 0);
    }

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(ScalarValue::Integer(3).shape(), ValueShape::Number);
        assert_eq!(ScalarValue::Float(0.5).shape(), ValueShape::Number);
        assert_eq!(ScalarValue::String("x".into()).shape().name(), "string");
        assert_eq!(ScalarValue::Null.to_text(), "null");
    }

    #[test]
    fn test_property_children_skip_missing_value() {
        let node = Node {
            kind: NodeKind::Property {
                key: NodeId(1),
                value: None,
                colon: Some(5),
            },
            range: TextRange::new(0, 6),
            parent: Some(NodeId(0)),
        };
        assert_eq!(node.children(), vec![NodeId(1)]);
        assert!(node.shape().is_none());
    }
}
