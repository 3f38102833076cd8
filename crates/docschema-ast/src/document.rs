//! Document snapshot: source text plus the parsed node arena
#![allow(clippy::must_use_candidate)] // Query API intentionally omits pervasive #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent builder methods return Self for ergonomics.

use crate::node::{Node, NodeId, NodeKind, ScalarValue, TextRange};
use crate::path::{NodePath, Segment};
use crate::position::{LineIndex, Range};
use serde::{Deserialize, Serialize};

/// Surface syntax the document was written in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

/// Recoverable problem reported by the producer of the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    pub range: TextRange,
    pub message: String,
}

/// Immutable parsed document. Built once per document version by a
/// [`DocumentBuilder`] and then only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    text: String,
    format: DocumentFormat,
    nodes: Vec<Node>,
    root: Option<NodeId>,
    line_index: LineIndex,
    syntax_errors: Vec<SyntaxError>,
}

impl Document {
    /// Document with no content
    pub fn empty(text: impl Into<String>, format: DocumentFormat) -> Self {
        DocumentBuilder::new(text, format).finish(None)
    }

    /// Source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Surface syntax
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Root node, `None` for an empty document
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Line index over the source text
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Problems reported while the tree was built
    pub fn syntax_errors(&self) -> &[SyntaxError] {
        &self.syntax_errors
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Kind of a node
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Source span of a node
    pub fn range_of(&self, id: NodeId) -> Option<TextRange> {
        self.node(id).map(|node| node.range)
    }

    /// Line/character range of a node
    pub fn position_range(&self, id: NodeId) -> Option<Range> {
        self.range_of(id).map(|range| self.to_range(range))
    }

    /// Convert a byte span to a line/character range
    pub fn to_range(&self, range: TextRange) -> Range {
        self.line_index.range(&self.text, range)
    }

    /// Scalar payload of a node
    pub fn scalar(&self, id: NodeId) -> Option<&ScalarValue> {
        self.node(id).and_then(Node::scalar)
    }

    /// Property nodes of an object, in source order
    pub fn properties(&self, object: NodeId) -> &[NodeId] {
        match self.kind(object) {
            Some(NodeKind::Object { properties }) => properties,
            _ => &[],
        }
    }

    /// Items of an array, in source order
    pub fn items(&self, array: NodeId) -> &[NodeId] {
        match self.kind(array) {
            Some(NodeKind::Array { items }) => items,
            _ => &[],
        }
    }

    /// Key text of a property node
    pub fn property_key(&self, property: NodeId) -> Option<&str> {
        match self.kind(property) {
            Some(NodeKind::Property { key, .. }) => self.scalar(*key).and_then(ScalarValue::as_str),
            _ => None,
        }
    }

    /// Key node of a property
    pub fn property_key_node(&self, property: NodeId) -> Option<NodeId> {
        match self.kind(property) {
            Some(NodeKind::Property { key, .. }) => Some(*key),
            _ => None,
        }
    }

    /// Value node of a property, `None` for a dangling key
    pub fn property_value(&self, property: NodeId) -> Option<NodeId> {
        match self.kind(property) {
            Some(NodeKind::Property { value, .. }) => *value,
            _ => None,
        }
    }

    /// First property of `object` named `key`
    pub fn find_property(&self, object: NodeId, key: &str) -> Option<NodeId> {
        self.properties(object)
            .iter()
            .copied()
            .find(|&property| self.property_key(property) == Some(key))
    }

    /// Value of the property named `key`
    pub fn find_value(&self, object: NodeId, key: &str) -> Option<NodeId> {
        self.find_property(object, key)
            .and_then(|property| self.property_value(property))
    }

    /// Key names declared on an object
    pub fn keys(&self, object: NodeId) -> Vec<&str> {
        self.properties(object)
            .iter()
            .filter_map(|&property| self.property_key(property))
            .collect()
    }

    /// Whether `id` is the key scalar of its parent property
    pub fn is_property_key(&self, id: NodeId) -> bool {
        self.parent(id)
            .and_then(|parent| self.property_key_node(parent))
            .is_some_and(|key| key == id)
    }

    /// Path from the root to `id`. A property node, its key and its value all
    /// share the path of the position they denote.
    /// Empty when the parent links of a malformed tree loop back on
    /// themselves.
    pub fn path_of(&self, id: NodeId) -> NodePath {
        let mut segments = Vec::new();
        let mut current = id;
        let mut steps = 0;

        while let Some(parent) = self.parent(current) {
            steps += 1;
            if steps > self.nodes.len() {
                return NodePath::root();
            }
            match self.kind(parent) {
                Some(NodeKind::Property { .. }) => {
                    if let Some(key) = self.property_key(parent) {
                        segments.push(Segment::Property(key.to_string()));
                    }
                    match self.parent(parent) {
                        Some(object) => current = object,
                        None => break,
                    }
                }
                Some(NodeKind::Object { .. }) => {
                    if let Some(key) = self.property_key(current) {
                        segments.push(Segment::Property(key.to_string()));
                    }
                    current = parent;
                }
                Some(NodeKind::Array { items }) => {
                    if let Some(index) = items.iter().position(|&item| item == current) {
                        segments.push(Segment::Index(index));
                    }
                    current = parent;
                }
                Some(NodeKind::Scalar(_)) | None => break,
            }
        }

        segments.reverse();
        NodePath::new(segments)
    }

    /// Whether every node under the root is reached exactly once. Trees
    /// from [`DocumentBuilder`] always are; a deserialized arena may not be.
    pub fn is_well_formed(&self) -> bool {
        let Some(root) = self.root else {
            return true;
        };
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                return false;
            };
            if std::mem::replace(&mut visited[id.0], true) {
                return false;
            }
            stack.extend(node.children());
        }
        true
    }

    /// `id` followed by its ancestors up to the root. Stops after visiting
    /// every node once, so a cyclic tree cannot trap the caller.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |&current| self.parent(current))
            .take(self.nodes.len())
    }

    /// Innermost node whose span contains `offset`. With `include_end`, a
    /// node ending exactly at `offset` also matches. `None` when the descent
    /// runs deeper than the arena, which only a cyclic tree can do.
    pub fn node_at(&self, offset: usize, include_end: bool) -> Option<NodeId> {
        let root = self.root?;
        if !self.node(root)?.range.contains(offset, include_end) {
            return None;
        }

        let mut current = root;
        let mut depth = 0;
        'descend: loop {
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
            let node = self.node(current)?;
            for child in node.children() {
                let Some(child_node) = self.node(child) else {
                    continue;
                };
                if child_node.range.contains(offset, include_end) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Node at `path`, following property names and array indices
    pub fn node_at_path(&self, path: &NodePath) -> Option<NodeId> {
        let mut current = self.root?;
        for segment in path.segments() {
            current = match segment {
                Segment::Property(name) => self.find_value(current, name)?,
                Segment::Index(index) => *self.items(current).get(*index)?,
            };
        }
        Some(current)
    }

    /// Like [`Document::node_at_path`], reporting which path was missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NodeNotFound`](crate::Error::NodeNotFound) when no
    /// node sits at `path`.
    pub fn require_node_at_path(&self, path: &NodePath) -> crate::Result<NodeId> {
        self.node_at_path(path)
            .ok_or_else(|| crate::Error::node_not_found(path.to_string()))
    }
}

/// Builds a [`Document`] with explicit source spans. Nodes are created
/// detached and attached to their containers as they are added.
#[derive(Debug)]
pub struct DocumentBuilder {
    text: String,
    format: DocumentFormat,
    nodes: Vec<Node>,
    syntax_errors: Vec<SyntaxError>,
}

impl DocumentBuilder {
    /// Start a document over `text`
    pub fn new(text: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            text: text.into(),
            format,
            nodes: Vec::new(),
            syntax_errors: Vec::new(),
        }
    }

    /// Source text being described
    pub fn text(&self) -> &str {
        &self.text
    }

    fn push(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            range,
            parent: None,
        });
        id
    }

    /// Create a detached object
    pub fn object(&mut self, range: TextRange) -> NodeId {
        self.push(
            NodeKind::Object {
                properties: Vec::new(),
            },
            range,
        )
    }

    /// Create a detached array
    pub fn array(&mut self, range: TextRange) -> NodeId {
        self.push(NodeKind::Array { items: Vec::new() }, range)
    }

    /// Create a detached scalar
    pub fn scalar(&mut self, range: TextRange, value: ScalarValue) -> NodeId {
        self.push(NodeKind::Scalar(value), range)
    }

    /// Create a property on `object` from a key node and optional value node
    pub fn property(
        &mut self,
        object: NodeId,
        key: NodeId,
        colon: Option<usize>,
        value: Option<NodeId>,
        range: TextRange,
    ) -> NodeId {
        let property = self.push(NodeKind::Property { key, value, colon }, range);
        self.nodes[key.0].parent = Some(property);
        if let Some(value) = value {
            self.nodes[value.0].parent = Some(property);
        }
        if self.contains(property, object) {
            self.error(range, "property cannot contain its own object");
            return property;
        }
        self.nodes[property.0].parent = Some(object);
        if let NodeKind::Object { properties } = &mut self.nodes[object.0].kind {
            properties.push(property);
        }
        property
    }

    /// Append `item` to `array`. An item that already contains `array` is
    /// left detached and reported as a syntax error.
    pub fn item(&mut self, array: NodeId, item: NodeId) {
        if self.contains(item, array) {
            let range = self.nodes[item.0].range;
            self.error(range, "array cannot contain itself");
            return;
        }
        self.nodes[item.0].parent = Some(array);
        if let NodeKind::Array { items } = &mut self.nodes[array.0].kind {
            items.push(item);
        }
    }

    /// Whether `target` is `node` or sits somewhere below it
    fn contains(&self, node: NodeId, target: NodeId) -> bool {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            let Some(seen) = visited.get_mut(current.0) else {
                continue;
            };
            if std::mem::replace(seen, true) {
                continue;
            }
            if let Some(n) = self.nodes.get(current.0) {
                stack.extend(n.children());
            }
        }
        false
    }

    /// Move the end of a node, used once a container's closing token is seen
    pub fn set_end(&mut self, id: NodeId, end: usize) {
        let range = &mut self.nodes[id.0].range;
        range.length = end.saturating_sub(range.offset);
    }

    /// Record a recoverable problem
    pub fn error(&mut self, range: TextRange, message: impl Into<String>) {
        self.syntax_errors.push(SyntaxError {
            range,
            message: message.into(),
        });
    }

    /// Finish the document with the given root
    pub fn finish(self, root: Option<NodeId>) -> Document {
        let line_index = LineIndex::new(&self.text);
        Document {
            text: self.text,
            format: self.format,
            nodes: self.nodes,
            root,
            line_index,
            syntax_errors: self.syntax_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // {"a": [1, {"b": true}]}
    fn create_test_document() -> (Document, NodeId, NodeId) {
        let text = r#"{"a": [1, {"b": true}]}"#;
        let mut b = DocumentBuilder::new(text, DocumentFormat::Json);
        let root = b.object(TextRange::new(0, 23));
        let key_a = b.scalar(TextRange::new(1, 3), ScalarValue::String("a".into()));
        let array = b.array(TextRange::new(6, 16));
        let one = b.scalar(TextRange::new(7, 1), ScalarValue::Integer(1));
        b.item(array, one);
        let inner = b.object(TextRange::new(10, 11));
        let key_b = b.scalar(TextRange::new(11, 3), ScalarValue::String("b".into()));
        let flag = b.scalar(TextRange::new(16, 4), ScalarValue::Boolean(true));
        b.property(inner, key_b, Some(14), Some(flag), TextRange::new(11, 9));
        b.item(array, inner);
        b.property(root, key_a, Some(4), Some(array), TextRange::new(1, 21));
        (b.finish(Some(root)), inner, flag)
    }

    #[test]
    fn test_path_of_nested_value() {
        let (doc, inner, flag) = create_test_document();
        assert_eq!(doc.path_of(flag).to_string(), "a[1]/b");
        assert_eq!(doc.path_of(inner).to_string(), "a[1]");
        assert!(doc.path_of(doc.root().unwrap()).is_empty());
    }

    #[test]
    fn test_path_of_key_matches_value() {
        let (doc, inner, flag) = create_test_document();
        let property = doc.find_property(inner, "b").unwrap();
        let key = doc.property_key_node(property).unwrap();
        assert!(doc.is_property_key(key));
        assert_eq!(doc.path_of(key), doc.path_of(flag));
        assert_eq!(doc.path_of(property), doc.path_of(flag));
    }

    #[test]
    fn test_node_at_finds_innermost() {
        let (doc, inner, flag) = create_test_document();
        assert_eq!(doc.node_at(17, false), Some(flag));
        assert_eq!(doc.node_at(20, false), Some(inner));
        assert_eq!(doc.node_at(0, false), doc.root());
        assert_eq!(doc.node_at(23, false), None);
        assert_eq!(doc.node_at(23, true), doc.root());
    }

    #[test]
    fn test_node_at_path() {
        let (doc, _, flag) = create_test_document();
        let path: NodePath = "a[1]/b".parse().unwrap();
        assert_eq!(doc.node_at_path(&path), Some(flag));
        assert_eq!(doc.node_at_path(&"a[5]".parse().unwrap()), None);
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::empty("", DocumentFormat::Yaml);
        assert!(doc.root().is_none());
        assert!(doc.node_at(0, true).is_none());
        assert_eq!(doc.format(), DocumentFormat::Yaml);
    }

    #[test]
    fn test_builder_rejects_cycles() {
        let mut b = DocumentBuilder::new("[1]", DocumentFormat::Json);
        let array = b.array(TextRange::new(0, 3));
        b.item(array, array);
        let object = b.object(TextRange::new(0, 3));
        let key = b.scalar(TextRange::new(1, 1), ScalarValue::Integer(1));
        b.property(object, key, None, Some(object), TextRange::new(1, 1));
        let doc = b.finish(Some(array));

        assert!(doc.items(array).is_empty());
        assert!(doc.properties(object).is_empty());
        assert_eq!(doc.syntax_errors().len(), 2);
        assert!(doc.is_well_formed());
        assert_eq!(doc.node_at(1, true), Some(array));
    }

    #[test]
    fn test_walks_stop_on_cyclic_arena() {
        let (mut doc, inner, flag) = create_test_document();
        // inner object becomes its own property's value
        let property = doc.find_property(inner, "b").unwrap();
        if let NodeKind::Property { value, .. } = &mut doc.nodes[property.0].kind {
            *value = Some(inner);
        }
        doc.nodes[inner.0].parent = Some(property);
        doc.nodes[inner.0].range = TextRange::new(0, 23);
        doc.nodes[property.0].range = TextRange::new(0, 23);

        assert!(!doc.is_well_formed());
        assert_eq!(doc.node_at(17, false), None);
        assert!(doc.path_of(inner).is_empty());
        assert!(doc.ancestors(flag).count() <= doc.len());
        assert!(doc.ancestors(inner).count() <= doc.len());
    }

    #[test]
    fn test_keys_in_order() {
        let (doc, inner, _) = create_test_document();
        assert_eq!(doc.keys(doc.root().unwrap()), vec!["a"]);
        assert_eq!(doc.keys(inner), vec!["b"]);
        assert_eq!(doc.find_value(inner, "missing"), None);
    }
}
