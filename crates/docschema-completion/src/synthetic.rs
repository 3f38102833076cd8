//! Hypothetical objects for positions the tree does not cover yet

use docschema_ast::{Document, NodeId, NodePath, TextRange};

/// Object that would exist at the cursor once the user finishes typing.
///
/// It lives only for one completion call and is never attached to the
/// document, which stays a shared read-only snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticObject {
    /// Empty span anchored at the cursor
    pub range: TextRange,
    /// Where the object would sit in the tree
    pub path: NodePath,
}

impl SyntheticObject {
    pub fn new(offset: usize, path: NodePath) -> Self {
        Self {
            range: TextRange::empty(offset),
            path,
        }
    }
}

/// Object the cursor is in: a real node or a synthetic stand-in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRef {
    Node(NodeId),
    Synthetic(SyntheticObject),
}

impl ObjectRef {
    pub fn path(&self, doc: &Document) -> NodePath {
        match self {
            ObjectRef::Node(id) => doc.path_of(*id),
            ObjectRef::Synthetic(object) => object.path.clone(),
        }
    }

    /// Keys already declared; a synthetic object has none
    pub fn keys<'d>(&self, doc: &'d Document) -> Vec<&'d str> {
        match self {
            ObjectRef::Node(id) => doc.keys(*id),
            ObjectRef::Synthetic(_) => Vec::new(),
        }
    }

    pub fn range(&self, doc: &Document) -> TextRange {
        match self {
            ObjectRef::Node(id) => doc.range_of(*id).unwrap_or_default(),
            ObjectRef::Synthetic(object) => object.range,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, ObjectRef::Synthetic(_))
    }
}
