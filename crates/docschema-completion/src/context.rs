//! Cursor context classification
//!
//! Decides from the text around the cursor and the tree under it whether the
//! user is typing a property name, a value, or a new array entry. Documents
//! being edited are usually incomplete, so positions the tree does not cover
//! (a key whose value sits on the next, deeper line) are described with a
//! [`SyntheticObject`].

use crate::synthetic::{ObjectRef, SyntheticObject};
use docschema_ast::{Document, DocumentFormat, NodeId, NodeKind, NodePath};
use tracing::trace;

/// What the cursor is positioned to write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorContext {
    /// Nothing to anchor to: empty document or cursor past all content
    Empty,

    /// Property names of `object`. `current_key` is the key being typed,
    /// which is not treated as already declared.
    Properties {
        object: ObjectRef,
        current_key: Option<String>,
    },

    /// Value of `key` in `object`; `value` is the node being replaced
    Value {
        object: ObjectRef,
        key: String,
        value: Option<NodeId>,
    },

    /// A new entry of the array at `path`. `dash` is set when the entry
    /// marker is already typed.
    NewItem { path: NodePath, dash: bool },
}

/// Text facts about the cursor position
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'d> {
    pub offset: usize,
    pub line: usize,
    pub line_start: usize,
    /// Line text before the cursor
    pub prefix: &'d str,
}

impl<'d> Cursor<'d> {
    /// Clamp `offset` into the text and describe its line
    pub fn new(doc: &'d Document, offset: usize) -> Self {
        let text = doc.text();
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = doc.line_index().line_of(offset);
        let line_start = doc.line_index().line_start(line).unwrap_or(0).min(offset);
        Self {
            offset,
            line,
            line_start,
            prefix: &text[line_start..offset],
        }
    }

    /// Column of the cursor in bytes
    pub fn column(&self) -> usize {
        self.prefix.len()
    }

    /// Indentation of the cursor line
    pub fn indent(&self) -> usize {
        indentation(self.prefix)
    }

    pub fn is_blank_line(&self) -> bool {
        self.prefix.trim().is_empty()
    }

    pub fn is_dash_line(&self) -> bool {
        self.prefix.trim() == "-"
    }
}

/// Classify the cursor position
pub fn classify(doc: &Document, offset: usize) -> CursorContext {
    let cursor = Cursor::new(doc, offset);
    let context = classify_cursor(doc, &cursor);
    trace!("Cursor at {} classified as {:?}", cursor.offset, context);
    context
}

fn classify_cursor(doc: &Document, cursor: &Cursor<'_>) -> CursorContext {
    if doc.root().is_none() {
        return CursorContext::Empty;
    }

    if let Some(colon) = separator_before(doc, cursor) {
        if let Some(context) = value_after_colon(doc, colon) {
            return context;
        }
    }

    if doc.format() == DocumentFormat::Yaml && (cursor.is_blank_line() || cursor.is_dash_line()) {
        if let Some(context) = yaml_indentation_context(doc, cursor) {
            return context;
        }
    }

    let Some(node) = doc.node_at(cursor.offset, true) else {
        return CursorContext::Empty;
    };

    match doc.kind(node) {
        Some(NodeKind::Scalar(_)) => scalar_context(doc, cursor, node),
        Some(NodeKind::Property { .. }) => {
            let Some(object) = doc.parent(node) else {
                return CursorContext::Empty;
            };
            CursorContext::Properties {
                object: ObjectRef::Node(object),
                current_key: doc.property_key(node).map(str::to_string),
            }
        }
        Some(NodeKind::Object { .. }) => CursorContext::Properties {
            object: ObjectRef::Node(node),
            current_key: None,
        },
        Some(NodeKind::Array { .. }) => CursorContext::NewItem {
            path: doc.path_of(node),
            dash: cursor.is_dash_line(),
        },
        None => CursorContext::Empty,
    }
}

/// Offset of a key/value separator right before the cursor. In YAML the
/// separator must be on the cursor line; JSON values may follow on a later
/// line.
fn separator_before(doc: &Document, cursor: &Cursor<'_>) -> Option<usize> {
    let before = match doc.format() {
        DocumentFormat::Yaml => cursor.prefix,
        DocumentFormat::Json => &doc.text()[..cursor.offset],
    };
    let trimmed = before.trim_end();
    if !trimmed.ends_with(':') {
        return None;
    }
    let start = match doc.format() {
        DocumentFormat::Yaml => cursor.line_start,
        DocumentFormat::Json => 0,
    };
    Some(start + trimmed.len() - 1)
}

fn value_after_colon(doc: &Document, colon: usize) -> Option<CursorContext> {
    let property = property_with_colon(doc, colon)?;
    let object = doc.parent(property)?;
    Some(CursorContext::Value {
        object: ObjectRef::Node(object),
        key: doc.property_key(property)?.to_string(),
        value: doc.property_value(property),
    })
}

/// Property whose separator sits at `colon`
fn property_with_colon(doc: &Document, colon: usize) -> Option<NodeId> {
    let start = doc.node_at(colon, false)?;
    doc.ancestors(start)
        .find(|&id| matches!(doc.kind(id), Some(NodeKind::Property { colon: Some(at), .. }) if *at == colon))
}

fn scalar_context(doc: &Document, cursor: &Cursor<'_>, node: NodeId) -> CursorContext {
    let Some(parent) = doc.parent(node) else {
        return CursorContext::Empty;
    };

    match doc.kind(parent) {
        Some(NodeKind::Property { .. }) => {
            let Some(object) = doc.parent(parent) else {
                return CursorContext::Empty;
            };
            let key = doc.property_key(parent).unwrap_or_default().to_string();
            if doc.is_property_key(node) {
                CursorContext::Properties {
                    object: ObjectRef::Node(object),
                    current_key: Some(key),
                }
            } else {
                CursorContext::Value {
                    object: ObjectRef::Node(object),
                    key,
                    value: Some(node),
                }
            }
        }
        Some(NodeKind::Array { .. }) => CursorContext::NewItem {
            path: doc.path_of(parent),
            dash: cursor.is_dash_line() || doc.format() == DocumentFormat::Yaml,
        },
        _ => CursorContext::Empty,
    }
}

/// YAML blank or dash-only line: the structure is given by indentation, not
/// by node spans, so look upward for the nearest line at or above the
/// cursor's column.
fn yaml_indentation_context(doc: &Document, cursor: &Cursor<'_>) -> Option<CursorContext> {
    let text = doc.text();
    let dash = cursor.is_dash_line();
    let column = if dash { cursor.indent() } else { cursor.column() };

    for line in (0..cursor.line).rev() {
        let range = doc.line_index().line_range(text, line)?;
        let content = &text[range.offset..range.end()];
        if content.trim().is_empty() || content.trim_start().starts_with('#') {
            continue;
        }

        let indent = indentation(content);
        let is_item = content[indent..].starts_with("- ") || content[indent..].trim_end() == "-";
        let content_column = if is_item { indent + 2 } else { indent };

        if is_item && indent == column {
            // Another entry of the same list
            let array = array_at(doc, range.offset + indent)?;
            return Some(CursorContext::NewItem {
                path: doc.path_of(array),
                dash,
            });
        }

        if content_column == column && !dash {
            let property = property_at(doc, range.offset + content_column)?;
            return Some(CursorContext::Properties {
                object: ObjectRef::Node(doc.parent(property)?),
                current_key: None,
            });
        }

        if content_column < column {
            let property = property_at(doc, range.offset + content_column)?;
            return Some(nested_context(doc, cursor, property, dash));
        }
    }
    None
}

/// Cursor on a deeper line below `property`
fn nested_context(doc: &Document, cursor: &Cursor<'_>, property: NodeId, dash: bool) -> CursorContext {
    let object = doc.parent(property);
    let key = doc.property_key(property).unwrap_or_default().to_string();
    let path = object.map(|o| doc.path_of(o)).unwrap_or_default().child(key);

    match doc.property_value(property).and_then(|value| doc.kind(value).map(|kind| (value, kind))) {
        Some((value, NodeKind::Object { .. })) if !dash => CursorContext::Properties {
            object: ObjectRef::Node(value),
            current_key: None,
        },
        Some((value, NodeKind::Array { .. })) => CursorContext::NewItem {
            path: doc.path_of(value),
            dash,
        },
        _ if dash => CursorContext::NewItem { path, dash },
        _ => CursorContext::Properties {
            object: ObjectRef::Synthetic(SyntheticObject::new(cursor.offset, path)),
            current_key: None,
        },
    }
}

/// Nearest property at or above the node starting at `offset`
fn property_at(doc: &Document, offset: usize) -> Option<NodeId> {
    let start = doc.node_at(offset, false)?;
    doc.ancestors(start)
        .find(|&id| matches!(doc.kind(id), Some(NodeKind::Property { .. })))
}

/// Nearest array at or above the node starting at `offset`
fn array_at(doc: &Document, offset: usize) -> Option<NodeId> {
    let start = doc.node_at(offset, true)?;
    doc.ancestors(start)
        .find(|&id| matches!(doc.kind(id), Some(NodeKind::Array { .. })))
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}
