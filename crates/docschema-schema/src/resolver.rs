//! Path resolution: which schema node governs a document position

use crate::model::{EnumType, Field, Record, SchemaEntry, SchemaModel};
use docschema_ast::{NodePath, Segment};
use std::fmt;
use tracing::trace;

/// Record, field, or enum governing a document position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaNode<'a> {
    Record(&'a Record),
    Field(&'a Field),
    Enum(&'a EnumType),
}

impl<'a> SchemaNode<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            SchemaNode::Record(record) => &record.name,
            SchemaNode::Field(field) => &field.name,
            SchemaNode::Enum(enum_type) => &enum_type.name,
        }
    }

    pub fn doc(&self) -> Option<&'a str> {
        match self {
            SchemaNode::Record(record) => record.doc.as_deref(),
            SchemaNode::Field(field) => field.doc.as_deref(),
            SchemaNode::Enum(enum_type) => enum_type.doc.as_deref(),
        }
    }

    pub fn as_record(&self) -> Option<&'a Record> {
        match self {
            SchemaNode::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&'a Field> {
        match self {
            SchemaNode::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&'a EnumType> {
        match self {
            SchemaNode::Enum(enum_type) => Some(enum_type),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Record(_) => "record",
            SchemaNode::Field(_) => "field",
            SchemaNode::Enum(_) => "enum",
        }
    }
}

impl fmt::Display for SchemaNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaNode::Field(field) => write!(f, "field {}: {}", field.name, field.type_display()),
            _ => write!(f, "{} {}", self.kind(), self.name()),
        }
    }
}

/// Resolves document paths against a model.
///
/// Resolution walks the path from its end toward the root and stops at the
/// first segment that names something in the model. Array indices borrow the
/// name of the array's own field, so `steps/0/tool_id` and the map-shaped
/// `steps/anyKey/tool_id` land on the same field. When only an outer segment
/// resolves, the result is that segment's declared type.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    model: &'a SchemaModel,
}

impl<'a> PathResolver<'a> {
    pub fn new(model: &'a SchemaModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &'a SchemaModel {
        self.model
    }

    /// Schema node governing `path`; the empty path is the model root
    pub fn resolve(&self, path: &NodePath) -> Option<SchemaNode<'a>> {
        let segments = path.segments();
        if segments.is_empty() {
            return self.model.root().map(SchemaNode::Record);
        }

        let mut end = segments.len();
        let mut outer = false;
        while end > 0 {
            let (name, consumed) = match &segments[end - 1] {
                Segment::Property(name) => (Some(name.as_str()), 1),
                Segment::Index(_) if end >= 2 => (segments[end - 2].as_property(), 2),
                Segment::Index(_) => (None, 1),
            };

            if let Some(node) = name.and_then(|name| self.resolve_by_name(name)) {
                trace!("Resolved {} to {} (outer: {})", path, node, outer);
                return Some(if outer { self.declared_type(node) } else { node });
            }

            end -= consumed;
            outer = true;
        }

        trace!("No schema node for {}", path);
        None
    }

    /// Direct name lookup: specialization first, then records, the global
    /// field index, and enums
    pub fn resolve_by_name(&self, name: &str) -> Option<SchemaNode<'a>> {
        let name = self.model.specialize(name);
        if let Some(record) = self.model.record(name) {
            return Some(SchemaNode::Record(record));
        }
        if let Some(field) = self.model.field(name) {
            return Some(SchemaNode::Field(field));
        }
        self.model.enum_type(name).map(SchemaNode::Enum)
    }

    /// Follow a type reference to its record or enum, after specialization
    pub fn resolve_type(&self, name: &str) -> Option<SchemaNode<'a>> {
        match self.model.get(self.model.specialize(name))? {
            SchemaEntry::Record(record) => Some(SchemaNode::Record(record)),
            SchemaEntry::Enum(enum_type) => Some(SchemaNode::Enum(enum_type)),
        }
    }

    /// Concrete records a field's value, or its array items, may hold
    pub fn field_type_records(&self, field: &Field) -> Vec<&'a Record> {
        let mut names: Vec<&str> = field.type_refs().collect();
        names.extend(field.item_type_refs());

        let mut out: Vec<&'a Record> = Vec::new();
        for name in names {
            for record in self.model.concrete_records(name) {
                if !out.iter().any(|r| r.name == record.name) {
                    out.push(record);
                }
            }
        }
        out
    }

    /// Candidate records for the object at `path`
    pub fn record_candidates(&self, path: &NodePath) -> Vec<&'a Record> {
        match self.resolve(path) {
            Some(SchemaNode::Record(record)) => vec![record],
            Some(SchemaNode::Field(field)) => self.field_type_records(field),
            Some(SchemaNode::Enum(_)) | None => Vec::new(),
        }
    }

    /// The record whose fields apply to the object at `path`
    pub fn record_context(&self, path: &NodePath) -> Option<&'a Record> {
        self.record_candidates(path).into_iter().next()
    }

    fn declared_type(&self, node: SchemaNode<'a>) -> SchemaNode<'a> {
        match node {
            SchemaNode::Field(field) => field
                .type_ref()
                .and_then(|name| self.resolve_type(name))
                .unwrap_or(node),
            _ => node,
        }
    }
}
