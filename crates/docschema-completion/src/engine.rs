//! Completion engine
//!
//! Turns a cursor position into schema-aware suggestions: property names of
//! the record governing the object under the cursor, values allowed for the
//! property being written, templates for new array entries, and a document
//! skeleton when there is nothing to anchor to yet.

use crate::config::CompletionConfig;
use crate::context::{self, Cursor, CursorContext};
use crate::item::{CompletionItem, CompletionItemKind, CompletionList, dedupe};
use crate::snippet::{SnippetBuilder, Template};
use crate::synthetic::ObjectRef;
use docschema_ast::{Document, DocumentFormat, NodeId, NodePath, Segment};
use docschema_schema::{Field, PathResolver, PrimitiveType, Record, SchemaModel, SchemaNode, TypeShape};
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Schema-aware completion over document snapshots
#[derive(Debug, Clone)]
pub struct CompletionEngine<'a> {
    resolver: PathResolver<'a>,
    config: CompletionConfig,
}

impl<'a> CompletionEngine<'a> {
    /// Create an engine with default settings
    pub fn new(model: &'a SchemaModel) -> Self {
        Self::with_config(model, CompletionConfig::default())
    }

    /// Create an engine with a configuration
    pub fn with_config(model: &'a SchemaModel, config: CompletionConfig) -> Self {
        Self {
            resolver: PathResolver::new(model),
            config,
        }
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub(crate) fn resolver(&self) -> PathResolver<'a> {
        self.resolver
    }

    /// Suggestions at byte `offset` of `doc`. Never fails; positions the
    /// schema does not cover, and trees whose nodes loop back on themselves,
    /// yield an empty list.
    pub fn complete(&self, doc: &Document, offset: usize) -> CompletionList {
        if !doc.is_well_formed() {
            warn!("Document tree is not well formed; no completions");
            return CompletionList::default();
        }
        let cursor = Cursor::new(doc, offset);
        let context = context::classify(doc, offset);
        let mut request = Request {
            doc,
            cursor,
            resolver: self.resolver,
            snippets: SnippetBuilder::new(self.resolver, doc.format(), &self.config),
        };

        let items = match context {
            CursorContext::Empty => request.document_items(),
            CursorContext::Properties { object, current_key } => {
                request.property_items(&object, current_key.as_deref())
            }
            CursorContext::Value { object, key, value } => request.value_items(&object, &key, value),
            CursorContext::NewItem { path, dash } => request.new_item_items(&path, dash),
        };

        let mut list = CompletionList::new(dedupe(items));
        if list.items.len() > self.config.max_items {
            list.items.truncate(self.config.max_items);
            list.is_incomplete = true;
        }
        debug!("Offering {} completions at offset {}", list.len(), cursor.offset);
        list
    }
}

/// State of one completion call
struct Request<'a, 'd> {
    doc: &'d Document,
    cursor: Cursor<'d>,
    resolver: PathResolver<'a>,
    snippets: SnippetBuilder<'a>,
}

impl<'a> Request<'a, '_> {
    fn model(&self) -> &'a SchemaModel {
        self.resolver.model()
    }

    fn format(&self) -> DocumentFormat {
        self.doc.format()
    }

    /// Column where a key written on the cursor line starts
    fn key_column(&self) -> usize {
        let indent = self.cursor.indent();
        if self.cursor.prefix[indent..].starts_with('-') {
            indent + 2
        } else {
            indent
        }
    }

    fn document_items(&mut self) -> Vec<CompletionItem> {
        let Some(root) = self.model().root() else {
            trace!("Schema has no document root; nothing to offer");
            return Vec::new();
        };
        self.snippets.reset();
        let template = self.snippets.record_template(root);
        let insert = self.snippets.render_document(&template);
        vec![
            CompletionItem::new(root.name.clone(), insert, CompletionItemKind::Snippet)
                .with_detail(format!("New {}", root.name))
                .with_documentation(root.doc.as_deref())
                .with_sort_index(0),
        ]
    }

    fn property_items(&mut self, object: &ObjectRef, current_key: Option<&str>) -> Vec<CompletionItem> {
        let path = object.path(self.doc);

        if let Some(field) = self.container_field(&path) {
            if field.id_map.is_some() {
                trace!("{} is keyed by identifiers; no property names", path);
                return Vec::new();
            }
            if object.is_synthetic() && field.can_be_array() {
                return self.new_item_items(&path, false);
            }
        }

        let mut declared = object.keys(self.doc);
        if let Some(current) = current_key {
            if let Some(at) = declared.iter().position(|k| *k == current) {
                declared.remove(at);
            }
        }

        let candidates = self.resolver.record_candidates(&path);
        let Some(record) = best_match(&candidates, &declared) else {
            trace!("No record governs {}", path);
            return Vec::new();
        };
        let supplied = self.supplied_key(&path);
        trace!("Completing properties of {} at {}", record.name, path);

        let column = self.key_column();
        let mut items = Vec::new();
        for (index, field) in record.fields.iter().enumerate() {
            if declared.contains(&field.name.as_str()) || supplied == Some(field.name.as_str()) {
                continue;
            }
            self.snippets.reset();
            let template = self.snippets.field_template(field);
            let item = if template.is_structured() {
                let insert = self.snippets.render_property(&field.name, &template, column);
                CompletionItem::new(field.name.clone(), insert, CompletionItemKind::Snippet)
            } else {
                CompletionItem::new(field.name.clone(), self.plain_key(&field.name), CompletionItemKind::Property)
            };
            items.push(
                item.with_detail(field.type_display())
                    .with_documentation(field.doc.as_deref())
                    .with_sort_index(index),
            );
        }
        items
    }

    fn value_items(&mut self, object: &ObjectRef, key: &str, value: Option<NodeId>) -> Vec<CompletionItem> {
        let path = object.path(self.doc);
        let Some(field) = self.field_at(&path, key) else {
            trace!("No field '{}' under {}", key, path);
            return Vec::new();
        };
        trace!("Completing values of {} (replacing {:?})", field.name, value);

        let mut items = Vec::new();
        if let Some(default) = &field.default {
            items.push(
                CompletionItem::new(default_label(default), self.literal(default), CompletionItemKind::Value)
                    .with_detail("Default")
                    .with_documentation(field.doc.as_deref()),
            );
        }

        let mut records: Vec<&'a Record> = Vec::new();
        for shape in &field.shapes {
            match shape {
                TypeShape::Primitive(PrimitiveType::Boolean) => {
                    items.push(self.value_item("true", "true", None));
                    items.push(self.value_item("false", "false", None));
                }
                TypeShape::Primitive(PrimitiveType::Null) => items.push(self.value_item("null", "null", None)),
                TypeShape::Primitive(_) => {}
                TypeShape::Ref(name) => match self.resolver.resolve_type(name) {
                    Some(SchemaNode::Enum(enum_type)) => {
                        for symbol in &enum_type.symbols {
                            let insert = self.string_literal(symbol);
                            items.push(self.value_item(symbol, &insert, enum_type.doc.as_deref()));
                        }
                    }
                    Some(SchemaNode::Record(_)) => {
                        for record in self.model().concrete_records(name) {
                            if !records.iter().any(|r| r.name == record.name) {
                                records.push(record);
                            }
                        }
                    }
                    Some(SchemaNode::Field(_)) | None => {}
                },
                TypeShape::Array(_) => {
                    self.snippets.reset();
                    let template = self.snippets.shape_template(shape);
                    let column = self.cursor.indent();
                    let insert = self.snippets.render_value(&template, column);
                    items.push(
                        CompletionItem::new(shape.display_name(), insert, CompletionItemKind::Snippet)
                            .with_documentation(field.doc.as_deref()),
                    );
                }
            }
        }

        let single = records.len() == 1;
        for record in records {
            self.snippets.reset();
            let template = self.snippets.record_template(record);
            let insert = self.snippets.render_value(&template, self.cursor.indent());
            let label = if single {
                record.name.clone()
            } else {
                format!("{} ({})", field.name, record.name)
            };
            items.push(
                CompletionItem::new(label, insert, CompletionItemKind::Snippet)
                    .with_detail(record.name.clone())
                    .with_documentation(record.doc.as_deref()),
            );
        }

        for (index, item) in items.iter_mut().enumerate() {
            item.sort_text = format!("{index:04}");
        }
        items
    }

    fn new_item_items(&mut self, path: &NodePath, dash: bool) -> Vec<CompletionItem> {
        let Some(SchemaNode::Field(field)) = self.resolver.resolve(path) else {
            trace!("{} is not a schema field; no item templates", path);
            return Vec::new();
        };
        let column = match self.format() {
            DocumentFormat::Json => self.cursor.indent(),
            DocumentFormat::Yaml => self.cursor.column(),
        };

        let mut items = Vec::new();
        for shape in field.item_shapes() {
            match shape {
                TypeShape::Ref(name) => match self.resolver.resolve_type(name) {
                    Some(SchemaNode::Enum(enum_type)) => {
                        for symbol in &enum_type.symbols {
                            let template = Template::Scalar(self.string_literal(symbol));
                            let insert = self.snippets.render_item(&template, column, dash);
                            items.push(self.value_item(symbol, &insert, enum_type.doc.as_deref()));
                        }
                    }
                    Some(SchemaNode::Record(_)) => {
                        for record in self.model().concrete_records(name) {
                            self.snippets.reset();
                            let template = self.snippets.record_template(record);
                            let insert = self.snippets.render_item(&template, column, dash);
                            items.push(
                                CompletionItem::new(record.name.clone(), insert, CompletionItemKind::Snippet)
                                    .with_detail(format!("New {} entry", record.name))
                                    .with_documentation(record.doc.as_deref()),
                            );
                        }
                    }
                    Some(SchemaNode::Field(_)) | None => {}
                },
                TypeShape::Primitive(PrimitiveType::Boolean) => {
                    for literal in ["true", "false"] {
                        let insert = self.snippets.render_item(&Template::Scalar(literal.to_string()), column, dash);
                        items.push(self.value_item(literal, &insert, None));
                    }
                }
                TypeShape::Primitive(_) | TypeShape::Array(_) => {}
            }
        }

        for (index, item) in items.iter_mut().enumerate() {
            item.sort_text = format!("{index:04}");
        }
        items
    }

    /// Field whose value is the object at `path` itself, as opposed to an
    /// item of it
    fn container_field(&self, path: &NodePath) -> Option<&'a Field> {
        let Some(Segment::Property(name)) = path.last() else {
            return None;
        };
        let parent = path.parent()?;
        self.field_at(&parent, name)
    }

    /// Key that a map-shaped container supplies for its entries
    fn supplied_key(&self, path: &NodePath) -> Option<&'a str> {
        if !matches!(path.last(), Some(Segment::Property(_))) {
            return None;
        }
        let container = path.parent()?;
        let field = self.container_field(&container)?;
        field.id_map.as_ref().map(|id_map| id_map.subject.as_str())
    }

    /// Field named `key` of the record governing the object at `path`
    fn field_at(&self, path: &NodePath, key: &str) -> Option<&'a Field> {
        self.resolver
            .record_candidates(path)
            .into_iter()
            .find_map(|record| record.field(key))
            .or_else(|| self.resolver.resolve(&path.child(key)).and_then(|node| node.as_field()))
    }

    fn plain_key(&self, name: &str) -> String {
        match self.format() {
            DocumentFormat::Json => format!("\"{name}\": "),
            DocumentFormat::Yaml => format!("{name}: "),
        }
    }

    fn string_literal(&self, text: &str) -> String {
        match self.format() {
            DocumentFormat::Json => Value::String(text.to_string()).to_string(),
            DocumentFormat::Yaml => text.to_string(),
        }
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::String(s) => self.string_literal(s),
            other => other.to_string(),
        }
    }

    fn value_item(&self, label: &str, insert: &str, documentation: Option<&str>) -> CompletionItem {
        CompletionItem::new(label, insert, CompletionItemKind::Value).with_documentation(documentation)
    }
}

/// Candidate declaring most of the keys already present; the first wins ties
fn best_match<'a>(candidates: &[&'a Record], declared: &[&str]) -> Option<&'a Record> {
    let mut best: Option<(&'a Record, usize)> = None;
    for &record in candidates {
        let score = declared.iter().filter(|key| record.field(key).is_some()).count();
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((record, score));
        }
    }
    best.map(|(record, _)| record)
}

fn default_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
