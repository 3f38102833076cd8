//! Validation engine
//!
//! Walks the document top-down in lock-step with the schema. Each position is
//! checked against the field or record that governs it; anything the schema
//! cannot resolve is skipped without a diagnostic.

use crate::reporter::{Diagnostic, DiagnosticCode, ValidationReport};
use crate::rules::{
    accepts_primitive, missing_field_message, type_mismatch, validate_enum,
    validate_record_shorthand,
};
use docschema_ast::{Document, NodeId, NodeKind, ScalarValue, TextRange, ValueShape};
use docschema_schema::{
    EnumType, Field, PathResolver, PrimitiveType, Record, SchemaModel, SchemaNode, TypeShape,
};
use serde::Deserialize;
use tracing::{debug, trace, warn};

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Property naming an object's concrete record. When set, record-level
    /// diagnostics underline that property instead of the whole object, and
    /// its value picks among polymorphic candidates.
    pub discriminator_field: Option<String>,
    /// Warn about properties the record does not declare
    pub report_unknown_fields: bool,
    /// Nesting depth after which the walk stops descending
    pub max_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            discriminator_field: None,
            report_unknown_fields: false,
            max_depth: 128,
        }
    }
}

impl ValidationConfig {
    #[must_use]
    pub fn with_discriminator(mut self, field: impl Into<String>) -> Self {
        self.discriminator_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_unknown_fields(mut self, report: bool) -> Self {
        self.report_unknown_fields = report;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Schema-driven document validator
#[derive(Debug, Clone)]
pub struct DocumentValidator<'a> {
    resolver: PathResolver<'a>,
    config: ValidationConfig,
}

impl<'a> DocumentValidator<'a> {
    /// Create a validator with the default configuration
    pub fn new(model: &'a SchemaModel) -> Self {
        Self::with_config(model, ValidationConfig::default())
    }

    /// Create with specific configuration
    pub fn with_config(model: &'a SchemaModel, config: ValidationConfig) -> Self {
        Self {
            resolver: PathResolver::new(model),
            config,
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a document against the model root. Without a root record
    /// there is nothing to check against and the result is empty.
    pub fn validate(&self, doc: &Document) -> Vec<Diagnostic> {
        match self.resolver.model().root() {
            Some(root) => self.validate_as(doc, root),
            None => {
                debug!("Schema model has no document root; skipping validation");
                Vec::new()
            }
        }
    }

    /// Validate a document whose top-level value should be `record`
    pub fn validate_as(&self, doc: &Document, record: &'a Record) -> Vec<Diagnostic> {
        let Some(root) = doc.root() else {
            return Vec::new();
        };
        let diagnostics = self.validate_node(doc, root, record);
        debug!(
            "Validated document against {}: {} diagnostics",
            record.name,
            diagnostics.len()
        );
        diagnostics
    }

    /// Validate the subtree at `node` as an instance of `record`. A tree
    /// whose nodes loop back on themselves is not walked at all.
    pub fn validate_node(&self, doc: &Document, node: NodeId, record: &'a Record) -> Vec<Diagnostic> {
        if !doc.is_well_formed() {
            warn!("Document tree is not well formed; skipping validation");
            return Vec::new();
        }
        let mut walk = Walk {
            validator: self,
            doc,
            diagnostics: Vec::new(),
        };
        walk.visit_record(node, record, None, None, 0);
        walk.diagnostics
    }

    /// [`DocumentValidator::validate`] wrapped in a report
    pub fn report(&self, doc: &Document) -> ValidationReport {
        ValidationReport::new(self.validate(doc))
    }
}

/// One validation pass over one document
struct Walk<'v, 'a> {
    validator: &'v DocumentValidator<'a>,
    doc: &'v Document,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Walk<'_, 'a> {
    fn config(&self) -> &ValidationConfig {
        &self.validator.config
    }

    fn resolver(&self) -> &PathResolver<'a> {
        &self.validator.resolver
    }

    fn error(&mut self, range: TextRange, code: DiagnosticCode, message: String) {
        trace!("{} at {:?}: {}", code, range, message);
        let range = self.doc.to_range(range);
        self.diagnostics.push(Diagnostic::error(range, code, message));
    }

    fn warning(&mut self, range: TextRange, code: DiagnosticCode, message: String) {
        let range = self.doc.to_range(range);
        self.diagnostics.push(Diagnostic::warning(range, code, message));
    }

    fn range(&self, node: NodeId) -> TextRange {
        self.doc.range_of(node).unwrap_or_default()
    }

    fn too_deep(&self, depth: usize) -> bool {
        if depth > self.config().max_depth {
            debug!("Validation depth limit {} reached", self.config().max_depth);
            return true;
        }
        false
    }

    /// Check an object against a record. `supplied` names a field whose
    /// value comes from the surrounding map key.
    fn visit_record(
        &mut self,
        node: NodeId,
        record: &'a Record,
        parent: Option<&'a Field>,
        supplied: Option<&str>,
        depth: usize,
    ) {
        let Some(kind) = self.doc.kind(node) else {
            return;
        };
        if !matches!(kind, NodeKind::Object { .. }) {
            let result = validate_record_shorthand(self.doc.scalar(node), record, parent);
            if let Some(message) = result.message {
                self.error(self.range(node), DiagnosticCode::DefinitionExpected, message);
            }
            return;
        }

        let object_range = self.record_range(node);
        for field in &record.fields {
            match self.doc.find_property(node, &field.name) {
                None => {
                    if !field.is_optional && supplied != Some(field.name.as_str()) {
                        self.error(
                            object_range,
                            DiagnosticCode::MissingField,
                            missing_field_message(&field.name),
                        );
                    }
                }
                Some(property) => {
                    // A dangling key has already been reported by the parser.
                    if let Some(value) = self.doc.property_value(property) {
                        let shapes: Vec<&TypeShape> = field.shapes.iter().collect();
                        self.check_shapes(value, &shapes, field, true, depth + 1);
                    }
                }
            }
        }

        if self.config().report_unknown_fields {
            self.report_unknown_fields(node, record);
        }
    }

    fn report_unknown_fields(&mut self, node: NodeId, record: &Record) {
        let unknown: Vec<(TextRange, String)> = self
            .doc
            .properties(node)
            .iter()
            .filter_map(|&property| {
                let key = self.doc.property_key(property)?;
                if record.field(key).is_some() {
                    return None;
                }
                let key_node = self.doc.property_key_node(property)?;
                Some((self.range(key_node), key.to_string()))
            })
            .collect();

        for (range, key) in unknown {
            self.warning(range, DiagnosticCode::UnknownField, format!("Unknown field '{key}'."));
        }
    }

    /// Object range, narrowed to the discriminator property when present
    fn record_range(&self, node: NodeId) -> TextRange {
        self.config()
            .discriminator_field
            .as_deref()
            .and_then(|name| self.doc.find_property(node, name))
            .map_or_else(|| self.range(node), |property| self.range(property))
    }

    /// Check a value against the shapes a field allows. `top_level` is false
    /// for array items, where the field's own optionality does not apply.
    fn check_shapes(
        &mut self,
        node: NodeId,
        shapes: &[&'a TypeShape],
        field: &'a Field,
        top_level: bool,
        depth: usize,
    ) {
        if self.too_deep(depth) {
            return;
        }
        let any = TypeShape::Primitive(PrimitiveType::Any);
        if shapes.iter().any(|shape| **shape == any) {
            return;
        }

        let targets = self.targets(shapes);
        let Some(kind) = self.doc.kind(node) else {
            return;
        };

        match kind {
            NodeKind::Scalar(value) => {
                if top_level && value.is_null() && field.is_optional {
                    return;
                }
                if accepts_primitive(value, shapes) {
                    return;
                }
                if let ScalarValue::String(symbol) = value {
                    if targets.enums.iter().any(|e| e.contains(symbol)) {
                        return;
                    }
                    if targets.records.is_empty() {
                        if let Some(enum_type) = targets.enums.first() {
                            self.check_enum(node, symbol, enum_type);
                            return;
                        }
                    }
                }
                if let Some(record) = targets.records.first().copied() {
                    self.visit_record(node, record, Some(field), None, depth);
                    return;
                }
                if targets.is_resolvable() {
                    self.mismatch(node, field, shapes, value.shape());
                }
            }
            NodeKind::Object { .. } => {
                if let Some(record) = self.select_record(node, &targets.records) {
                    self.visit_record(node, record, Some(field), None, depth);
                } else if !targets.items.is_empty() && field.id_map.is_some() {
                    self.check_keyed_items(node, &targets.items, field, depth);
                } else if targets.is_resolvable() {
                    self.mismatch(node, field, shapes, ValueShape::Object);
                }
            }
            NodeKind::Array { items } => {
                if targets.items.is_empty() {
                    if targets.is_resolvable() {
                        self.mismatch(node, field, shapes, ValueShape::Array);
                    }
                    return;
                }
                for &item in items {
                    self.check_shapes(item, &targets.items, field, false, depth + 1);
                }
            }
            NodeKind::Property { .. } => {}
        }
    }

    /// Map-shaped array: each key stands in for the item's subject field
    fn check_keyed_items(&mut self, node: NodeId, items: &[&'a TypeShape], field: &'a Field, depth: usize) {
        let subject = field.id_map.as_ref().map(|id_map| id_map.subject.as_str());
        let targets = self.targets(items);

        for &property in self.doc.properties(node) {
            let Some(value) = self.doc.property_value(property) else {
                continue;
            };
            let is_object = matches!(self.doc.kind(value), Some(NodeKind::Object { .. }));
            match self.select_record(value, &targets.records) {
                Some(record) if is_object => {
                    self.visit_record(value, record, Some(field), subject, depth + 1);
                }
                _ => self.check_shapes(value, items, field, false, depth + 1),
            }
        }
    }

    fn check_enum(&mut self, node: NodeId, symbol: &str, enum_type: &EnumType) {
        if let Some(message) = validate_enum(symbol, enum_type).message {
            self.error(self.range(node), DiagnosticCode::InvalidEnum, message);
        }
    }

    fn mismatch(&mut self, node: NodeId, field: &Field, shapes: &[&TypeShape], found: ValueShape) {
        if let Some(message) = type_mismatch(field, shapes, found).message {
            self.error(self.range(node), DiagnosticCode::TypeMismatch, message);
        }
    }

    /// Pick the record an object most plausibly is: the one its
    /// discriminator names, else the first with every required field present
    fn select_record(&self, node: NodeId, candidates: &[&'a Record]) -> Option<&'a Record> {
        if let Some(name) = self
            .config()
            .discriminator_field
            .as_deref()
            .and_then(|d| self.doc.find_value(node, d))
            .and_then(|value| self.doc.scalar(value))
            .and_then(ScalarValue::as_str)
        {
            if let Some(record) = candidates.iter().find(|r| r.name == name) {
                return Some(record);
            }
        }

        candidates
            .iter()
            .find(|record| {
                record
                    .required_fields()
                    .all(|field| self.doc.find_property(node, &field.name).is_some())
            })
            .or_else(|| candidates.first())
            .copied()
    }

    /// Resolve the named shapes once per position
    fn targets(&self, shapes: &[&'a TypeShape]) -> Targets<'a> {
        let mut targets = Targets::default();
        for &shape in shapes {
            match shape {
                TypeShape::Primitive(_) => targets.primitive = true,
                TypeShape::Array(items) => targets.items.extend(items.iter()),
                TypeShape::Ref(name) => {
                    let model = self.resolver().model();
                    match self.resolver().resolve_type(name) {
                        Some(SchemaNode::Enum(enum_type)) => targets.enums.push(enum_type),
                        Some(SchemaNode::Record(record)) => {
                            let concrete = model.concrete_records(name);
                            if concrete.is_empty() {
                                targets.records.push(record);
                            } else {
                                targets.records.extend(concrete);
                            }
                        }
                        Some(SchemaNode::Field(_)) | None => {
                            trace!("Skipping unresolved type reference {}", name);
                        }
                    }
                }
            }
        }
        targets
    }
}

#[derive(Default)]
struct Targets<'a> {
    primitive: bool,
    enums: Vec<&'a EnumType>,
    records: Vec<&'a Record>,
    items: Vec<&'a TypeShape>,
}

impl Targets<'_> {
    /// Whether anything is known about the position. Positions typed only by
    /// dangling references produce no diagnostics.
    fn is_resolvable(&self) -> bool {
        self.primitive || !self.enums.is_empty() || !self.records.is_empty() || !self.items.is_empty()
    }
}
