//! Schema model definitions

use docschema_ast::ScalarValue;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::loader::LoadIssue;

/// Built-in scalar types a field may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveType {
    String,
    Int,
    Long,
    Float,
    Double,
    Number,
    Boolean,
    Null,
    /// Escape hatch: accepts any value
    Any,
}

impl PrimitiveType {
    /// Parse a bare type name
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "null" => Self::Null,
            "Any" => Self::Any,
            _ => return None,
        })
    }

    /// Name as written in schemas
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Any => "Any",
        }
    }

    /// Whether a scalar value has this type
    pub fn accepts(self, value: &ScalarValue) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::String, ScalarValue::String(_))
            | (Self::Int | Self::Long, ScalarValue::Integer(_))
            | (Self::Float | Self::Double | Self::Number, ScalarValue::Integer(_) | ScalarValue::Float(_))
            | (Self::Boolean, ScalarValue::Boolean(_))
            | (Self::Null, ScalarValue::Null) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One allowed shape of a field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TypeShape {
    /// Built-in scalar
    Primitive(PrimitiveType),

    /// Named record or enum
    Ref(String),

    /// Array whose items take any of the given shapes
    Array(Vec<TypeShape>),
}

impl TypeShape {
    /// Human-readable form, e.g. `Step[]`
    pub fn display_name(&self) -> String {
        match self {
            TypeShape::Primitive(primitive) => primitive.name().to_string(),
            TypeShape::Ref(name) => name.clone(),
            TypeShape::Array(items) => match items.as_slice() {
                [single] => format!("{}[]", single.display_name()),
                _ => format!("({})[]", join_shapes(items)),
            },
        }
    }
}

/// Join shape names with ` | `
pub fn join_shapes(shapes: &[TypeShape]) -> String {
    shapes
        .iter()
        .map(TypeShape::display_name)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Identifier-mapping convention of an array-typed field: the field may be
/// written as an object keyed by `subject`, and an item may be a bare scalar
/// filling `predicate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdMap {
    pub subject: String,
    pub predicate: Option<String>,
}

/// Member of a record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub doc: Option<String>,
    pub default: Option<serde_json::Value>,
    pub is_optional: bool,
    /// Allowed shapes; more than one is a union
    pub shapes: Vec<TypeShape>,
    pub id_map: Option<IdMap>,
}

impl Field {
    /// Create a required field with the given shapes
    pub fn new(name: impl Into<String>, shapes: Vec<TypeShape>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            default: None,
            is_optional: false,
            shapes,
            id_map: None,
        }
    }

    /// Mark the field optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Attach documentation
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Whether any shape is an array
    pub fn can_be_array(&self) -> bool {
        self.shapes.iter().any(|s| matches!(s, TypeShape::Array(_)))
    }

    /// Shapes allowed for array items
    pub fn item_shapes(&self) -> Vec<&TypeShape> {
        self.shapes
            .iter()
            .filter_map(|shape| match shape {
                TypeShape::Array(items) => Some(items.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Named types the field value may take directly
    pub fn type_refs(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().filter_map(|shape| match shape {
            TypeShape::Ref(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Named types array items may take
    pub fn item_type_refs(&self) -> Vec<&str> {
        self.item_shapes()
            .into_iter()
            .filter_map(|shape| match shape {
                TypeShape::Ref(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// First named type, direct or as array item
    pub fn type_ref(&self) -> Option<&str> {
        self.type_refs()
            .next()
            .or_else(|| self.item_type_refs().into_iter().next())
    }

    /// Primitive shapes at the top level
    pub fn primitives(&self) -> impl Iterator<Item = PrimitiveType> + '_ {
        self.shapes.iter().filter_map(|shape| match shape {
            TypeShape::Primitive(primitive) => Some(*primitive),
            _ => None,
        })
    }

    /// Whether the field accepts anything
    pub fn is_any(&self) -> bool {
        self.primitives().any(|p| p == PrimitiveType::Any)
    }

    /// Type as written for documentation
    pub fn type_display(&self) -> String {
        let mut display = join_shapes(&self.shapes);
        if self.is_optional && !self.primitives().any(|p| p == PrimitiveType::Null) {
            display.push('?');
        }
        display
    }
}

/// Named, ordered set of fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
    /// Parents still to be merged; empty once the model is built
    pub extends: Vec<String>,
    /// Every ancestor merged into this record, nearest first
    pub ancestors: Vec<String>,
    pub is_abstract: bool,
    pub document_root: bool,
}

impl Record {
    /// Create a record with the given fields
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            fields,
            extends: Vec::new(),
            ancestors: Vec::new(),
            is_abstract: false,
            document_root: false,
        }
    }

    /// Declare parents to merge
    #[must_use]
    pub fn extending(mut self, parents: Vec<String>) -> Self {
        self.extends = parents;
        self
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that must be present
    pub fn required_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_optional)
    }

    /// Whether this record is `name` or inherits from it
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.ancestors.iter().any(|a| a == name)
    }
}

/// Scalar restricted to a fixed symbol set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumType {
    pub name: String,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
}

impl EnumType {
    /// Create an enum with symbols in declaration order
    pub fn new(name: impl Into<String>, symbols: Vec<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            symbols,
        }
    }

    /// Whether `symbol` is allowed
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

/// Named schema type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SchemaEntry {
    Record(Record),
    Enum(EnumType),
}

impl SchemaEntry {
    /// Globally unique name
    pub fn name(&self) -> &str {
        match self {
            SchemaEntry::Record(record) => &record.name,
            SchemaEntry::Enum(enum_type) => &enum_type.name,
        }
    }

    /// Documentation, if any
    pub fn doc(&self) -> Option<&str> {
        match self {
            SchemaEntry::Record(record) => record.doc.as_deref(),
            SchemaEntry::Enum(enum_type) => enum_type.doc.as_deref(),
        }
    }
}

/// Loaded, expanded schema. Read-only once built and safe to share between
/// threads.
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    types: IndexMap<String, SchemaEntry>,
    fields: HashMap<String, Field>,
    specializations: HashMap<String, String>,
    root: Option<String>,
    issues: Vec<LoadIssue>,
}

impl SchemaModel {
    /// Build a model from already-expanded entries. The global field index
    /// keeps the first field registered under each name, in type order.
    pub fn new(
        types: IndexMap<String, SchemaEntry>,
        specializations: HashMap<String, String>,
        root: Option<String>,
    ) -> Self {
        let mut fields = HashMap::new();
        for entry in types.values() {
            if let SchemaEntry::Record(record) = entry {
                for field in &record.fields {
                    fields
                        .entry(field.name.clone())
                        .or_insert_with(|| field.clone());
                }
            }
        }

        Self {
            types,
            fields,
            specializations,
            root,
            issues: Vec::new(),
        }
    }

    /// Attach the issues collected while loading
    #[must_use]
    pub fn with_issues(mut self, issues: Vec<LoadIssue>) -> Self {
        self.issues = issues;
        self
    }

    /// Look up any type by exact name
    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.types.get(name)
    }

    /// Look up a record by exact name
    pub fn record(&self, name: &str) -> Option<&Record> {
        match self.types.get(name) {
            Some(SchemaEntry::Record(record)) => Some(record),
            _ => None,
        }
    }

    /// Look up an enum by exact name
    pub fn enum_type(&self, name: &str) -> Option<&EnumType> {
        match self.types.get(name) {
            Some(SchemaEntry::Enum(enum_type)) => Some(enum_type),
            _ => None,
        }
    }

    /// All types in load order
    pub fn types(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.types.values()
    }

    /// All records in load order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.types.values().filter_map(|entry| match entry {
            SchemaEntry::Record(record) => Some(record),
            SchemaEntry::Enum(_) => None,
        })
    }

    /// Global field-name index
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Apply the specialization map once
    pub fn specialize<'a>(&'a self, name: &'a str) -> &'a str {
        self.specializations.get(name).map_or(name, String::as_str)
    }

    /// Specialization pairs
    pub fn specializations(&self) -> &HashMap<String, String> {
        &self.specializations
    }

    /// Top-level record of documents
    pub fn root(&self) -> Option<&Record> {
        self.root.as_deref().and_then(|name| self.record(name))
    }

    /// Problems found while loading
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Number of types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the model has no types
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Concrete records a reference to `name` may stand for: the record
    /// itself unless abstract, then every non-abstract descendant.
    pub fn concrete_records(&self, name: &str) -> Vec<&Record> {
        let name = self.specialize(name);
        let mut out = Vec::new();
        if let Some(record) = self.record(name) {
            if !record.is_abstract {
                out.push(record);
            }
        }
        out.extend(
            self.records()
                .filter(|r| !r.is_abstract && r.name != name && r.ancestors.iter().any(|a| a == name)),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_field(name: &str) -> Field {
        Field::new(name, vec![TypeShape::Primitive(PrimitiveType::String)])
    }

    fn create_test_model() -> SchemaModel {
        let mut process = Record::new("Process", vec![string_field("id").optional()]);
        process.is_abstract = true;

        let mut tool = Record::new("Tool", vec![string_field("id"), string_field("command")]);
        tool.ancestors = vec!["Process".into()];

        let mut workflow = Record::new(
            "Workflow",
            vec![Field::new(
                "steps",
                vec![TypeShape::Array(vec![TypeShape::Ref("Process".into())])],
            )],
        );
        workflow.ancestors = vec!["Process".into()];

        let mut types = IndexMap::new();
        for record in [process, tool, workflow] {
            types.insert(record.name.clone(), SchemaEntry::Record(record));
        }
        types.insert(
            "Kind".into(),
            SchemaEntry::Enum(EnumType::new("Kind", vec!["a".into(), "b".into()])),
        );
        SchemaModel::new(types, HashMap::new(), Some("Workflow".into()))
    }

    #[test]
    fn test_primitive_accepts() {
        assert!(PrimitiveType::Number.accepts(&ScalarValue::Integer(1)));
        assert!(PrimitiveType::Double.accepts(&ScalarValue::Float(1.5)));
        assert!(!PrimitiveType::Int.accepts(&ScalarValue::Float(1.5)));
        assert!(!PrimitiveType::String.accepts(&ScalarValue::Integer(1)));
        assert!(PrimitiveType::Any.accepts(&ScalarValue::Null));
        assert_eq!(PrimitiveType::parse("long"), Some(PrimitiveType::Long));
        assert_eq!(PrimitiveType::parse("Step"), None);
    }

    #[test]
    fn test_field_shapes() {
        let field = Field::new(
            "steps",
            vec![
                TypeShape::Ref("Step".into()),
                TypeShape::Array(vec![TypeShape::Ref("Step".into())]),
            ],
        );
        assert!(field.can_be_array());
        assert_eq!(field.item_type_refs(), vec!["Step"]);
        assert_eq!(field.type_ref(), Some("Step"));
        assert_eq!(field.type_display(), "Step | Step[]");
        assert_eq!(string_field("x").optional().type_display(), "string?");
    }

    #[test]
    fn test_global_field_index_keeps_first() {
        let model = create_test_model();
        let id = model.field("id").unwrap();
        assert!(id.is_optional);
        assert!(model.field("command").is_some());
        assert!(model.field("missing").is_none());
    }

    #[test]
    fn test_concrete_records_skip_abstract() {
        let model = create_test_model();
        let names: Vec<&str> = model
            .concrete_records("Process")
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["Tool", "Workflow"]);

        let tool: Vec<&str> = model.concrete_records("Tool").iter().map(|r| r.name.as_str()).collect();
        assert_eq!(tool, vec!["Tool"]);
    }

    #[test]
    fn test_lookups() {
        let model = create_test_model();
        assert_eq!(model.root().unwrap().name, "Workflow");
        assert!(model.enum_type("Kind").unwrap().contains("b"));
        assert!(model.record("Kind").is_none());
        assert_eq!(model.records().count(), 3);
        assert_eq!(model.specialize("Kind"), "Kind");
        assert!(model.record("Tool").unwrap().is_a("Process"));
    }
}
