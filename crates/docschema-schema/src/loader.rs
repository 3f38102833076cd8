//! Schema loader: schema documents in, expanded [`SchemaModel`] out

use crate::inheritance::expand_extends;
use crate::model::{EnumType, Field, IdMap, PrimitiveType, Record, SchemaEntry, SchemaModel, TypeShape};
use crate::{Error, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, trace, warn};

/// `Name`, `Name[]`, `Name?`, `Name[]?`
static TYPE_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)(?P<array>\[\])?(?P<optional>\?)?$").expect("static regex is valid")
});

/// Non-fatal problem found while loading. Loading always continues.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadIssue {
    #[error("Unknown entry kind '{kind}' for '{name}'")]
    UnknownEntryKind { name: String, kind: String },

    #[error("Malformed entry '{name}': {message}")]
    MalformedEntry { name: String, message: String },

    #[error("Unknown namespace prefix in '{reference}'")]
    UnresolvedNamespace { reference: String },

    #[error("Field '{record}.{field}' references unknown type '{reference}'")]
    UnresolvedReference {
        record: String,
        field: String,
        reference: String,
    },

    #[error("Record '{record}' extends unknown type '{parent}'")]
    UnresolvedExtends { record: String, parent: String },

    #[error("Circular extends: {}", .chain.join(" -> "))]
    CircularExtends { chain: Vec<String> },
}

/// Raw schema document: `{base, namespaces, graph}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDocument {
    #[serde(default, alias = "$base")]
    pub base: String,

    #[serde(default, alias = "$namespaces")]
    pub namespaces: IndexMap<String, String>,

    #[serde(default, alias = "$graph")]
    pub graph: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SchemaDocumentFile {
    Document(SchemaDocument),
    Entries(Vec<Value>),
}

impl From<SchemaDocumentFile> for SchemaDocument {
    fn from(file: SchemaDocumentFile) -> Self {
        match file {
            SchemaDocumentFile::Document(document) => document,
            SchemaDocumentFile::Entries(graph) => SchemaDocument {
                graph,
                ..SchemaDocument::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocFile {
    Text(String),
    Lines(Vec<String>),
}

impl DocFile {
    fn into_text(self) -> String {
        match self {
            DocFile::Text(text) => text,
            DocFile::Lines(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnumFile {
    name: String,
    #[serde(default)]
    doc: Option<DocFile>,
    #[serde(default)]
    symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RecordFile {
    name: String,
    #[serde(default)]
    doc: Option<DocFile>,
    #[serde(default)]
    fields: Option<FieldsFile>,
    #[serde(default)]
    extends: Option<OneOrMany<String>>,
    #[serde(default)]
    specialize: Option<OneOrMany<SpecializeFile>>,
    #[serde(default, rename = "documentRoot")]
    document_root: bool,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
}

#[derive(Debug, Deserialize)]
struct SpecializeFile {
    #[serde(rename = "specializeFrom")]
    from: String,
    #[serde(rename = "specializeTo")]
    to: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldsFile {
    List(Vec<FieldFile>),
    Map(IndexMap<String, Value>),
}

#[derive(Debug, Deserialize)]
struct FieldFile {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: TypeExprFile,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    doc: Option<DocFile>,
    #[serde(default, rename = "jsonldPredicate")]
    predicate: Option<PredicateFile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredicateFile {
    Map {
        #[serde(rename = "mapSubject")]
        map_subject: Option<String>,
        #[serde(default, rename = "mapPredicate")]
        map_predicate: Option<String>,
    },
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeExprFile {
    Name(String),
    Union(Vec<TypeExprFile>),
    Inline(InlineTypeFile),
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InlineTypeFile {
    Array {
        items: Box<TypeExprFile>,
    },
    Enum {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        doc: Option<DocFile>,
        symbols: Vec<String>,
    },
    Record {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        doc: Option<DocFile>,
        #[serde(default)]
        fields: Option<FieldsFile>,
    },
}

/// Accumulates schema documents and builds the final [`SchemaModel`].
///
/// Loading steps per document: register namespace prefixes, then convert each
/// graph entry. [`SchemaLoader::finish`] expands `extends` chains and checks
/// references. Problems are collected as [`LoadIssue`]s, never raised.
#[derive(Debug, Default)]
pub struct SchemaLoader {
    namespaces: HashMap<String, String>,
    bases: Vec<String>,
    types: IndexMap<String, SchemaEntry>,
    specializations: HashMap<String, String>,
    root: Option<String>,
    issues: Vec<LoadIssue>,
}

/// Load a set of schema documents into one model
pub fn load(documents: Vec<SchemaDocument>) -> SchemaModel {
    let mut loader = SchemaLoader::new();
    for document in documents {
        loader.add_document(document);
    }
    loader.finish()
}

impl SchemaLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add a JSON schema document
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] when the text is not a schema document.
    pub fn add_json(&mut self, json: &str) -> Result<&mut Self> {
        let file: SchemaDocumentFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        Ok(self.add_document(file.into()))
    }

    /// Parse and add a YAML schema document
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] when the text is not a schema document.
    pub fn add_yaml(&mut self, yaml: &str) -> Result<&mut Self> {
        let file: SchemaDocumentFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        Ok(self.add_document(file.into()))
    }

    /// Read and add a schema document from disk, choosing the format by extension
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::InvalidFormat`] when it cannot be parsed.
    pub fn add_file(&mut self, path: &Path) -> Result<&mut Self> {
        trace!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;

        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.add_yaml(&content)
        } else {
            self.add_json(&content)
        }
    }

    /// Add an already-deserialized document
    pub fn add_document(&mut self, document: SchemaDocument) -> &mut Self {
        debug!(
            "Adding schema document '{}' with {} entries",
            document.base,
            document.graph.len()
        );

        if !document.base.is_empty() {
            self.bases.push(document.base.clone());
        }
        for (prefix, base) in document.namespaces {
            trace!("Namespace {} -> {}", prefix, base);
            self.bases.push(base.clone());
            self.namespaces.insert(prefix, base);
        }

        for entry in document.graph {
            self.add_entry(entry);
        }
        self
    }

    /// Issues collected so far
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Expand inheritance, check references, and build the model
    pub fn finish(mut self) -> SchemaModel {
        let expansion_issues = expand_extends(&mut self.types);
        self.issues.extend(expansion_issues);
        self.check_references();

        for issue in &self.issues {
            warn!("Schema load issue: {}", issue);
        }
        info!(
            "Loaded schema model: {} types, {} specializations, root {:?}, {} issues",
            self.types.len(),
            self.specializations.len(),
            self.root,
            self.issues.len()
        );

        SchemaModel::new(self.types, self.specializations, self.root).with_issues(self.issues)
    }

    fn add_entry(&mut self, entry: Value) {
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .map(|n| self.resolve_name(n))
            .unwrap_or_default();
        let kind = entry.get("type").and_then(Value::as_str).unwrap_or_default().to_string();

        match kind.as_str() {
            "enum" => match serde_json::from_value::<EnumFile>(entry) {
                Ok(file) => {
                    let enum_type = EnumType {
                        name: self.resolve_name(&file.name),
                        doc: file.doc.map(DocFile::into_text),
                        symbols: file.symbols,
                    };
                    self.register(SchemaEntry::Enum(enum_type));
                }
                Err(e) => self.malformed(name, e.to_string()),
            },
            "record" => match serde_json::from_value::<RecordFile>(entry) {
                Ok(file) => self.add_record(file),
                Err(e) => self.malformed(name, e.to_string()),
            },
            "" => self.malformed(name, "entry has no type".to_string()),
            _ => {
                debug!("Skipping entry '{}' of unknown kind '{}'", name, kind);
                self.issues.push(LoadIssue::UnknownEntryKind {
                    name,
                    kind: kind.clone(),
                });
            }
        }
    }

    fn malformed(&mut self, name: String, message: String) {
        debug!("Malformed schema entry '{}': {}", name, message);
        self.issues.push(LoadIssue::MalformedEntry { name, message });
    }

    fn register(&mut self, entry: SchemaEntry) {
        let name = entry.name().to_string();
        if self.types.contains_key(&name) {
            debug!("Type '{}' redefined; keeping the later definition", name);
        }
        self.types.insert(name, entry);
    }

    fn add_record(&mut self, file: RecordFile) {
        let name = self.resolve_name(&file.name);

        for pair in file.specialize.map(OneOrMany::into_vec).unwrap_or_default() {
            let from = self.resolve_name(&pair.from);
            let to = self.resolve_name(&pair.to);
            trace!("Specialization {} -> {} (from {})", from, to, name);
            if let Some(previous) = self.specializations.insert(from.clone(), to.clone()) {
                if previous != to {
                    debug!("Specialization of {} changed from {} to {}", from, previous, to);
                }
            }
        }

        let extends = file
            .extends
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .iter()
            .map(|parent| self.resolve_name(parent))
            .collect();

        let fields = match file.fields {
            Some(fields) => self.convert_fields(&name, fields),
            None => Vec::new(),
        };

        if file.document_root && self.root.is_none() {
            debug!("Document root: {}", name);
            self.root = Some(name.clone());
        }

        let record = Record {
            name,
            doc: file.doc.map(DocFile::into_text),
            fields,
            extends,
            ancestors: Vec::new(),
            is_abstract: file.is_abstract,
            document_root: file.document_root,
        };
        self.register(SchemaEntry::Record(record));
    }

    fn convert_fields(&mut self, record: &str, fields: FieldsFile) -> Vec<Field> {
        let files: Vec<FieldFile> = match fields {
            FieldsFile::List(list) => list,
            FieldsFile::Map(map) => map
                .into_iter()
                .filter_map(|(name, value)| self.field_from_shorthand(record, name, value))
                .collect(),
        };

        let mut out: Vec<Field> = Vec::with_capacity(files.len());
        for file in files {
            let field = self.convert_field(record, file);
            if out.iter().any(|f| f.name == field.name) {
                debug!("Duplicate field {}.{} ignored", record, field.name);
                continue;
            }
            out.push(field);
        }
        out
    }

    /// Map-form fields: the value is either a type expression or a field
    /// body without `name`.
    fn field_from_shorthand(&mut self, record: &str, name: String, value: Value) -> Option<FieldFile> {
        let is_inline_type = value
            .as_object()
            .is_some_and(|o| o.contains_key("items") || o.contains_key("symbols") || o.contains_key("fields"));

        let parsed = if value.is_object() && !is_inline_type {
            serde_json::from_value::<FieldFile>(value).map(|mut file| {
                file.name.clone_from(&name);
                file
            })
        } else {
            serde_json::from_value::<TypeExprFile>(value).map(|ty| FieldFile {
                name: name.clone(),
                ty,
                default: None,
                doc: None,
                predicate: None,
            })
        };

        match parsed {
            Ok(file) => Some(file),
            Err(e) => {
                self.malformed(format!("{record}.{name}"), e.to_string());
                None
            }
        }
    }

    fn convert_field(&mut self, record: &str, file: FieldFile) -> Field {
        let name = file.name;
        let (mut shapes, is_optional) = self.convert_type(record, &name, file.ty);
        if shapes.is_empty() {
            shapes.push(TypeShape::Primitive(PrimitiveType::Any));
        }

        let id_map = match file.predicate {
            Some(PredicateFile::Map {
                map_subject: Some(subject),
                map_predicate,
            }) => Some(IdMap {
                subject,
                predicate: map_predicate,
            }),
            _ => None,
        };

        Field {
            name,
            doc: file.doc.map(DocFile::into_text),
            default: file.default,
            is_optional,
            shapes,
            id_map,
        }
    }

    /// Convert a type expression into shapes plus an optional flag
    fn convert_type(&mut self, record: &str, field: &str, expr: TypeExprFile) -> (Vec<TypeShape>, bool) {
        match expr {
            TypeExprFile::Name(text) => {
                let Some(captures) = TYPE_EXPR.captures(text.trim()) else {
                    return (Vec::new(), false);
                };
                let base = self.resolve_name(&captures["name"]);
                let optional = captures.name("optional").is_some();
                let mut shape = self.named_shape(&base);
                if captures.name("array").is_some() {
                    shape = TypeShape::Array(vec![shape]);
                }
                let nullable = shape == TypeShape::Primitive(PrimitiveType::Null);
                (vec![shape], optional || nullable)
            }
            TypeExprFile::Union(members) => {
                let mut shapes = Vec::new();
                let mut optional = false;
                for member in members {
                    let (member_shapes, member_optional) = self.convert_type(record, field, member);
                    optional |= member_optional;
                    for shape in member_shapes {
                        if !shapes.contains(&shape) {
                            shapes.push(shape);
                        }
                    }
                }
                (shapes, optional)
            }
            TypeExprFile::Inline(InlineTypeFile::Array { items }) => {
                let (items, _) = self.convert_type(record, field, *items);
                (vec![TypeShape::Array(items)], false)
            }
            TypeExprFile::Inline(InlineTypeFile::Enum { name, doc, symbols }) => {
                let name = name.map_or_else(|| format!("{record}.{field}"), |n| self.resolve_name(&n));
                self.register(SchemaEntry::Enum(EnumType {
                    name: name.clone(),
                    doc: doc.map(DocFile::into_text),
                    symbols,
                }));
                (vec![TypeShape::Ref(name)], false)
            }
            TypeExprFile::Inline(InlineTypeFile::Record { name, doc, fields }) => {
                let name = name.map_or_else(|| format!("{record}.{field}"), |n| self.resolve_name(&n));
                let fields = match fields {
                    Some(fields) => self.convert_fields(&name, fields),
                    None => Vec::new(),
                };
                let mut inline = Record::new(name.clone(), fields);
                inline.doc = doc.map(DocFile::into_text);
                self.register(SchemaEntry::Record(inline));
                (vec![TypeShape::Ref(name)], false)
            }
            TypeExprFile::Other(value) => {
                self.malformed(
                    format!("{record}.{field}"),
                    format!("unsupported type expression {value}"),
                );
                (Vec::new(), false)
            }
        }
    }

    fn named_shape(&self, name: &str) -> TypeShape {
        match PrimitiveType::parse(name) {
            Some(primitive) => TypeShape::Primitive(primitive),
            None => TypeShape::Ref(name.to_string()),
        }
    }

    /// Strip namespace prefixes and known base URIs down to a bare name.
    /// Unknown prefixes are kept verbatim and reported.
    fn resolve_name(&mut self, raw: &str) -> String {
        let raw = raw.trim();

        for base in self.bases.iter().filter(|b| !b.is_empty()) {
            if let Some(rest) = raw.strip_prefix(base.as_str()) {
                let rest = rest.trim_start_matches('#');
                if !rest.is_empty() {
                    return rest.to_string();
                }
            }
        }

        let raw = raw.trim_start_matches('#');
        if let Some((prefix, rest)) = raw.split_once(':') {
            if self.namespaces.contains_key(prefix) {
                return rest.trim_start_matches('#').to_string();
            }
            if !rest.starts_with("//") {
                debug!("Unknown namespace prefix '{}' in '{}'", prefix, raw);
                let issue = LoadIssue::UnresolvedNamespace {
                    reference: raw.to_string(),
                };
                if !self.issues.contains(&issue) {
                    self.issues.push(issue);
                }
            }
        }
        raw.to_string()
    }

    fn check_references(&mut self) {
        let known: HashSet<&str> = self.types.keys().map(String::as_str).collect();
        let mut dangling = Vec::new();

        for entry in self.types.values() {
            let SchemaEntry::Record(record) = entry else {
                continue;
            };
            for field in &record.fields {
                let mut names: Vec<&str> = field.type_refs().collect();
                names.extend(field.item_type_refs());
                for name in names {
                    if !known.contains(name) {
                        dangling.push(LoadIssue::UnresolvedReference {
                            record: record.name.clone(),
                            field: field.name.clone(),
                            reference: name.to_string(),
                        });
                    }
                }
            }
        }

        for (from, to) in &self.specializations {
            if !known.contains(to.as_str()) {
                debug!("Specialization {} -> {} targets an unknown type", from, to);
            }
        }

        self.issues.extend(dangling);
    }
}
