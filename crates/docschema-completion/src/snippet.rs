//! Snippet generation for required sub-structure
//!
//! A snippet is built in two steps: the schema is first turned into a
//! [`Template`] (numbering tab stops in insertion order), which is then
//! rendered in the document's own syntax at the cursor's indentation.

use crate::config::CompletionConfig;
use docschema_ast::DocumentFormat;
use docschema_schema::{Field, PathResolver, PrimitiveType, Record, SchemaNode, TypeShape};
use serde_json::Value;

const INDENT: &str = "  ";

/// Shape of the text a snippet inserts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    /// Placeholder or literal, already in snippet syntax
    Scalar(String),
    /// Object with its members in declaration order
    Object(Vec<(String, Template)>),
    /// Array holding one item template
    Array(Box<Template>),
}

impl Template {
    /// Whether inserting this spans sub-structure
    pub fn is_structured(&self) -> bool {
        match self {
            Template::Scalar(_) => false,
            Template::Object(members) => !members.is_empty(),
            Template::Array(_) => true,
        }
    }
}

/// Builds and renders snippets for one completion request
pub struct SnippetBuilder<'a> {
    resolver: PathResolver<'a>,
    format: DocumentFormat,
    max_depth: usize,
    include_optional: bool,
    next_stop: usize,
}

impl<'a> SnippetBuilder<'a> {
    pub fn new(resolver: PathResolver<'a>, format: DocumentFormat, config: &CompletionConfig) -> Self {
        Self {
            resolver,
            format,
            max_depth: config.max_snippet_depth,
            include_optional: config.include_optional_in_snippets,
            next_stop: 1,
        }
    }

    /// Restart tab-stop numbering; each completion item is numbered from 1
    pub fn reset(&mut self) {
        self.next_stop = 1;
    }

    /// Template for an object of `record`: its required fields, plus the
    /// optional ones when configured
    pub fn record_template(&mut self, record: &'a Record) -> Template {
        let mut visiting = vec![record.name.as_str()];
        self.record_members(record, 0, &mut visiting)
    }

    /// Template for the value of `field`
    pub fn field_template(&mut self, field: &'a Field) -> Template {
        self.field_value(field, 0, &mut Vec::new())
    }

    /// Template for a value of one shape
    pub fn shape_template(&mut self, shape: &'a TypeShape) -> Template {
        self.shape_value(shape, 0, &mut Vec::new())
    }

    fn record_members(&mut self, record: &'a Record, depth: usize, visiting: &mut Vec<&'a str>) -> Template {
        let include_optional = self.include_optional;
        let mut members = Vec::new();
        for field in record.fields.iter().filter(|f| include_optional || !f.is_optional) {
            members.push((field.name.clone(), self.field_value(field, depth + 1, visiting)));
        }
        Template::Object(members)
    }

    fn field_value(&mut self, field: &'a Field, depth: usize, visiting: &mut Vec<&'a str>) -> Template {
        if let Some(default) = &field.default {
            return self.default_value(default);
        }

        let shapes: Vec<&'a TypeShape> = field
            .shapes
            .iter()
            .filter(|shape| !matches!(shape, TypeShape::Primitive(PrimitiveType::Null)))
            .collect();
        match shapes.as_slice() {
            &[shape] => self.shape_value(shape, depth, visiting),
            _ => Template::Scalar(self.stop()),
        }
    }

    fn shape_value(&mut self, shape: &'a TypeShape, depth: usize, visiting: &mut Vec<&'a str>) -> Template {
        match shape {
            TypeShape::Primitive(primitive) => self.primitive_value(*primitive),
            TypeShape::Ref(name) => self.reference_value(name, depth, visiting),
            TypeShape::Array(items) => {
                let item = match items.as_slice() {
                    [item] => self.shape_value(item, depth, visiting),
                    _ => Template::Scalar(self.stop()),
                };
                Template::Array(Box::new(item))
            }
        }
    }

    fn reference_value(&mut self, name: &str, depth: usize, visiting: &mut Vec<&'a str>) -> Template {
        if let Some(SchemaNode::Enum(enum_type)) = self.resolver.resolve_type(name) {
            return Template::Scalar(self.choice(&enum_type.symbols));
        }

        let model = self.resolver.model();
        let records = model.concrete_records(name);
        match records.as_slice() {
            &[record] if depth < self.max_depth && !visiting.contains(&record.name.as_str()) => {
                visiting.push(record.name.as_str());
                let template = self.record_members(record, depth, visiting);
                visiting.pop();
                template
            }
            _ => Template::Scalar(format!("{{{}}}", self.stop())),
        }
    }

    fn primitive_value(&mut self, primitive: PrimitiveType) -> Template {
        let n = self.take_stop();
        let text = match primitive {
            PrimitiveType::String => match self.format {
                DocumentFormat::Json => format!("\"${{{n}}}\""),
                DocumentFormat::Yaml => format!("${{{n}}}"),
            },
            PrimitiveType::Int | PrimitiveType::Long => format!("${{{n}:0}}"),
            PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::Number => format!("${{{n}:0.0}}"),
            PrimitiveType::Boolean => format!("${{{n}:false}}"),
            PrimitiveType::Null => format!("${{{n}:null}}"),
            PrimitiveType::Any => format!("${{{n}}}"),
        };
        Template::Scalar(text)
    }

    fn default_value(&mut self, default: &Value) -> Template {
        let n = self.take_stop();
        let text = match default {
            Value::String(s) => {
                let placeholder = format!("${{{n}:{}}}", escape(s));
                match self.format {
                    DocumentFormat::Json => format!("\"{placeholder}\""),
                    DocumentFormat::Yaml => placeholder,
                }
            }
            other => format!("${{{n}:{}}}", escape(&other.to_string())),
        };
        Template::Scalar(text)
    }

    fn choice(&mut self, symbols: &[String]) -> String {
        let n = self.take_stop();
        if symbols.is_empty() {
            return format!("${{{n}}}");
        }
        let options: Vec<String> = symbols.iter().map(|s| escape_choice(s)).collect();
        let choice = format!("${{{n}|{}|}}", options.join(","));
        match self.format {
            DocumentFormat::Json => format!("\"{choice}\""),
            DocumentFormat::Yaml => choice,
        }
    }

    fn stop(&mut self) -> String {
        let n = self.take_stop();
        format!("${{{n}}}")
    }

    fn take_stop(&mut self) -> usize {
        let n = self.next_stop;
        self.next_stop += 1;
        n
    }

    /// Text inserted for a property name followed by its value template
    pub fn render_property(&self, name: &str, value: &Template, indent: usize) -> String {
        match self.format {
            DocumentFormat::Json => format!("\"{name}\": {}", render_json(value, indent)),
            DocumentFormat::Yaml => format!("{name}:{}", render_yaml_value(value, indent)),
        }
    }

    /// Text inserted in value position after `key: `
    pub fn render_value(&self, value: &Template, indent: usize) -> String {
        match self.format {
            DocumentFormat::Json => render_json(value, indent),
            DocumentFormat::Yaml => match value {
                Template::Scalar(text) => text.clone(),
                _ => render_yaml_value(value, indent).trim_start_matches(' ').to_string(),
            },
        }
    }

    /// Text inserted as a new array entry. `dash` means the entry marker
    /// is already typed; `column` is where the cursor sits.
    pub fn render_item(&self, item: &Template, column: usize, dash: bool) -> String {
        match self.format {
            DocumentFormat::Json => render_json(item, column),
            DocumentFormat::Yaml if dash => render_yaml_item(item, column),
            DocumentFormat::Yaml => format!("- {}", render_yaml_item(item, column + 2)),
        }
    }

    /// Text of a whole document body starting at column 0
    pub fn render_document(&self, root: &Template) -> String {
        match self.format {
            DocumentFormat::Json => render_json(root, 0),
            DocumentFormat::Yaml => render_yaml_item(root, 0),
        }
    }
}

fn render_json(template: &Template, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let inner = indent + INDENT.len();
    let inner_pad = " ".repeat(inner);
    match template {
        Template::Scalar(text) => text.clone(),
        Template::Object(members) if members.is_empty() => "{}".to_string(),
        Template::Object(members) => {
            let lines: Vec<String> = members
                .iter()
                .map(|(name, value)| format!("{inner_pad}\"{name}\": {}", render_json(value, inner)))
                .collect();
            format!("{{\n{}\n{pad}}}", lines.join(",\n"))
        }
        Template::Array(item) => format!("[\n{inner_pad}{}\n{pad}]", render_json(item, inner)),
    }
}

/// Value following `name:`, including its leading space or line break
fn render_yaml_value(template: &Template, indent: usize) -> String {
    let inner = indent + INDENT.len();
    let inner_pad = " ".repeat(inner);
    match template {
        Template::Scalar(text) => format!(" {text}"),
        Template::Object(members) if members.is_empty() => " {}".to_string(),
        Template::Object(_) => format!("\n{inner_pad}{}", render_yaml_item(template, inner)),
        Template::Array(item) => format!("\n{inner_pad}- {}", render_yaml_item(item, inner + 2)),
    }
}

/// Block whose first line continues at the cursor and whose other lines
/// start at `indent`
fn render_yaml_item(template: &Template, indent: usize) -> String {
    let pad = " ".repeat(indent);
    match template {
        Template::Scalar(text) => text.clone(),
        Template::Object(members) if members.is_empty() => "{}".to_string(),
        Template::Object(members) => members
            .iter()
            .map(|(name, value)| format!("{name}:{}", render_yaml_value(value, indent)))
            .collect::<Vec<_>>()
            .join(&format!("\n{pad}")),
        Template::Array(item) => format!("- {}", render_yaml_item(item, indent + 2)),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '$' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_choice(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '$' | '}' | '\\' | '|' | ',') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
