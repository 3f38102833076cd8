//! Hover text for the node under the cursor

use crate::engine::CompletionEngine;
use docschema_ast::{Document, NodeId, NodeKind, Range};
use docschema_schema::{Field, Record, SchemaNode};
use serde::Serialize;

/// Markdown shown for a document position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hover {
    pub contents: String,
    pub range: Range,
}

impl CompletionEngine<'_> {
    /// Documentation for the property, value, or object at `offset`
    pub fn hover(&self, doc: &Document, offset: usize) -> Option<Hover> {
        if !doc.is_well_formed() {
            return None;
        }
        let node = doc.node_at(offset, false).or_else(|| doc.node_at(offset, true))?;
        let contents = match doc.kind(node)? {
            NodeKind::Scalar(_) | NodeKind::Property { .. } => self.property_hover(doc, node)?,
            NodeKind::Object { .. } => {
                let record = self.resolver().record_context(&doc.path_of(node))?;
                record_text(record)
            }
            NodeKind::Array { .. } => match self.resolver().resolve(&doc.path_of(node))? {
                SchemaNode::Field(field) => self.field_text(field),
                _ => return None,
            },
        };
        Some(Hover {
            contents,
            range: doc.position_range(node)?,
        })
    }

    fn property_hover(&self, doc: &Document, node: NodeId) -> Option<String> {
        let property = match doc.kind(node)? {
            NodeKind::Property { .. } => node,
            _ => doc.parent(node).filter(|p| matches!(doc.kind(*p), Some(NodeKind::Property { .. })))?,
        };
        let key = doc.property_key(property)?;
        let object = doc.parent(property)?;
        let path = doc.path_of(object);

        let field = self
            .resolver()
            .record_candidates(&path)
            .into_iter()
            .find_map(|record| record.field(key))?;
        Some(self.field_text(field))
    }

    fn field_text(&self, field: &Field) -> String {
        let mut text = format!("**{}**: `{}`", field.name, field.type_display());
        if let Some(doc) = &field.doc {
            text.push_str("\n\n");
            text.push_str(doc);
        }
        for name in field.type_refs().chain(field.item_type_refs()) {
            if let Some(SchemaNode::Enum(enum_type)) = self.resolver().resolve_type(name) {
                text.push_str("\n\nAllowed values: ");
                text.push_str(&enum_type.symbols.join(", "));
            }
        }
        text
    }
}

fn record_text(record: &Record) -> String {
    match &record.doc {
        Some(doc) => format!("**{}**\n\n{doc}", record.name),
        None => format!("**{}**", record.name),
    }
}

#[cfg(test)]
mod tests {
    use docschema_ast::parse_json;
    use docschema_schema::{SchemaLoader, SchemaModel};

    use crate::CompletionEngine;

    fn create_test_model() -> SchemaModel {
        let mut loader = SchemaLoader::new();
        loader
            .add_json(
                r#"{"graph": [
                    {"name": "Kind", "type": "enum", "symbols": ["tool", "pause"]},
                    {"name": "Step", "type": "record", "doc": "One unit of work", "fields": [
                        {"name": "kind", "type": "Kind?", "doc": "What the step does"}]},
                    {"name": "Workflow", "type": "record", "documentRoot": true, "fields": [
                        {"name": "steps", "type": "Step[]"}]}
                ]}"#,
            )
            .unwrap();
        loader.finish()
    }

    #[test]
    fn test_hover_on_key() {
        let model = create_test_model();
        let engine = CompletionEngine::new(&model);
        let doc = parse_json(r#"{"steps": [{"kind": "tool"}]}"#);

        let hover = engine.hover(&doc, 14).unwrap();
        assert_eq!(
            hover.contents,
            "**kind**: `Kind?`\n\nWhat the step does\n\nAllowed values: tool, pause"
        );
        assert_eq!(hover.range.start.character, 12);
    }

    #[test]
    fn test_hover_on_object() {
        let model = create_test_model();
        let engine = CompletionEngine::new(&model);
        let doc = parse_json(r#"{"steps": [{"kind": "tool"} ]}"#);

        let hover = engine.hover(&doc, 11).unwrap();
        assert_eq!(hover.contents, "**Step**\n\nOne unit of work");
    }

    #[test]
    fn test_hover_outside_schema() {
        let model = create_test_model();
        let engine = CompletionEngine::new(&model);
        let doc = parse_json(r#"{"other": 1}"#);
        assert!(engine.hover(&doc, 3).is_none());
    }
}
