//! Integration tests for docschema-completion
//!
//! These tests drive the completion engine against the workflow schema
//! fixtures under `testdata/`, on JSON documents read with the lenient
//! reader and on YAML trees assembled with the document builder.

use std::path::PathBuf;

use docschema_ast::{Document, DocumentBuilder, DocumentFormat, ScalarValue, TextRange, parse_json};
use docschema_completion::{CompletionEngine, CompletionItemKind};
use docschema_schema::{SchemaLoader, SchemaModel};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn load_workflow_schema() -> SchemaModel {
    let root = repo_root();
    let mut loader = SchemaLoader::new();
    loader
        .add_file(&root.join("testdata/schemas/common.yaml"))
        .expect("common schema should load");
    loader
        .add_file(&root.join("testdata/schemas/workflow.yaml"))
        .expect("workflow schema should load");
    loader.finish()
}

fn load_toy_schema() -> SchemaModel {
    let mut loader = SchemaLoader::new();
    loader
        .add_yaml(
            r"
graph:
  - name: Step
    type: record
    fields:
      - name: tool_id
        type: string
      - name: kind
        type: {type: enum, symbols: [tool, pause]}
  - name: Workflow
    type: record
    documentRoot: true
    fields:
      - name: class
        type: string
      - name: steps
        type: 'Step[]'
",
        )
        .expect("toy schema should load");
    loader.finish()
}

fn offset_after(text: &str, needle: &str) -> usize {
    text.find(needle).expect("needle should be present") + needle.len()
}

/// `steps:\n  - tool_id: a\n    position:\n      ` with the cursor at the end
fn yaml_dangling_position() -> (Document, usize) {
    let text = "steps:\n  - tool_id: a\n    position:\n      ";
    let mut builder = DocumentBuilder::new(text, DocumentFormat::Yaml);

    let root = builder.object(TextRange::from_bounds(0, 35));
    let steps_key = builder.scalar(TextRange::new(0, 5), ScalarValue::String("steps".into()));
    let steps = builder.array(TextRange::from_bounds(9, 35));
    builder.property(root, steps_key, Some(5), Some(steps), TextRange::from_bounds(0, 35));

    let item = builder.object(TextRange::from_bounds(11, 35));
    builder.item(steps, item);
    let tool_key = builder.scalar(TextRange::new(11, 7), ScalarValue::String("tool_id".into()));
    let tool_value = builder.scalar(TextRange::new(20, 1), ScalarValue::String("a".into()));
    builder.property(item, tool_key, Some(18), Some(tool_value), TextRange::from_bounds(11, 21));

    let position_key = builder.scalar(TextRange::from_bounds(26, 34), ScalarValue::String("position".into()));
    builder.property(item, position_key, Some(34), None, TextRange::from_bounds(26, 35));

    (builder.finish(Some(root)), text.len())
}

/// `steps:\n  ` with the cursor at the end
fn yaml_dangling_steps() -> (Document, usize) {
    let text = "steps:\n  ";
    let mut builder = DocumentBuilder::new(text, DocumentFormat::Yaml);
    let root = builder.object(TextRange::from_bounds(0, 6));
    let steps_key = builder.scalar(TextRange::new(0, 5), ScalarValue::String("steps".into()));
    builder.property(root, steps_key, Some(5), None, TextRange::from_bounds(0, 6));
    (builder.finish(Some(root)), text.len())
}

#[test]
fn test_root_properties_exclude_declared() {
    let model = load_toy_schema();
    let engine = CompletionEngine::new(&model);

    let list = engine.complete(&parse_json("{}"), 1);
    assert_eq!(list.labels(), vec!["class", "steps"]);

    let list = engine.complete(&parse_json(r#"{"class": "X", }"#), 15);
    assert_eq!(list.labels(), vec!["steps"]);
}

#[test]
fn test_inherited_fields_follow_own_fields() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let text = r#"{"class": "Workflow", "label": "x", }"#;

    let list = engine.complete(&parse_json(text), offset_after(text, "\"x\", "));
    assert_eq!(list.labels(), vec!["steps", "doc"]);
    assert_eq!(list.items[1].detail.as_deref(), Some("string?"));
}

#[test]
fn test_step_properties_and_snippets() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let text = r#"{"class": "W", "steps": [{"tool_id": "a", }]}"#;

    let list = engine.complete(&parse_json(text), offset_after(text, "\"a\", "));
    assert_eq!(list.labels(), vec!["kind", "position", "in", "label", "doc"]);

    let kinds: Vec<CompletionItemKind> = list.items.iter().map(|item| item.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CompletionItemKind::Property,
            CompletionItemKind::Snippet,
            CompletionItemKind::Snippet,
            CompletionItemKind::Property,
            CompletionItemKind::Property,
        ]
    );
    assert_eq!(list.items[0].insert_text, "\"kind\": ");
    assert!(list.items[1].insert_text.starts_with("\"position\": {\n"));
    assert_eq!(list.items[0].documentation.as_deref(), Some("What the step does"));
}

#[test]
fn test_enum_values_with_default_first() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let text = r#"{"steps": [{"kind": }]}"#;

    let list = engine.complete(&parse_json(text), offset_after(text, "\"kind\": "));
    assert_eq!(list.labels(), vec!["tool", "subworkflow", "pause"]);
    assert_eq!(list.items[0].detail.as_deref(), Some("Default"));
    assert_eq!(list.items[0].insert_text, "\"tool\"");
    assert_eq!(list.items[0].sort_text, "0000");
}

#[test]
fn test_single_record_value_collapses_to_snippet() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let text = r#"{"steps": [{"position": }]}"#;

    let list = engine.complete(&parse_json(text), offset_after(text, "\"position\": "));
    assert_eq!(list.labels(), vec!["Position"]);
    assert_eq!(
        list.items[0].insert_text,
        "{\n  \"left\": ${1:0.0},\n  \"top\": ${2:0.0}\n}"
    );
}

#[test]
fn test_identifier_map_container() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);

    let text = r#"{"steps": [{"in": { }}]}"#;
    let list = engine.complete(&parse_json(text), offset_after(text, "\"in\": { "));
    assert!(list.is_empty(), "{:?}", list.labels());

    let text = r#"{"steps": [{"in": {"reads": { }}}]}"#;
    let list = engine.complete(&parse_json(text), offset_after(text, "\"reads\": { "));
    assert_eq!(list.labels(), vec!["source"]);
}

#[test]
fn test_yaml_dangling_key_uses_synthetic_object() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let (doc, offset) = yaml_dangling_position();
    let before = doc.len();

    let list = engine.complete(&doc, offset);
    assert_eq!(list.labels(), vec!["left", "top"]);
    assert_eq!(list.items[0].insert_text, "left: ");
    assert_eq!(doc.len(), before);
}

#[test]
fn test_yaml_dangling_array_offers_item_template() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let (doc, offset) = yaml_dangling_steps();

    let list = engine.complete(&doc, offset);
    assert_eq!(list.labels(), vec!["Step"]);
    assert_eq!(list.items[0].insert_text, "- tool_id: ${1}");
}

#[test]
fn test_hover_on_fixture() {
    let model = load_workflow_schema();
    let engine = CompletionEngine::new(&model);
    let text = std::fs::read_to_string(repo_root().join("testdata/documents/valid_workflow.json"))
        .expect("fixture should load");
    let doc = parse_json(&text);

    let hover = engine
        .hover(&doc, offset_after(&text, "\"tool_"))
        .expect("tool_id should have hover text");
    assert!(hover.contents.starts_with("**tool_id**: `string`"));
    assert!(hover.contents.contains("Identifier of the tool to run"));
}

/// `[1]` whose array lists itself as its only item, as a deserialized tree
/// may claim
fn cyclic_document() -> Document {
    let mut builder = DocumentBuilder::new("[1]", DocumentFormat::Json);
    let array = builder.array(TextRange::new(0, 3));
    let one = builder.scalar(TextRange::new(1, 1), ScalarValue::Integer(1));
    builder.item(array, one);
    let mut value = serde_json::to_value(builder.finish(Some(array))).expect("document should serialize");
    value["nodes"][0]["kind"]["Array"]["items"] = serde_json::json!([0]);
    value["nodes"][0]["parent"] = serde_json::json!(0);
    serde_json::from_value(value).expect("document should deserialize")
}

#[test]
fn test_cyclic_tree_yields_empty_completion() {
    let (sender, receiver) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let model = load_toy_schema();
        let doc = cyclic_document();
        let engine = CompletionEngine::new(&model);
        let list = engine.complete(&doc, 1);
        let hover = engine.hover(&doc, 1);
        let _ = sender.send((list.len(), hover.is_none()));
    });

    let (count, no_hover) = receiver
        .recv_timeout(std::time::Duration::from_secs(5))
        .expect("completion should return on a cyclic tree");
    assert_eq!(count, 0);
    assert!(no_hover);
}
