//! Integration tests for docschema-validation
//!
//! These tests verify end-to-end validation scenarios against the workflow
//! schema fixtures under `testdata/`.

use std::fs;
use std::path::PathBuf;

use docschema_ast::{Document, DocumentBuilder, DocumentFormat, ScalarValue, TextRange, parse_json};
use docschema_schema::{SchemaLoader, SchemaModel};
use docschema_validation::{DiagnosticCode, DocumentValidator, Severity, ValidationConfig};

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
    let model = loader.finish();
    assert!(model.issues().is_empty(), "{:?}", model.issues());
    model
}

fn messages(model: &SchemaModel, text: &str) -> Vec<String> {
    DocumentValidator::new(model)
        .validate(&parse_json(text))
        .into_iter()
        .map(|d| d.message)
        .collect()
}

#[test]
fn test_valid_fixture_has_no_diagnostics() {
    let model = load_workflow_schema();
    let text = fs::read_to_string(repo_root().join("testdata/documents/valid_workflow.json"))
        .expect("fixture should load");
    let doc = parse_json(&text);
    assert!(doc.syntax_errors().is_empty());

    let diagnostics = DocumentValidator::new(&model).validate(&doc);
    assert!(diagnostics.is_empty(), "{diagnostics:#?}");
}

#[test]
fn test_broken_fixture_reports_in_document_order() {
    let model = load_workflow_schema();
    let text = fs::read_to_string(repo_root().join("testdata/documents/broken_workflow.json"))
        .expect("fixture should load");

    assert_eq!(
        messages(&model, &text),
        vec![
            "The 'class' field is required.",
            "The 'tool_id' field is required.",
            "The value 'bogus' is not a valid 'StepKind'. Allowed values are: tool, subworkflow, pause.",
            "Type mismatch for field 'left'. Expected 'float' but found 'string'.",
            "The 'top' field is required.",
            "The 'source' field is required.",
            "Type mismatch for field 'label'. Expected 'string' but found 'number'.",
        ]
    );
}

#[test]
fn test_toy_schema_properties() {
    let model = load_workflow_schema();

    assert!(messages(&model, r#"{"class": "X", "steps": [{"tool_id": "a"}]}"#).is_empty());
    assert_eq!(
        messages(&model, r#"{"class": "X"}"#),
        vec!["The 'steps' field is required."]
    );
    assert_eq!(
        messages(&model, "{}"),
        vec!["The 'class' field is required.", "The 'steps' field is required."]
    );
    assert_eq!(
        messages(&model, r#"{"class": 123, "steps": []}"#),
        vec!["Type mismatch for field 'class'. Expected 'string' but found 'number'."]
    );
}

#[test]
fn test_missing_field_range_is_object_range() {
    let model = load_workflow_schema();
    let text = "{\n  \"class\": \"X\"\n}";
    let diagnostics = DocumentValidator::new(&model).validate(&parse_json(text));

    assert_eq!(diagnostics.len(), 1);
    let range = diagnostics[0].range;
    assert_eq!((range.start.line, range.start.character), (0, 0));
    assert_eq!((range.end.line, range.end.character), (2, 1));
    assert_eq!(diagnostics[0].severity, Severity::Error);
}

#[test]
fn test_map_shaped_inputs() {
    let model = load_workflow_schema();
    let ok = r#"{"class": "X", "steps": [{"tool_id": "a", "in": {"x": "s", "y": {"source": "t"}}}]}"#;
    assert!(messages(&model, ok).is_empty());

    let bad = r#"{"class": "X", "steps": [{"tool_id": "a", "in": {"x": {}}}]}"#;
    assert_eq!(messages(&model, bad), vec!["The 'source' field is required."]);
}

#[test]
fn test_definition_expected_for_unnamed_scalar_item() {
    let model = load_workflow_schema();
    let diagnostics = DocumentValidator::new(&model)
        .validate(&parse_json(r#"{"class": "X", "steps": [42]}"#));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, DiagnosticCode::DefinitionExpected);
    assert_eq!(diagnostics[0].message, "Step definition expected");
}

#[test]
fn test_dangling_reference_is_not_checked() {
    let mut loader = SchemaLoader::new();
    loader
        .add_json(
            r#"{"graph": [{"name": "Root", "type": "record", "documentRoot": true,
                "fields": [{"name": "thing", "type": "Missing"}]}]}"#,
        )
        .unwrap();
    let model = loader.finish();
    assert!(!model.issues().is_empty());
    assert!(messages(&model, r#"{"thing": [1, {"a": 2}]}"#).is_empty());
    assert_eq!(messages(&model, "{}"), vec!["The 'thing' field is required."]);
}

#[test]
fn test_incomplete_document_still_validates_other_fields() {
    let model = load_workflow_schema();
    let diagnostics = DocumentValidator::new(&model)
        .validate(&parse_json(r#"{"class": 1, "steps": [{"tool_id": "a", "kind": }"#));
    let codes: Vec<DiagnosticCode> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![DiagnosticCode::TypeMismatch]);
}

#[test]
fn test_unknown_fields_warn() {
    let model = load_workflow_schema();
    let config = ValidationConfig::default().with_unknown_fields(true);
    let diagnostics = DocumentValidator::with_config(&model, config)
        .validate(&parse_json(r#"{"class": "X", "steps": [{"tool_id": "a", "tool": 1}]}"#));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].message, "Unknown field 'tool'.");
}

#[test]
fn test_cyclic_tree_is_not_walked() {
    let text = r#"{"steps": [1]}"#;
    let mut builder = DocumentBuilder::new(text, DocumentFormat::Json);
    let root = builder.object(TextRange::new(0, 14));
    let key = builder.scalar(TextRange::new(1, 7), ScalarValue::String("steps".into()));
    let steps = builder.array(TextRange::new(10, 3));
    let one = builder.scalar(TextRange::new(11, 1), ScalarValue::Integer(1));
    builder.item(steps, one);
    builder.property(root, key, Some(8), Some(steps), TextRange::new(1, 12));
    let doc = builder.finish(Some(root));

    let model = load_workflow_schema();
    assert!(!DocumentValidator::new(&model).validate(&doc).is_empty());

    // The array now lists the root object as its item.
    let mut value = serde_json::to_value(&doc).expect("document should serialize");
    value["nodes"][steps.index()]["kind"]["Array"]["items"] = serde_json::json!([root.index()]);
    let cyclic: Document = serde_json::from_value(value).expect("document should deserialize");

    assert!(!cyclic.is_well_formed());
    assert!(DocumentValidator::new(&model).validate(&cyclic).is_empty());
}
