//! Command implementations

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use docschema_ast::{Document, NodePath, parse_json};
use docschema_completion::{CompletionConfig, CompletionEngine, check_offset};
use docschema_schema::{PathResolver, SchemaLoader, SchemaModel, SchemaRegistry};
use docschema_validation::{DocumentValidator, ValidationConfig, ValidationReport};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{CliError, read_text};

/// Load and cache the model built from `schemas`
pub fn load_model(registry: &SchemaRegistry, schemas: &[PathBuf]) -> Result<Arc<SchemaModel>> {
    let key = schemas
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(";");
    let model = registry.get_or_load(&key, || {
        let mut loader = SchemaLoader::new();
        for schema in schemas {
            info!("Loading schema {}", schema.display());
            loader.add_file(schema)?;
        }
        Ok(loader.finish())
    })?;
    for issue in model.issues() {
        warn!("Schema issue: {}", issue);
    }
    Ok(model)
}

/// Read a document with the lenient JSON reader
pub fn read_document(path: &Path) -> Result<Document> {
    if matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    ) {
        return Err(CliError::UnsupportedDocument(path.to_path_buf()).into());
    }
    let text = read_text(path)?;
    let doc = parse_json(&text);
    for error in doc.syntax_errors() {
        debug!("{}: syntax error at {}: {}", path.display(), error.range.offset, error.message);
    }
    Ok(doc)
}

/// Outcome of validating one document
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    syntax_errors: Vec<String>,
    #[serde(flatten)]
    report: ValidationReport,
}

impl FileReport {
    fn failed(&self) -> bool {
        self.report.has_errors() || !self.syntax_errors.is_empty()
    }
}

fn validate_file(model: &SchemaModel, config: ValidationConfig, path: &Path) -> Result<FileReport> {
    let doc = read_document(path)?;
    let syntax_errors = doc
        .syntax_errors()
        .iter()
        .map(|error| {
            let position = doc.to_range(error.range).start;
            format!("{}:{}: {}", position.line + 1, position.character + 1, error.message)
        })
        .collect();
    let report = DocumentValidator::with_config(model, config).report(&doc);
    Ok(FileReport {
        file: path.display().to_string(),
        syntax_errors,
        report,
    })
}

/// Validate documents concurrently; exit code 1 when any has errors
pub async fn validate(
    model: Arc<SchemaModel>,
    config: ValidationConfig,
    documents: Vec<PathBuf>,
    json: bool,
) -> Result<ExitCode> {
    let mut tasks = Vec::with_capacity(documents.len());
    for path in documents {
        let model = Arc::clone(&model);
        let config = config.clone();
        tasks.push(tokio::task::spawn_blocking(move || validate_file(&model, config, &path)));
    }

    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reports.push(task.await.context("validation task failed")??);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for file in &reports {
            print_report(file);
        }
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    info!("Validated {} document(s), {} with errors", reports.len(), failed);
    Ok(if failed > 0 { ExitCode::from(1) } else { ExitCode::SUCCESS })
}

fn print_report(file: &FileReport) {
    println!("{}", file.file);
    for error in &file.syntax_errors {
        println!("  {error} syntax error");
    }
    for diagnostic in &file.report.diagnostics {
        println!("  {diagnostic}");
    }
    println!("  Errors: {}", file.report.error_count() + file.syntax_errors.len());
    println!("  Warnings: {}", file.report.warning_count());
    if !file.failed() {
        println!("  Validation passed.");
    }
}

/// Print completions at `offset` as JSON
pub fn complete(model: &SchemaModel, config: CompletionConfig, path: &Path, offset: usize) -> Result<ExitCode> {
    let doc = read_document(path)?;
    let offset = check_offset(&doc, offset)?;
    let list = CompletionEngine::with_config(model, config).complete(&doc, offset);
    println!("{}", serde_json::to_string_pretty(&list)?);
    Ok(ExitCode::SUCCESS)
}

/// Print the schema node governing `path`
pub fn resolve(model: &SchemaModel, path: &str) -> Result<ExitCode> {
    let node_path: NodePath = path.parse().with_context(|| format!("invalid path '{path}'"))?;
    match PathResolver::new(model).resolve(&node_path) {
        Some(node) => {
            println!("{node}");
            if let Some(doc) = node.doc() {
                println!("{doc}");
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No schema node for '{path}'");
            Ok(ExitCode::from(1))
        }
    }
}

/// Print hover text at `offset`
pub fn hover(model: &SchemaModel, path: &Path, offset: usize) -> Result<ExitCode> {
    let doc = read_document(path)?;
    let offset = check_offset(&doc, offset)?;
    match CompletionEngine::new(model).hover(&doc, offset) {
        Some(hover) => {
            println!("{}", hover.contents);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("No hover information at offset {offset}");
            Ok(ExitCode::from(1))
        }
    }
}
