#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! # docschema-validation
//!
//! Schema-driven validation of document trees.
//!
//! The validator walks a [`Document`](docschema_ast::Document) top-down
//! alongside a [`SchemaModel`] and reports positioned [`Diagnostic`]s:
//! missing required fields (in declared field order), primitive type
//! mismatches, invalid enum symbols, and scalars standing where a record is
//! expected. Validation never fails; positions the schema cannot resolve are
//! simply not checked.
//!
//! ## Example Usage
//!
//! ```rust
//! use docschema_ast::parse_json;
//! use docschema_schema::SchemaLoader;
//! use docschema_validation::DocumentValidator;
//!
//! let mut loader = SchemaLoader::new();
//! loader
//!     .add_json(r#"{"graph": [{"name": "Workflow", "type": "record", "documentRoot": true,
//!         "fields": [{"name": "class", "type": "string"}]}]}"#)
//!     .unwrap();
//! let model = loader.finish();
//!
//! let diagnostics = DocumentValidator::new(&model).validate(&parse_json("{}"));
//! assert_eq!(diagnostics[0].message, "The 'class' field is required.");
//! ```

pub mod engine;
pub mod reporter;
pub mod rules;

// Re-export main types
pub use engine::{DocumentValidator, ValidationConfig};
pub use reporter::{Diagnostic, DiagnosticCode, Severity, ValidationReport};
pub use rules::RuleResult;

use docschema_ast::Document;
use docschema_schema::SchemaModel;
use thiserror::Error;

/// Errors that can occur when setting up validation
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema has no document root record")]
    NoDocumentRoot,

    #[error("Schema error: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to validate a document with default settings
///
/// # Errors
///
/// Returns [`Error::NoDocumentRoot`] when the model declares no root record.
pub fn validate(doc: &Document, model: &SchemaModel) -> Result<ValidationReport> {
    validate_with_config(doc, model, ValidationConfig::default())
}

/// Convenience function to validate a document with a configuration
///
/// # Errors
///
/// Returns [`Error::NoDocumentRoot`] when the model declares no root record.
pub fn validate_with_config(
    doc: &Document,
    model: &SchemaModel,
    config: ValidationConfig,
) -> Result<ValidationReport> {
    if model.root().is_none() {
        return Err(Error::NoDocumentRoot);
    }
    Ok(DocumentValidator::with_config(model, config).report(doc))
}

/// Validate the value at `path` against the schema node that governs it
///
/// # Errors
///
/// Returns [`Error::Schema`] when no schema node governs `path` or no node
/// sits there in the document.
pub fn validate_at(
    doc: &Document,
    model: &SchemaModel,
    path: &docschema_ast::NodePath,
) -> Result<Vec<Diagnostic>> {
    let resolver = docschema_schema::PathResolver::new(model);
    let record = resolver
        .record_context(path)
        .ok_or_else(|| Error::Schema(format!("No record governs '{path}'")))?;
    let node = doc
        .require_node_at_path(path)
        .map_err(|e| Error::Schema(e.to_string()))?;
    Ok(DocumentValidator::new(model).validate_node(doc, node, record))
}
