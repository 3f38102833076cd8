#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! # docschema-completion
//!
//! Schema-aware completion for documents being edited.
//!
//! The [`CompletionEngine`] classifies the cursor position (property name,
//! value, new array entry, or empty document), finds the record or field
//! governing it through the schema's path resolver, and returns ranked,
//! deduplicated [`CompletionItem`]s. Fields whose type needs sub-structure
//! come with snippets carrying tab stops, rendered in the document's own
//! syntax. Incomplete documents are handled with short-lived synthetic
//! objects that never touch the shared tree.
//!
//! ## Example Usage
//!
//! ```rust
//! use docschema_ast::parse_json;
//! use docschema_completion::CompletionEngine;
//! use docschema_schema::SchemaLoader;
//!
//! let mut loader = SchemaLoader::new();
//! loader
//!     .add_json(r#"{"graph": [{"name": "Workflow", "type": "record", "documentRoot": true,
//!         "fields": [{"name": "class", "type": "string"}, {"name": "label", "type": "string?"}]}]}"#)
//!     .unwrap();
//! let model = loader.finish();
//!
//! let list = CompletionEngine::new(&model).complete(&parse_json(r#"{"class": "X", }"#), 15);
//! assert_eq!(list.labels(), vec!["label"]);
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod hover;
pub mod item;
pub mod snippet;
pub mod synthetic;

// Re-export main types
pub use config::CompletionConfig;
pub use context::{CursorContext, classify};
pub use engine::CompletionEngine;
pub use hover::Hover;
pub use item::{CompletionItem, CompletionItemKind, CompletionList};
pub use synthetic::{ObjectRef, SyntheticObject};

use docschema_ast::Document;
use docschema_schema::SchemaModel;
use thiserror::Error;

/// Errors that can occur when preparing a completion request
#[derive(Error, Debug)]
pub enum Error {
    #[error("Offset {offset} is past the end of the document ({len} bytes)")]
    OffsetOutOfRange { offset: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check that `offset` lies within `doc`
///
/// # Errors
///
/// Returns [`Error::OffsetOutOfRange`] when `offset` is past the end.
pub fn check_offset(doc: &Document, offset: usize) -> Result<usize> {
    let len = doc.text().len();
    if offset > len {
        return Err(Error::OffsetOutOfRange { offset, len });
    }
    Ok(offset)
}

/// Convenience function to complete with default settings
pub fn complete(model: &SchemaModel, doc: &Document, offset: usize) -> CompletionList {
    CompletionEngine::new(model).complete(doc, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docschema_ast::parse_json;

    #[test]
    fn test_check_offset() {
        let doc = parse_json("{}");
        assert_eq!(check_offset(&doc, 2).unwrap(), 2);
        assert!(matches!(
            check_offset(&doc, 3),
            Err(Error::OffsetOutOfRange { offset: 3, len: 2 })
        ));
    }

    #[test]
    fn test_complete_without_root() {
        let model = SchemaModel::default();
        assert!(complete(&model, &parse_json(""), 0).is_empty());
    }
}
