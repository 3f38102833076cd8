#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docschema-ast
//!
//! Document tree consumed by the schema engine.
//!
//! A [`Document`] is an immutable snapshot of one document version: the
//! source text, an arena of [`Node`]s with byte spans and parent links, and a
//! [`LineIndex`] for turning spans into line/character ranges. Positions in
//! the tree are addressed by [`NodePath`]s made of property names and array
//! indices.

/// Document container, queries, and the builder used by parsers.
pub mod document;
/// Closed node model: objects, arrays, properties, scalars.
pub mod node;
/// Paths from the root to a node.
pub mod path;
/// Line/character positions and the line index.
pub mod position;
/// Lenient JSON reader.
pub mod reader;

/// Primary document type and its builder.
pub use document::{Document, DocumentBuilder, DocumentFormat, SyntaxError};
/// Node primitives for tree structure and value typing.
pub use node::{Node, NodeId, NodeKind, ScalarValue, TextRange, ValueShape};
/// Path segments.
pub use path::{NodePath, Segment};
/// Line/character positions.
pub use position::{LineIndex, Position, Range};
/// JSON entry point.
pub use reader::parse_json;

use thiserror::Error;

/// Errors that can occur when working with the tree
#[derive(Error, Debug)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for tree operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_path_error_keeps_context() {
        let error = Error::invalid_path("a[", "unclosed bracket");
        assert_eq!(error.to_string(), "Invalid path 'a[': unclosed bracket");
    }

    #[test]
    fn node_not_found_formats_path() {
        let error = Error::node_not_found("steps[3]");
        assert!(error.to_string().contains("steps[3]"));
    }
}
