#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

//! # docschema-schema
//!
//! Schema model, loader, inheritance expansion, and path resolution.
//!
//! Schema documents declare records and enums in a `graph`, may reference
//! each other through namespace prefixes, and build records from parents via
//! `extends`. Loading produces an immutable [`SchemaModel`]:
//! inheritance is expanded once, references are resolved to bare names, and
//! anything the loader could not make sense of is kept as a [`LoadIssue`]
//! instead of failing the load.

pub mod inheritance;
pub mod loader;
pub mod model;
pub mod registry;
pub mod resolver;

pub use inheritance::{InheritanceGraph, expand_extends};
pub use loader::{LoadIssue, SchemaDocument, SchemaLoader, load};
pub use model::{EnumType, Field, IdMap, PrimitiveType, Record, SchemaEntry, SchemaModel, TypeShape};
pub use registry::SchemaRegistry;
pub use resolver::{PathResolver, SchemaNode};

use thiserror::Error;

/// Errors that can occur when working with schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Build an IO error with the offending path
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
