//! Error types for schema loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building a [`SchemaGraph`](super::SchemaGraph)
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Failed to read schema file
    #[error("Failed to read schema file: {path}")]
    SchemaReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension does not name a supported format
    #[error("Unsupported schema file format: {0}")]
    UnsupportedFormat(String),

    /// Two tables share a name
    #[error("Duplicate table in schema: {0}")]
    DuplicateTable(String),

    /// Tree ranks were declared for a table the schema does not contain
    #[error("Tree ranks declared for unknown table: {0}")]
    UnknownTreeTable(String),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
