//! Validation functionality
//!
//! Provides structural checks for schemas handed to the automapper:
//! - Relationship validation (dangling targets, broken inverses)
//! - Reachability of tables from a base table

pub mod relationships;

pub use relationships::{
    DanglingRelationship, InverseMismatch, SchemaValidationResult, SchemaValidator,
};

/// Error during schema validation
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;
