//! Error types for automapper runs

use thiserror::Error;

/// Errors that abort an automapper run
///
/// Headers without a plausible field are not errors: they are simply absent
/// from the results.
#[derive(Error, Debug)]
pub enum AutomapperError {
    /// A commit was attempted with a path that cannot be valid
    #[error("Automapper produced an invalid mapping path for header '{header}'")]
    InvalidMappingPath { header: String },

    /// Cache key serialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for automapper operations
pub type AutomapperResult<T> = Result<T, AutomapperError>;
