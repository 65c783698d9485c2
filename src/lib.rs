//! Collection Automapper - Header to schema field mapping for collection data uploads
//!
//! Provides:
//! - Schema graph loading (JSON/YAML) with matching definitions
//! - Breadth-first automapping of spreadsheet headers to mapping paths
//! - A shared results cache
//! - Structural schema validation

pub mod automapper;
pub mod schema;
pub mod validation;

// Re-export commonly used types
pub use automapper::{
    Automapper, AutomapperConfig, AutomapperError, AutomapperParams, AutomapperResult,
    AutomapperResults, MapOptions, MappingPath, ResultsCache, automap,
};
pub use schema::{
    AutomapperDefinitions, AutomapperScope, Cardinality, FieldInfo, SchemaDescription,
    SchemaError, SchemaGraph, Table, TreeRank,
};
pub use validation::{SchemaValidationResult, SchemaValidator, ValidationError};
