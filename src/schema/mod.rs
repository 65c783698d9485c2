//! Schema graph consumed by the automapper
//!
//! The schema is supplied by the surrounding application (usually loaded from
//! the backend's data model dump) and is never mutated once built:
//! - tables and their fields, ordered by field name
//! - relationships with their target table, cardinality and inverse field
//! - tree ranks for tree-capable tables (taxon, geography, ...)
//! - matching definitions (see [`definitions`])
//!
//! # Example
//!
//! ```rust,ignore
//! use collection_automapper::schema::SchemaGraph;
//!
//! let schema = SchemaGraph::load("datamodel.json")?;
//! for table in schema.table_names() {
//!     println!("{}", table);
//! }
//! ```

pub mod definitions;
mod error;

pub use definitions::{
    AutomapperDefinitions, AutomapperScope, ComparisonMode, HeaderComparisons, Pattern,
    ScopedComparisons, Shortcut, TableSynonym,
};
pub use error::{SchemaError, SchemaResult};

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::automapper::compute_hash;
use crate::validation::SchemaValidator;

/// Cardinality of a relationship field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Whether following the relationship can reach several records
    pub fn is_to_many(self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::OneToOne => write!(f, "one-to-one"),
            Cardinality::OneToMany => write!(f, "one-to-many"),
            Cardinality::ManyToOne => write!(f, "many-to-one"),
            Cardinality::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

/// Relationship side of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipInfo {
    pub target_table: String,
    pub cardinality: Cardinality,
    /// Name of the inverse field on the target table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_name: Option<String>,
}

/// A field of a table; literal unless `relationship` is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<RelationshipInfo>,
}

impl FieldInfo {
    /// Create a literal (non-relationship) field
    pub fn literal(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            relationship: None,
        }
    }

    /// Create a relationship field
    pub fn relationship(
        label: impl Into<String>,
        target_table: impl Into<String>,
        cardinality: Cardinality,
        foreign_name: Option<&str>,
    ) -> Self {
        Self {
            label: Some(label.into()),
            relationship: Some(RelationshipInfo {
                target_table: target_table.into(),
                cardinality,
                foreign_name: foreign_name.map(str::to_string),
            }),
        }
    }

    pub fn is_relationship(&self) -> bool {
        self.relationship.is_some()
    }

    /// Label shown to users, falling back to the field name
    pub fn friendly_name<'a>(&'a self, field_name: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(field_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldInfo>,
}

impl Table {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: Some(label.into()),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field: FieldInfo) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn friendly_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A level of a tree-capable table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRank {
    pub name: String,
    #[serde(default)]
    pub is_required: bool,
}

impl TreeRank {
    pub fn new(name: impl Into<String>, is_required: bool) -> Self {
        Self {
            name: name.into(),
            is_required,
        }
    }
}

/// Serializable schema description, as exchanged with the surrounding application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaDescription {
    pub tables: Vec<Table>,
    /// Ordered ranks per tree table, highest rank first
    pub tree_ranks: BTreeMap<String, Vec<TreeRank>>,
    pub definitions: AutomapperDefinitions,
}

impl SchemaDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_tree_ranks(mut self, table: impl Into<String>, ranks: Vec<TreeRank>) -> Self {
        self.tree_ranks.insert(table.into(), ranks);
        self
    }

    pub fn with_definitions(mut self, definitions: AutomapperDefinitions) -> Self {
        self.definitions = definitions;
        self
    }
}

/// Indexed, immutable schema
#[derive(Debug, Clone)]
pub struct SchemaGraph {
    tables: BTreeMap<String, Table>,
    tree_ranks: BTreeMap<String, Vec<TreeRank>>,
    definitions: AutomapperDefinitions,
    fingerprint: String,
}

impl SchemaGraph {
    /// Build the graph from a description
    ///
    /// Structural problems that the automapper can live with (dangling
    /// relationships, broken inverse fields) are logged rather than rejected.
    pub fn from_description(description: SchemaDescription) -> SchemaResult<Self> {
        let fingerprint = compute_hash(&description)?;

        let mut tables = BTreeMap::new();
        for table in description.tables {
            if tables.contains_key(&table.name) {
                return Err(SchemaError::DuplicateTable(table.name));
            }
            tables.insert(table.name.clone(), table);
        }

        if let Some(unknown) = description
            .tree_ranks
            .keys()
            .find(|name| !tables.contains_key(*name))
        {
            return Err(SchemaError::UnknownTreeTable(unknown.clone()));
        }

        let graph = Self {
            tables,
            tree_ranks: description.tree_ranks,
            definitions: description.definitions,
            fingerprint,
        };

        let report = SchemaValidator::new().validate(&graph);
        for dangling in &report.dangling_relationships {
            warn!(
                "Relationship {}.{} targets unknown table '{}'",
                dangling.table, dangling.field, dangling.target_table
            );
        }
        for mismatch in &report.inverse_mismatches {
            warn!(
                "Relationship {}.{} declares inverse '{}' that does not point back",
                mismatch.table, mismatch.field, mismatch.foreign_name
            );
        }
        for table in &report.unknown_definition_tables {
            warn!("Automapper definitions refer to unknown table '{}'", table);
        }

        info!(
            "Loaded schema with {} tables ({} tree tables)",
            graph.tables.len(),
            graph.tree_ranks.len()
        );

        Ok(graph)
    }

    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        let description: SchemaDescription = serde_json::from_str(json)?;
        Self::from_description(description)
    }

    pub fn from_json_value(value: serde_json::Value) -> SchemaResult<Self> {
        let description: SchemaDescription = serde_json::from_value(value)?;
        Self::from_description(description)
    }

    pub fn from_yaml_str(yaml: &str) -> SchemaResult<Self> {
        let description: SchemaDescription = serde_yaml::from_str(yaml)?;
        Self::from_description(description)
    }

    /// Load a schema file, picking the format from the extension (`json`, `yaml`, `yml`)
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|source| SchemaError::SchemaReadError {
                path: path.to_path_buf(),
                source,
            })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(SchemaError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn tree_ranks(&self, table: &str) -> Option<&[TreeRank]> {
        self.tree_ranks.get(table).map(Vec::as_slice)
    }

    pub fn is_tree_table(&self, table: &str) -> bool {
        self.tree_ranks.contains_key(table)
    }

    pub fn definitions(&self) -> &AutomapperDefinitions {
        &self.definitions
    }

    /// Content hash of the description this graph was built from
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
