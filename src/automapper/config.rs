//! Configuration for automapper runs

use serde::{Deserialize, Serialize};

use super::path::MappingPath;
use crate::schema::AutomapperScope;

/// Maximum number of relationships a mapping path may traverse
pub const MAX_DEPTH: usize = 6;

/// Behavioural switches of an automapper run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomapperConfig {
    /// Allow a header to receive several mappings (never marked exhausted)
    pub allow_multiple_mappings: bool,
    /// Scope selecting which definitions apply
    pub scope: AutomapperScope,
    /// Consult the existing-mapping predicate before committing a path
    pub check_for_existing_mappings: bool,
}

impl Default for AutomapperConfig {
    fn default() -> Self {
        Self {
            allow_multiple_mappings: false,
            scope: AutomapperScope::Automapper,
            check_for_existing_mappings: false,
        }
    }
}

impl AutomapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_multiple_mappings(mut self, enabled: bool) -> Self {
        self.allow_multiple_mappings = enabled;
        self
    }

    pub fn with_scope(mut self, scope: AutomapperScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_check_for_existing_mappings(mut self, enabled: bool) -> Self {
        self.check_for_existing_mappings = enabled;
        self
    }
}

/// Inputs of an automapper run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomapperParams {
    /// Raw headers, not required to be unique
    pub headers: Vec<String>,
    pub base_table: String,
    /// Table the synonyms pass starts from (defaults to the base table)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_table: Option<String>,
    /// Path already fixed by the caller
    #[serde(default)]
    pub starting_path: MappingPath,
    /// Index from which reference markers may be renumbered
    #[serde(default)]
    pub path_offset: usize,
    #[serde(default)]
    pub config: AutomapperConfig,
}

impl AutomapperParams {
    pub fn new<I, S>(headers: I, base_table: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            base_table: base_table.into(),
            starting_table: None,
            starting_path: Vec::new(),
            path_offset: 0,
            config: AutomapperConfig::default(),
        }
    }

    pub fn with_starting_table(mut self, table: impl Into<String>) -> Self {
        self.starting_table = Some(table.into());
        self
    }

    /// Fix a path prefix; reference markers at `path_offset` or later stay renumberable
    pub fn with_starting_path(mut self, path: MappingPath, path_offset: usize) -> Self {
        self.starting_path = path;
        self.path_offset = path_offset;
        self
    }

    pub fn with_config(mut self, config: AutomapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn starting_table(&self) -> &str {
        self.starting_table.as_deref().unwrap_or(&self.base_table)
    }
}

/// Cache behaviour of [`Automapper::map`](super::Automapper::map)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    pub use_cache: bool,
    pub commit_to_cache: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            commit_to_cache: true,
        }
    }
}

impl MapOptions {
    /// Run the search without touching the cache
    pub fn uncached() -> Self {
        Self {
            use_cache: false,
            commit_to_cache: false,
        }
    }
}
