//! Matching definitions consumed by the automapper
//!
//! Four tables drive matching beyond plain field names:
//! - `shortcuts`: curated header → mapping path suffixes, per table
//! - `synonyms`: alternative header spellings, per table and field
//! - `tableSynonyms`: alternative table names, valid below a mapping path filter
//! - `dontMatch`: fields that must never be proposed in a given scope
//!
//! Every header list is keyed by an [`AutomapperScope`] so one schema can drive
//! the automapper and the suggestion box differently.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Context a set of definitions applies to
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AutomapperScope {
    /// Applies in every scope (only meaningful inside definitions)
    All,
    /// Batch automapping of a whole header row
    #[default]
    Automapper,
    /// Suggestions for a single line the user is editing
    Suggestion,
}

impl AutomapperScope {
    /// Whether a definition declared under `self` is active for an invocation in `scope`
    pub fn applies_to(self, scope: AutomapperScope) -> bool {
        self == AutomapperScope::All || self == scope
    }
}

impl fmt::Display for AutomapperScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomapperScope::All => write!(f, "all"),
            AutomapperScope::Automapper => write!(f, "automapper"),
            AutomapperScope::Suggestion => write!(f, "suggestion"),
        }
    }
}

impl std::str::FromStr for AutomapperScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(AutomapperScope::All),
            "automapper" => Ok(AutomapperScope::Automapper),
            "suggestion" => Ok(AutomapperScope::Suggestion),
            _ => Err(format!("Unknown automapper scope: {}", s)),
        }
    }
}

/// Case-insensitive regex compared against lower-cased headers
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self)
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Way a definition string is compared with a header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    Regex,
    String,
    Contains,
}

type ComparisonFn = fn(&HeaderComparisons, &str) -> bool;

fn compare_regex(comparisons: &HeaderComparisons, header: &str) -> bool {
    comparisons.regex.iter().any(|pattern| pattern.is_match(header))
}

fn compare_string(comparisons: &HeaderComparisons, header: &str) -> bool {
    comparisons
        .string
        .iter()
        .any(|value| value.to_lowercase() == header)
}

fn compare_contains(comparisons: &HeaderComparisons, header: &str) -> bool {
    comparisons
        .contains
        .iter()
        .any(|value| header.contains(&value.to_lowercase()))
}

/// Comparison modes in evaluation order
const COMPARISON_MODES: [(ComparisonMode, ComparisonFn); 3] = [
    (ComparisonMode::Regex, compare_regex),
    (ComparisonMode::String, compare_string),
    (ComparisonMode::Contains, compare_contains),
];

/// Header strings a definition matches, grouped by comparison mode
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderComparisons {
    /// Regular expressions tested against the lower-cased header
    pub regex: Vec<Pattern>,
    /// Exact (case-insensitive) header values
    pub string: Vec<String>,
    /// Substrings the lower-cased header must contain
    pub contains: Vec<String>,
    /// Extra field spellings combined with table names when matching headers
    pub formatted_header_field_synonym: Vec<String>,
}

impl HeaderComparisons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_regex(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.regex.push(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn with_string(mut self, value: impl Into<String>) -> Self {
        self.string.push(value.into());
        self
    }

    pub fn with_contains(mut self, value: impl Into<String>) -> Self {
        self.contains.push(value.into());
        self
    }

    pub fn with_formatted_header_field_synonym(mut self, value: impl Into<String>) -> Self {
        self.formatted_header_field_synonym.push(value.into());
        self
    }

    /// First comparison mode matching a lower-cased header, if any
    pub fn matching_mode(&self, lowercase_header: &str) -> Option<ComparisonMode> {
        COMPARISON_MODES
            .iter()
            .find(|(_, compare)| compare(self, lowercase_header))
            .map(|(mode, _)| *mode)
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_empty()
            && self.string.is_empty()
            && self.contains.is_empty()
            && self.formatted_header_field_synonym.is_empty()
    }

    fn extend_from(&mut self, other: &HeaderComparisons) {
        self.regex.extend(other.regex.iter().cloned());
        self.string.extend(other.string.iter().cloned());
        self.contains.extend(other.contains.iter().cloned());
        self.formatted_header_field_synonym
            .extend(other.formatted_header_field_synonym.iter().cloned());
    }
}

/// Header comparisons keyed by the scope they are declared for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopedComparisons(pub BTreeMap<AutomapperScope, HeaderComparisons>);

impl ScopedComparisons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: AutomapperScope, comparisons: HeaderComparisons) -> Self {
        self.0.insert(scope, comparisons);
        self
    }

    /// Comparisons active for an invocation scope (`all` merged with the scope's own entry)
    pub fn for_scope(&self, scope: AutomapperScope) -> HeaderComparisons {
        let mut merged = HeaderComparisons::default();
        for (declared, comparisons) in &self.0 {
            if declared.applies_to(scope) {
                merged.extend_from(comparisons);
            }
        }
        merged
    }
}

/// Curated mapping used when a header matches one of its comparisons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortcut {
    /// Segments appended to the current path on a match
    pub mapping_path: Vec<String>,
    pub headers: ScopedComparisons,
}

/// Alternative name for a table, valid when the path ends with `mapping_path_filter`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSynonym {
    #[serde(default)]
    pub mapping_path_filter: Vec<String>,
    pub headers: Vec<String>,
}

impl TableSynonym {
    pub fn new(mapping_path_filter: Vec<String>, headers: Vec<String>) -> Self {
        Self {
            mapping_path_filter,
            headers,
        }
    }
}

/// All matching definitions of a schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutomapperDefinitions {
    pub table_synonyms: BTreeMap<String, Vec<TableSynonym>>,
    pub dont_match: BTreeMap<String, BTreeMap<String, Vec<AutomapperScope>>>,
    pub shortcuts: BTreeMap<String, Vec<Shortcut>>,
    pub synonyms: BTreeMap<String, BTreeMap<String, ScopedComparisons>>,
}

impl AutomapperDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_synonym(mut self, table: impl Into<String>, synonym: TableSynonym) -> Self {
        self.table_synonyms
            .entry(table.into())
            .or_default()
            .push(synonym);
        self
    }

    pub fn with_shortcut(mut self, table: impl Into<String>, shortcut: Shortcut) -> Self {
        self.shortcuts.entry(table.into()).or_default().push(shortcut);
        self
    }

    pub fn with_synonym(
        mut self,
        table: impl Into<String>,
        field: impl Into<String>,
        scope: AutomapperScope,
        comparisons: HeaderComparisons,
    ) -> Self {
        self.synonyms
            .entry(table.into())
            .or_default()
            .entry(field.into())
            .or_default()
            .0
            .insert(scope, comparisons);
        self
    }

    pub fn with_dont_match(
        mut self,
        table: impl Into<String>,
        field: impl Into<String>,
        scope: AutomapperScope,
    ) -> Self {
        self.dont_match
            .entry(table.into())
            .or_default()
            .entry(field.into())
            .or_default()
            .push(scope);
        self
    }

    pub fn table_synonyms(&self, table: &str) -> &[TableSynonym] {
        self.table_synonyms
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn shortcuts(&self, table: &str) -> &[Shortcut] {
        self.shortcuts
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn field_synonyms(&self, table: &str, field: &str) -> Option<&ScopedComparisons> {
        self.synonyms.get(table).and_then(|fields| fields.get(field))
    }

    /// Whether `field` of `table` is excluded from matching in `scope`
    pub fn is_excluded(&self, table: &str, field: &str, scope: AutomapperScope) -> bool {
        self.dont_match
            .get(table)
            .and_then(|fields| fields.get(field))
            .is_some_and(|scopes| scopes.iter().any(|declared| declared.applies_to(scope)))
    }

    /// Every table name any definition is keyed by
    pub fn referenced_tables(&self) -> BTreeSet<&str> {
        self.table_synonyms
            .keys()
            .chain(self.dont_match.keys())
            .chain(self.shortcuts.keys())
            .chain(self.synonyms.keys())
            .map(String::as_str)
            .collect()
    }
}
