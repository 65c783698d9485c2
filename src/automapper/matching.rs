//! Header matching for a single table visit
//!
//! Headers are compared in their normalized forms (see [`super::headers`]).
//! A field is matched by its name, its friendly name and any
//! `formattedHeaderFieldSynonym` entries, in three shapes:
//!
//! ```text
//! 1. <field>                  "Last Name"
//! 2. <field> <table>          "Last Name Collector"
//! 3. <table> [n] <field> [n]  "Collector Last Name", "Collector 2 Last Name"
//! ```
//!
//! Curated definitions (shortcuts and field synonyms) are compared first.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

use super::engine::{Automapper, SearchMode};
use super::error::AutomapperResult;
use super::headers::{HeaderEntry, to_final_form, to_lowercase_form, to_stripped_form};
use super::path::{format_tree_rank, strip_reference_items, value_is_tree_rank};
use crate::schema::{FieldInfo, HeaderComparisons, Table, TreeRank};

/// One spelling of a field, in every comparison form
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldLabel {
    lowercase: String,
    stripped: String,
    final_form: String,
}

impl FieldLabel {
    fn new(value: &str) -> Self {
        Self {
            lowercase: to_lowercase_form(value),
            stripped: to_stripped_form(value),
            final_form: to_final_form(value),
        }
    }

    fn is_empty(&self) -> bool {
        self.stripped.is_empty()
    }

    /// Shape 1: any form of the label equals the same form of the header
    fn matches_header(&self, header: &HeaderEntry) -> bool {
        self.lowercase == header.lowercase
            || self.stripped == header.stripped
            || self.final_form == header.final_form
    }
}

fn field_labels(field_name: &str, field: &FieldInfo, comparisons: &HeaderComparisons) -> Vec<FieldLabel> {
    let mut labels: Vec<FieldLabel> = Vec::new();
    let spellings = [field_name, field.friendly_name(field_name)]
        .into_iter()
        .chain(comparisons.formatted_header_field_synonym.iter().map(String::as_str));
    for spelling in spellings {
        let label = FieldLabel::new(spelling);
        if !label.is_empty() && !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// A standalone reference number such as `2` or `#2`
static REFERENCE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#?(\d+)$").unwrap());

/// Reference index written into a header like `Collector 2 Last Name` or `Collector Last Name 2`
///
/// `table_name` and `field_label` are stripped forms, so their words are single-space separated.
fn extract_reference_index(lowercase_header: &str, table_name: &str, field_label: &str) -> Option<usize> {
    let words: Vec<&str> = lowercase_header.split_whitespace().collect();
    let table_field = format!("{} {}", table_name, field_label);

    words.iter().enumerate().find_map(|(position, word)| {
        let index = REFERENCE_TOKEN
            .captures(word)?
            .get(1)?
            .as_str()
            .parse::<usize>()
            .ok()
            .filter(|index| *index > 0)?;
        let before = words[..position].join(" ");
        let after = words[position + 1..].join(" ");
        let is_match = (before == table_name && after == field_label)
            || (after.is_empty() && before == table_field);
        is_match.then_some(index)
    })
}

impl Automapper<'_> {
    /// Stripped table synonyms whose mapping path filter matches the end of `path`
    pub(super) fn find_table_synonyms(&self, table_name: &str, path: &[String]) -> Vec<String> {
        let filtered_path = strip_reference_items(path);
        let mut synonyms: Vec<String> = Vec::new();
        for synonym in self.schema.definitions().table_synonyms(table_name) {
            if !filtered_path.ends_with(&synonym.mapping_path_filter) {
                continue;
            }
            for header in &synonym.headers {
                let stripped = to_stripped_form(header);
                if !stripped.is_empty() && !synonyms.contains(&stripped) {
                    synonyms.push(stripped);
                }
            }
        }
        synonyms
    }

    /// Names a table is matched by; the shortcuts pass only uses its synonyms
    pub(super) fn table_names(&self, table: &Table, table_synonyms: &[String], mode: SearchMode) -> Vec<String> {
        let mut table_names = table_synonyms.to_vec();
        if mode == SearchMode::ShortcutsAndTableSynonyms {
            return table_names;
        }
        for name in [table.name.as_str(), table.friendly_name()] {
            let stripped = to_stripped_form(name);
            if !stripped.is_empty() && !table_names.contains(&stripped) {
                table_names.push(stripped);
            }
        }
        table_names
    }

    /// Map every unmapped header matched by a curated definition
    pub(super) fn handle_definition_comparison(
        &mut self,
        path: &[String],
        comparisons: &HeaderComparisons,
        new_segments: &[String],
        table_name: &str,
    ) -> AutomapperResult<()> {
        if comparisons.is_empty() {
            return Ok(());
        }

        for index in self.unmapped_headers() {
            let Some(mode) = comparisons.matching_mode(&self.headers[index].lowercase) else {
                continue;
            };
            trace!(
                "Header '{}' matched {:?} definition on {}",
                self.headers[index].original, mode, table_name
            );
            self.make_mapping(path, new_segments, index, table_name, None)?;
        }

        Ok(())
    }

    pub(super) fn handle_shortcuts(&mut self, table: &Table, path: &[String]) -> AutomapperResult<()> {
        let schema = self.schema;
        let scope = self.params.config.scope;
        let current_rank = path.last().filter(|segment| value_is_tree_rank(segment));

        for shortcut in schema.definitions().shortcuts(&table.name) {
            let mapping_path = shortcut.mapping_path.as_slice();

            // a path sitting on a rank only continues shortcuts for that rank
            let new_segments = match (current_rank, mapping_path.first()) {
                (Some(rank), Some(first)) if value_is_tree_rank(first) => {
                    if rank != first {
                        continue;
                    }
                    &mapping_path[1..]
                }
                _ => mapping_path,
            };

            if new_segments.is_empty() {
                warn!("Ignoring shortcut on '{}' with an empty mapping path", table.name);
                continue;
            }

            let comparisons = shortcut.headers.for_scope(scope);
            self.handle_definition_comparison(path, &comparisons, new_segments, &table.name)?;
        }

        Ok(())
    }

    /// Match a literal field against every unmapped header
    pub(super) fn match_field(
        &mut self,
        table: &Table,
        field_name: &str,
        field: &FieldInfo,
        path: &[String],
        table_names: &[String],
        mode: SearchMode,
    ) -> AutomapperResult<()> {
        let schema = self.schema;
        let new_segments = [field_name.to_string()];
        let comparisons = schema
            .definitions()
            .field_synonyms(&table.name, field_name)
            .map(|synonyms| synonyms.for_scope(self.params.config.scope))
            .unwrap_or_default();

        self.handle_definition_comparison(path, &comparisons, &new_segments, &table.name)?;

        let labels = field_labels(field_name, field, &comparisons);

        for index in self.unmapped_headers() {
            self.match_header(index, path, &new_segments, &table.name, &labels, table_names, mode)?;
        }

        Ok(())
    }

    /// Try each shape in turn until a mapping exhausts the header
    ///
    /// The shortcuts pass only tries the shapes that name the table, so a bare
    /// field name is left for the shorter paths of the next pass.
    #[allow(clippy::too_many_arguments)]
    fn match_header(
        &mut self,
        index: usize,
        path: &[String],
        new_segments: &[String],
        table_name: &str,
        labels: &[FieldLabel],
        table_names: &[String],
        mode: SearchMode,
    ) -> AutomapperResult<bool> {
        let header = self.headers[index].clone();

        if mode == SearchMode::SynonymsAndMatches
            && labels.iter().any(|label| label.matches_header(&header))
            && self.make_mapping(path, new_segments, index, table_name, None)?
        {
            return Ok(true);
        }

        for table_form in table_names {
            for label in labels {
                if header.stripped == format!("{} {}", label.stripped, table_form) {
                    if self.make_mapping(path, new_segments, index, table_name, None)? {
                        return Ok(true);
                    }
                    continue;
                }

                if !header.stripped.starts_with(table_form.as_str()) {
                    continue;
                }

                let committed = match extract_reference_index(&header.lowercase, table_form, &label.stripped) {
                    Some(reference) => {
                        self.make_mapping(path, new_segments, index, table_name, Some(reference))?
                    }
                    None if header.stripped == format!("{} {}", table_form, label.stripped) => {
                        self.make_mapping(path, new_segments, index, table_name, None)?
                    }
                    None => false,
                };
                if committed {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Match `<rank>` and `<rank> <field>` headers on a tree table
    pub(super) fn handle_tree_ranks(
        &mut self,
        table: &Table,
        ranks: &[TreeRank],
        path: &[String],
    ) -> AutomapperResult<()> {
        let current_rank = path
            .last()
            .filter(|segment| value_is_tree_rank(segment))
            .cloned();
        let literal_fields: Vec<(&String, &FieldInfo)> = table
            .fields
            .iter()
            .filter(|(_, field)| !field.is_relationship())
            .collect();

        for rank in ranks {
            let rank_marker = format_tree_rank(&rank.name);
            if current_rank.as_ref().is_some_and(|current| *current != rank_marker) {
                continue;
            }
            let stripped_rank = to_stripped_form(&rank.name);

            for (field_name, field) in &literal_fields {
                let new_segments = match current_rank {
                    Some(_) => vec![field_name.to_string()],
                    None => vec![rank_marker.clone(), field_name.to_string()],
                };
                let candidates = [
                    format!("{} {}", stripped_rank, to_stripped_form(field.friendly_name(field_name))),
                    format!("{} {}", stripped_rank, field_name.to_lowercase()),
                ];

                for index in self.unmapped_headers() {
                    let stripped = &self.headers[index].stripped;
                    let is_match = (field_name.as_str() == "name" && *stripped == stripped_rank)
                        || candidates.iter().any(|candidate| candidate == stripped);
                    if is_match {
                        self.make_mapping(path, &new_segments, index, &table.name, None)?;
                    }
                }
            }
        }

        Ok(())
    }
}
