//! Committing candidate paths

use tracing::{debug, trace};

use super::engine::Automapper;
use super::error::{AutomapperError, AutomapperResult};
use super::path::{
    MappingPath, format_reference_item, get_index_from_reference_item, has_reference_items,
    mapping_path_to_string, value_is_reference_item,
};

/// Upper bound on renumbering attempts for a single candidate
const MAX_RENUMBER_ATTEMPTS: usize = 1024;

impl Automapper<'_> {
    /// Record `path + new_segments` as a mapping for a header
    ///
    /// Returns `true` when the header is now exhausted, i.e. it got a mapping
    /// without reference markers and multiple mappings are not allowed.
    pub(super) fn make_mapping(
        &mut self,
        path: &[String],
        new_segments: &[String],
        header_index: usize,
        table_name: &str,
        to_many_reference_number: Option<usize>,
    ) -> AutomapperResult<bool> {
        let header = self.headers[header_index].original.clone();
        let Some(field_name) = new_segments.last() else {
            return Err(AutomapperError::InvalidMappingPath { header });
        };

        let config = &self.params.config;
        let allow_multiple_mappings = config.allow_multiple_mappings;
        if self
            .schema
            .definitions()
            .is_excluded(table_name, field_name, config.scope)
        {
            trace!("Field {}.{} is excluded from matching", table_name, field_name);
            return Ok(false);
        }

        let mut candidate: MappingPath = path.iter().chain(new_segments).cloned().collect();

        if let Some(number) = to_many_reference_number {
            if let Some(segment) = candidate
                .iter_mut()
                .rev()
                .find(|segment| value_is_reference_item(segment.as_str()))
            {
                *segment = format_reference_item(number);
            }
        }

        if self.diverges_from_starting_path(&candidate) {
            return Ok(false);
        }

        let mut attempts = 0;
        while self.path_is_taken(&candidate) {
            attempts += 1;
            if attempts > MAX_RENUMBER_ATTEMPTS || !self.increment_reference_item(&mut candidate) {
                trace!(
                    "Dropping '{}' for header '{}': path already taken",
                    mapping_path_to_string(&candidate),
                    header
                );
                return Ok(false);
            }
        }

        // both passes may reach the same table, so a header can meet its own path again
        if self
            .results
            .get(&header)
            .is_some_and(|paths| paths.contains(&candidate))
        {
            trace!(
                "Header '{}' already maps to {}",
                header,
                mapping_path_to_string(&candidate)
            );
            return Ok(false);
        }

        let is_exhausted = !allow_multiple_mappings && !has_reference_items(&candidate);
        if !allow_multiple_mappings {
            self.headers[header_index].is_mapped = true;
        }

        debug!(
            "Mapped header '{}' to {}",
            header,
            mapping_path_to_string(&candidate)
        );
        self.results.entry(header).or_default().push(candidate);

        Ok(is_exhausted)
    }

    /// Whether the path collides with this run's results or an existing mapping
    fn path_is_taken(&self, candidate: &[String]) -> bool {
        let config = &self.params.config;

        let taken_here = !config.allow_multiple_mappings
            && self
                .results
                .values()
                .flatten()
                .any(|existing| existing.as_slice() == candidate);

        taken_here
            || (config.check_for_existing_mappings
                && self
                    .path_is_mapped
                    .is_some_and(|is_mapped| is_mapped(candidate)))
    }

    /// Bump the rightmost renumberable reference marker; `false` when there is none
    fn increment_reference_item(&self, candidate: &mut MappingPath) -> bool {
        let path_offset = self.params.path_offset;
        let marker = candidate
            .iter_mut()
            .enumerate()
            .rev()
            .find(|(index, segment)| *index >= path_offset && value_is_reference_item(segment.as_str()));

        match marker {
            Some((_, segment)) => {
                let index = get_index_from_reference_item(segment.as_str()).unwrap_or(1);
                *segment = format_reference_item(index + 1);
                true
            }
            None => false,
        }
    }
}
