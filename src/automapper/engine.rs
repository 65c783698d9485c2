//! Breadth-first search over the schema graph

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace, warn};

use super::cache::{CacheKeyInput, ResultsCache};
use super::config::{AutomapperParams, MAX_DEPTH, MapOptions};
use super::error::AutomapperResult;
use super::headers::{HeaderEntry, preprocess_headers};
use super::path::{
    MappingPath, format_reference_item, last_field_segment, relationship_depth,
    value_is_reference_item,
};
use crate::schema::{Cardinality, RelationshipInfo, SchemaGraph};

/// Header → candidate mapping paths, highest priority first
///
/// Keys iterate in sorted header order, not spreadsheet column order; callers
/// that need column order should walk their own header list.
pub type AutomapperResults = BTreeMap<String, Vec<MappingPath>>;

/// Predicate telling whether a path is already claimed by a committed mapping
pub type PathIsMapped<'a> = dyn Fn(&[String]) -> bool + 'a;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SearchMode {
    /// Curated shortcuts and table synonyms, walked from the base table
    ShortcutsAndTableSynonyms,
    /// Field names and synonyms, walked from the starting table
    SynonymsAndMatches,
}

/// A pending table visit
#[derive(Debug, Clone, PartialEq)]
pub(super) struct QueueItem {
    pub table: String,
    pub path: MappingPath,
    pub parent_table: Option<String>,
    /// Cardinality of the relationship that led here
    pub parent_relationship: Option<Cardinality>,
}

impl QueueItem {
    fn root(table: impl Into<String>, path: MappingPath) -> Self {
        Self {
            table: table.into(),
            path,
            parent_table: None,
            parent_relationship: None,
        }
    }
}

/// Proposes mapping paths for spreadsheet headers
///
/// An instance runs one search at a time; concurrent callers should each
/// build their own instance and may share a [`ResultsCache`].
pub struct Automapper<'a> {
    pub(super) schema: &'a SchemaGraph,
    pub(super) params: AutomapperParams,
    pub(super) headers: Vec<HeaderEntry>,
    pub(super) results: AutomapperResults,
    pub(super) path_is_mapped: Option<&'a PathIsMapped<'a>>,
    searched_tables: HashSet<String>,
    /// Tables visited by the shortcuts pass, with the table synonyms they were visited under
    shortcut_visits: HashSet<(String, Vec<String>)>,
    /// Pending visits, indexed by relationship depth
    queue: Vec<Vec<QueueItem>>,
    /// Every `(table, path)` queued during the current pass
    queued: HashSet<(String, MappingPath)>,
    cache: &'a ResultsCache,
}

impl<'a> Automapper<'a> {
    pub fn new(schema: &'a SchemaGraph, params: AutomapperParams) -> Self {
        let headers = preprocess_headers(params.headers.iter().cloned());
        Self {
            schema,
            params,
            headers,
            results: AutomapperResults::new(),
            path_is_mapped: None,
            searched_tables: HashSet::new(),
            shortcut_visits: HashSet::new(),
            queue: Vec::new(),
            queued: HashSet::new(),
            cache: ResultsCache::global(),
        }
    }

    /// Use a private cache instead of the process-wide one
    pub fn with_cache(mut self, cache: &'a ResultsCache) -> Self {
        self.cache = cache;
        self
    }

    /// Predicate consulted when `check_for_existing_mappings` is enabled
    pub fn with_path_is_mapped(mut self, predicate: &'a PathIsMapped<'a>) -> Self {
        self.path_is_mapped = Some(predicate);
        self
    }

    pub fn params(&self) -> &AutomapperParams {
        &self.params
    }

    /// Run both search passes and return the proposed mappings
    pub fn map(&mut self, options: MapOptions) -> AutomapperResult<AutomapperResults> {
        self.reset();

        if self.headers.is_empty() {
            return Ok(AutomapperResults::new());
        }

        // the existing-mapping predicate is opaque, so such runs cannot be keyed
        let cache_key = if self.params.config.check_for_existing_mappings
            || !(options.use_cache || options.commit_to_cache)
        {
            None
        } else {
            Some(self.cache_key()?)
        };

        if options.use_cache && options.commit_to_cache {
            if let Some(cached) = cache_key.as_deref().and_then(|key| self.cache.get(key)) {
                debug!(
                    "Automapper cache hit for {} headers on '{}'",
                    self.headers.len(),
                    self.params.base_table
                );
                return Ok(cached);
            }
        }

        self.find_mappings_driver(SearchMode::ShortcutsAndTableSynonyms)?;
        self.find_mappings_driver(SearchMode::SynonymsAndMatches)?;

        if options.commit_to_cache {
            if let Some(key) = cache_key {
                self.cache.put(key, self.results.clone());
            }
        }

        debug!(
            "Automapper mapped {} of {} headers from '{}'",
            self.results.len(),
            self.headers.len(),
            self.params.base_table
        );

        Ok(self.results.clone())
    }

    fn reset(&mut self) {
        self.results.clear();
        self.searched_tables.clear();
        self.shortcut_visits.clear();
        self.queue.clear();
        self.queued.clear();
        for header in &mut self.headers {
            header.is_mapped = false;
        }
    }

    fn cache_key(&self) -> AutomapperResult<String> {
        let input = CacheKeyInput {
            headers: &self.headers,
            base_table: &self.params.base_table,
            starting_table: self.params.starting_table(),
            starting_path: &self.params.starting_path,
            path_offset: self.params.path_offset,
            scope: self.params.config.scope,
            allow_multiple_mappings: self.params.config.allow_multiple_mappings,
            schema_fingerprint: self.schema.fingerprint(),
        };
        Ok(input.key()?)
    }

    /// Drain the queue level by level until no visit enqueues anything new
    fn find_mappings_driver(&mut self, mode: SearchMode) -> AutomapperResult<()> {
        self.searched_tables.clear();
        self.shortcut_visits.clear();
        self.queue.clear();
        self.queued.clear();

        let seed = match mode {
            SearchMode::ShortcutsAndTableSynonyms => {
                QueueItem::root(self.params.base_table.clone(), Vec::new())
            }
            SearchMode::SynonymsAndMatches => QueueItem::root(
                self.params.starting_table(),
                self.params.starting_path.clone(),
            ),
        };
        debug!("Starting {:?} pass at '{}'", mode, seed.table);
        self.enqueue(seed);

        loop {
            let snapshot = std::mem::take(&mut self.queue);
            if snapshot.iter().all(Vec::is_empty) {
                break;
            }

            for (level, items) in snapshot.into_iter().enumerate() {
                for item in items {
                    if mode == SearchMode::ShortcutsAndTableSynonyms
                        && level != 0
                        && !self.is_consistent_with_starting_path(&item.path)
                    {
                        continue;
                    }
                    self.find_mappings(item, mode)?;
                }
            }
        }

        Ok(())
    }

    fn enqueue(&mut self, item: QueueItem) {
        let level = relationship_depth(&item.path);
        if self.queue.len() <= level {
            self.queue.resize_with(level + 1, Vec::new);
        }
        if self.queued.insert((item.table.clone(), item.path.clone())) {
            trace!("Queued '{}' at depth {}", item.table, level);
            self.queue[level].push(item);
        }
    }

    fn is_pending(&self, level: usize, table: &str) -> bool {
        self.queue
            .get(level)
            .is_some_and(|items| items.iter().any(|item| item.table == table))
    }

    /// Visit one table: match its fields and queue its relationships
    fn find_mappings(&mut self, item: QueueItem, mode: SearchMode) -> AutomapperResult<()> {
        if mode == SearchMode::SynonymsAndMatches {
            if self.searched_tables.contains(&item.table)
                || relationship_depth(&item.path) > MAX_DEPTH
            {
                return Ok(());
            }
            self.searched_tables.insert(item.table.clone());
        }

        let schema = self.schema;
        let Some(table) = schema.table(&item.table) else {
            warn!("Table '{}' is not part of the schema", item.table);
            return Ok(());
        };

        let table_synonyms = self.find_table_synonyms(&item.table, &item.path);

        // a table reached again under the same synonyms has nothing new to offer
        if mode == SearchMode::ShortcutsAndTableSynonyms
            && !self
                .shortcut_visits
                .insert((item.table.clone(), table_synonyms.clone()))
        {
            return Ok(());
        }

        let matching_mode = if table_synonyms.is_empty() {
            mode
        } else {
            SearchMode::SynonymsAndMatches
        };

        if mode == SearchMode::ShortcutsAndTableSynonyms {
            self.handle_shortcuts(table, &item.path)?;
        }

        if let Some(ranks) = schema.tree_ranks(&item.table) {
            // rank names never involve the table name, so they wait for their own pass
            if mode == SearchMode::SynonymsAndMatches {
                self.handle_tree_ranks(table, ranks, &item.path)?;
            }
            return Ok(());
        }

        let table_names = self.table_names(table, &table_synonyms, mode);
        for (field_name, field) in &table.fields {
            match &field.relationship {
                None if matching_mode == SearchMode::SynonymsAndMatches => {
                    self.match_field(table, field_name, field, &item.path, &table_names, mode)?;
                }
                None => {}
                Some(relationship) => {
                    self.queue_relationship(&item, field_name, relationship, mode);
                }
            }
        }

        Ok(())
    }

    fn queue_relationship(
        &mut self,
        item: &QueueItem,
        field_name: &str,
        relationship: &RelationshipInfo,
        mode: SearchMode,
    ) {
        let target = relationship.target_table.as_str();
        if self.schema.table(target).is_none() {
            return;
        }

        let mut child_path = item.path.clone();
        child_path.push(field_name.to_string());
        if relationship.cardinality.is_to_many() {
            child_path.push(format_reference_item(1));
        }

        let depth = relationship_depth(&child_path);
        if depth > MAX_DEPTH {
            return;
        }

        if mode == SearchMode::SynonymsAndMatches
            && (self.searched_tables.contains(target) || self.is_pending(depth, target))
        {
            return;
        }

        // the upload plan cannot express a to-many directly inside another to-many
        if relationship.cardinality.is_to_many()
            && item
                .parent_relationship
                .is_some_and(Cardinality::is_to_many)
        {
            trace!("Skipping nested to-many {}.{}", item.table, field_name);
            return;
        }

        if self.is_circular_relationship(item, field_name, relationship)
            && self.find_table_synonyms(target, &child_path).is_empty()
        {
            trace!("Skipping circular relationship {}.{}", item.table, field_name);
            return;
        }

        self.enqueue(QueueItem {
            table: target.to_string(),
            path: child_path,
            parent_table: Some(item.table.clone()),
            parent_relationship: Some(relationship.cardinality),
        });
    }

    /// Whether `relationship` leads straight back over the relationship used to get here
    fn is_circular_relationship(
        &self,
        item: &QueueItem,
        field_name: &str,
        relationship: &RelationshipInfo,
    ) -> bool {
        let Some(parent_table) = item.parent_table.as_deref() else {
            return false;
        };
        if relationship.target_table != parent_table {
            return false;
        }
        let Some(incoming) = last_field_segment(&item.path) else {
            return false;
        };

        if relationship.foreign_name.as_deref() == Some(incoming) {
            return true;
        }

        self.schema
            .table(parent_table)
            .and_then(|table| table.fields.get(incoming))
            .and_then(|field| field.relationship.as_ref())
            .and_then(|incoming_relationship| incoming_relationship.foreign_name.as_deref())
            == Some(field_name)
    }

    /// Indices of headers still open for matching
    pub(super) fn unmapped_headers(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_mapped)
            .map(|(index, _)| index)
            .collect()
    }

    /// Compare the shared prefix of `path` and the starting path
    pub(super) fn is_consistent_with_starting_path(&self, path: &[String]) -> bool {
        path.iter()
            .zip(&self.params.starting_path)
            .enumerate()
            .all(|(index, (segment, fixed))| self.segments_agree(index, segment, fixed))
    }

    /// Whether a candidate path leaves the starting path the caller fixed
    pub(super) fn diverges_from_starting_path(&self, path: &[String]) -> bool {
        let starting_path = &self.params.starting_path;
        !starting_path.is_empty()
            && (path.len() < starting_path.len() || !self.is_consistent_with_starting_path(path))
    }

    fn segments_agree(&self, index: usize, segment: &str, fixed: &str) -> bool {
        segment == fixed
            || (index >= self.params.path_offset
                && value_is_reference_item(segment)
                && value_is_reference_item(fixed))
    }
}
