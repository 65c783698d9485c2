//! Relationship validation functionality
//!
//! Checks the relationship graph of a schema before the automapper walks it:
//! relationships pointing at unknown tables, inverse fields that do not point
//! back, definitions keyed by unknown tables, and tables the search can never
//! reach from a given base table.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use serde::Serialize;

use super::{ValidationError, ValidationResult};
use crate::schema::SchemaGraph;

/// Relationship whose target table is not part of the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingRelationship {
    pub table: String,
    pub field: String,
    pub target_table: String,
}

/// Relationship whose declared inverse is missing or points elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InverseMismatch {
    pub table: String,
    pub field: String,
    pub foreign_name: String,
}

/// Result of schema validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidationResult {
    pub dangling_relationships: Vec<DanglingRelationship>,
    pub inverse_mismatches: Vec<InverseMismatch>,
    /// Tables named by automapper definitions but absent from the schema
    pub unknown_definition_tables: Vec<String>,
}

impl SchemaValidationResult {
    pub fn is_valid(&self) -> bool {
        self.dangling_relationships.is_empty()
            && self.inverse_mismatches.is_empty()
            && self.unknown_definition_tables.is_empty()
    }
}

type RelationshipGraph = Graph<String, String, Directed>;

/// Schema relationship validator
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Create a new schema validator
    pub fn new() -> Self {
        Self
    }

    /// Run every structural check
    pub fn validate(&self, schema: &SchemaGraph) -> SchemaValidationResult {
        let mut result = SchemaValidationResult::default();

        for table in schema.tables() {
            for (field_name, field) in &table.fields {
                let Some(relationship) = &field.relationship else {
                    continue;
                };

                let Some(target) = schema.table(&relationship.target_table) else {
                    result.dangling_relationships.push(DanglingRelationship {
                        table: table.name.clone(),
                        field: field_name.clone(),
                        target_table: relationship.target_table.clone(),
                    });
                    continue;
                };

                let Some(foreign_name) = &relationship.foreign_name else {
                    continue;
                };
                let points_back = target
                    .fields
                    .get(foreign_name)
                    .and_then(|inverse| inverse.relationship.as_ref())
                    .is_some_and(|inverse| inverse.target_table == table.name);
                if !points_back {
                    result.inverse_mismatches.push(InverseMismatch {
                        table: table.name.clone(),
                        field: field_name.clone(),
                        foreign_name: foreign_name.clone(),
                    });
                }
            }
        }

        result.unknown_definition_tables = schema
            .definitions()
            .referenced_tables()
            .into_iter()
            .filter(|name| schema.table(name).is_none())
            .map(str::to_string)
            .collect();

        result
    }

    /// Tables that cannot be reached from `base_table` by following relationships
    ///
    /// The automapper never proposes paths into these tables for that base.
    pub fn unreachable_tables(
        &self,
        schema: &SchemaGraph,
        base_table: &str,
    ) -> ValidationResult<Vec<String>> {
        let (graph, node_map) = self.build_graph(schema);
        let Some(&start) = node_map.get(base_table) else {
            return Err(ValidationError::UnknownTable(base_table.to_string()));
        };

        let reachable = self.reachable_from(&graph, start);
        Ok(schema
            .table_names()
            .filter(|name| {
                node_map
                    .get(*name)
                    .is_none_or(|node| !reachable.contains(node))
            })
            .map(str::to_string)
            .collect())
    }

    /// Build a directed graph with one node per table and one edge per relationship
    fn build_graph(&self, schema: &SchemaGraph) -> (RelationshipGraph, HashMap<String, NodeIndex>) {
        let mut graph = RelationshipGraph::new();
        let mut node_map = HashMap::new();

        for name in schema.table_names() {
            node_map
                .entry(name.to_string())
                .or_insert_with(|| graph.add_node(name.to_string()));
        }

        for table in schema.tables() {
            let source = node_map[&table.name];
            for (field_name, field) in &table.fields {
                let Some(relationship) = &field.relationship else {
                    continue;
                };
                // dangling targets are reported by `validate`
                if let Some(&target) = node_map.get(&relationship.target_table) {
                    graph.add_edge(source, target, field_name.clone());
                }
            }
        }

        (graph, node_map)
    }

    fn reachable_from(&self, graph: &RelationshipGraph, start: NodeIndex) -> HashSet<NodeIndex> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        visited.insert(start);
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            for neighbor in graph.neighbors(node) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited
    }
}
