//! Schema loading and validation tests

use std::io::Write;

use collection_automapper::schema::{
    AutomapperDefinitions, AutomapperScope, Cardinality, FieldInfo, SchemaDescription,
    SchemaError, SchemaGraph, Table,
};
use collection_automapper::validation::{SchemaValidator, ValidationError};
use serde_json::json;
use tempfile::NamedTempFile;

fn schema_json() -> serde_json::Value {
    json!({
        "tables": [
            {
                "name": "collectionobject",
                "label": "Collection Object",
                "fields": {
                    "catalognumber": {"label": "Catalog Number"},
                    "cataloger": {
                        "label": "Cataloger",
                        "relationship": {"targetTable": "agent", "cardinality": "many-to-one"}
                    }
                }
            },
            {
                "name": "agent",
                "label": "Agent",
                "fields": {"lastname": {"label": "Last Name"}}
            },
            {
                "name": "taxon",
                "fields": {"name": {"label": "Name"}}
            }
        ],
        "treeRanks": {
            "taxon": [{"name": "Kingdom", "isRequired": true}, {"name": "Species"}]
        },
        "definitions": {
            "synonyms": {
                "agent": {"lastname": {"all": {"string": ["surname"]}}}
            }
        }
    })
}

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

mod loading_tests {
    use super::*;

    #[test]
    fn test_load_json_file() {
        let file = write_temp(".json", &schema_json().to_string());
        let schema = SchemaGraph::load(file.path()).unwrap();

        assert_eq!(schema.table_names().count(), 3);
        assert!(schema.is_tree_table("taxon"));
        assert_eq!(schema.tree_ranks("taxon").unwrap().len(), 2);
        assert!(schema.tree_ranks("taxon").unwrap()[0].is_required);

        let cataloger = &schema.table("collectionobject").unwrap().fields["cataloger"];
        let relationship = cataloger.relationship.as_ref().unwrap();
        assert_eq!(relationship.target_table, "agent");
        assert_eq!(relationship.cardinality, Cardinality::ManyToOne);
        assert!(
            schema
                .definitions()
                .field_synonyms("agent", "lastname")
                .is_some()
        );
    }

    #[test]
    fn test_load_yaml_file() {
        let yaml = serde_yaml::to_string(&schema_json()).unwrap();
        let file = write_temp(".yaml", &yaml);
        let schema = SchemaGraph::load(file.path()).unwrap();

        let from_json = SchemaGraph::from_json_value(schema_json()).unwrap();
        assert_eq!(schema.fingerprint(), from_json.fingerprint());
        assert_eq!(
            schema.table("taxon").unwrap().friendly_name(),
            "taxon"
        );
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".csv", "tables: []");
        assert!(matches!(
            SchemaGraph::load(file.path()),
            Err(SchemaError::UnsupportedFormat(ext)) if ext == "csv"
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = SchemaGraph::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(SchemaError::SchemaReadError { .. })));
    }

    #[test]
    fn test_invalid_definition_regex() {
        let mut value = schema_json();
        value["definitions"]["synonyms"]["agent"]["lastname"]["all"] = json!({"regex": ["(["]});
        assert!(matches!(
            SchemaGraph::from_json_value(value),
            Err(SchemaError::JsonError(_))
        ));
    }

    #[test]
    fn test_malformed_cardinality() {
        let mut value = schema_json();
        value["tables"][0]["fields"]["cataloger"]["relationship"]["cardinality"] =
            json!("some-to-few");
        assert!(SchemaGraph::from_json_str(&value.to_string()).is_err());
    }
}

mod validation_tests {
    use super::*;

    fn broken_schema() -> SchemaGraph {
        let description = SchemaDescription::new()
            .with_table(
                Table::new("collectionobject", "Collection Object")
                    .with_field(
                        "preparations",
                        FieldInfo::relationship(
                            "Preparations",
                            "preparation",
                            Cardinality::OneToMany,
                            Some("collectionobject"),
                        ),
                    )
                    .with_field(
                        "cataloger",
                        FieldInfo::relationship(
                            "Cataloger",
                            "agent",
                            Cardinality::ManyToOne,
                            Some("catalogedobjects"),
                        ),
                    ),
            )
            .with_table(Table::new("agent", "Agent").with_field("lastname", FieldInfo::literal("Last Name")))
            .with_table(Table::new("storage", "Storage").with_field("name", FieldInfo::literal("Name")))
            .with_definitions(AutomapperDefinitions::new().with_dont_match(
                "accession",
                "number",
                AutomapperScope::All,
            ));

        SchemaGraph::from_description(description).unwrap()
    }

    #[test]
    fn test_reports_structural_problems() {
        let report = SchemaValidator::new().validate(&broken_schema());

        assert!(!report.is_valid());
        assert_eq!(report.dangling_relationships.len(), 1);
        assert_eq!(report.dangling_relationships[0].field, "preparations");
        assert_eq!(report.dangling_relationships[0].target_table, "preparation");

        assert_eq!(report.inverse_mismatches.len(), 1);
        assert_eq!(report.inverse_mismatches[0].table, "collectionobject");
        assert_eq!(report.inverse_mismatches[0].foreign_name, "catalogedobjects");

        assert_eq!(report.unknown_definition_tables, vec!["accession"]);
    }

    #[test]
    fn test_valid_schema() {
        let schema = SchemaGraph::from_json_value(schema_json()).unwrap();
        assert!(SchemaValidator::new().validate(&schema).is_valid());
    }

    #[test]
    fn test_unreachable_tables() {
        let validator = SchemaValidator::new();
        let schema = broken_schema();

        let unreachable = validator
            .unreachable_tables(&schema, "collectionobject")
            .unwrap();
        assert_eq!(unreachable, vec!["storage"]);

        let unreachable = validator.unreachable_tables(&schema, "agent").unwrap();
        assert_eq!(unreachable, vec!["collectionobject", "storage"]);
    }

    #[test]
    fn test_unreachable_from_unknown_table() {
        let result = SchemaValidator::new().unreachable_tables(&broken_schema(), "loan");
        assert!(matches!(result, Err(ValidationError::UnknownTable(name)) if name == "loan"));
    }
}
