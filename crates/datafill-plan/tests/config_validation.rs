use std::fs;
use std::path::{Path, PathBuf};

use datafill_core::Dialect;
use datafill_plan::{
    ConfigScope, GenerationConfig, config_json_schema, validate_config,
    validate_config_against_schema,
};
use serde_json::json;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
}

fn load_json(path: &Path) -> serde_json::Value {
    let contents =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse json")
}

fn library_schema() -> datafill_core::Schema {
    let ddl = fs::read_to_string(fixtures().join("library.postgres.sql")).expect("read ddl");
    datafill_parse::parse_schema(&ddl, Dialect::Postgres).expect("parse ddl")
}

#[test]
fn library_config_validates_without_warnings() {
    let config_json = load_json(&fixtures().join("library.config.json"));
    let schema = library_schema();

    let validated = validate_config(&config_json, &schema).expect("config should validate");
    assert!(
        validated.warnings.is_empty(),
        "unexpected warnings: {:?}",
        validated.warnings
    );

    let config = validated.config;
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.rows_for("books"), 20);
    let (pool, scope) = config.pool_for("Categories", "category_name").unwrap();
    assert_eq!(pool.len(), 8);
    assert_eq!(scope, ConfigScope::Table("Categories".to_string()));
}

#[test]
fn schema_aware_checks_warn_on_unknown_names() {
    let schema = library_schema();
    let config: GenerationConfig = serde_json::from_value(json!({
        "predefined_values": {
            "global": { "nickname": ["x"] },
            "Shelves": { "label": ["a"] },
            "Books": { "author_id": ["1"] }
        },
        "num_rows_per_table": { "Readers": 3 },
        "self_reference_offsets": { "Loans": 1 }
    }))
    .unwrap();

    let report = validate_config_against_schema(&config, &schema);
    assert!(report.is_ok());
    let codes: Vec<(&str, &str)> = report
        .warnings
        .iter()
        .map(|issue| (issue.code.as_str(), issue.path.as_str()))
        .collect();
    assert_eq!(
        codes,
        vec![
            ("ignored_for_key_column", "/predefined_values/Books/author_id"),
            ("unknown_table", "/predefined_values/Shelves"),
            ("unknown_column", "/predefined_values/global/nickname"),
            ("unknown_table", "/num_rows_per_table/Readers"),
            ("offset_without_self_reference", "/self_reference_offsets/Loans"),
        ]
    );
}

#[test]
fn small_pool_on_unique_column_is_flagged() {
    let schema = library_schema();
    let config: GenerationConfig = serde_json::from_value(json!({
        "predefined_values": { "Categories": { "category_name": ["A", "B"] } },
        "num_rows_per_table": { "Categories": 3 }
    }))
    .unwrap();

    let report = validate_config_against_schema(&config, &schema);
    assert!(report.has_code("pool_smaller_than_rows"));
}

#[test]
fn published_schema_lists_config_fields() {
    let schema = serde_json::to_value(config_json_schema()).unwrap();
    let properties = schema["properties"].as_object().expect("properties");
    for field in [
        "predefined_values",
        "column_type_mappings",
        "num_rows_per_table",
        "default_num_rows",
        "guess_enabled",
        "guess_threshold",
        "seed",
        "self_reference_offsets",
        "max_attempts_row",
    ] {
        assert!(properties.contains_key(field), "missing {field}");
    }
    assert_eq!(schema["additionalProperties"], json!(false));
}
