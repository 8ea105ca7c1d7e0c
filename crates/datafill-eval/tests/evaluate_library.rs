use std::fs;
use std::path::{Path, PathBuf};

use datafill_core::{Dialect, Schema};
use datafill_eval::{EvaluateOptions, collect_schema_metrics, evaluate_dataset, write_outputs};
use datafill_generate::{GeneratedValue, generate};
use datafill_parse::parse_schema;
use datafill_plan::GenerationConfig;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
}

fn library_schema() -> Schema {
    let ddl = fs::read_to_string(fixtures().join("library.postgres.sql")).expect("read ddl");
    parse_schema(&ddl, Dialect::Postgres).expect("parse ddl")
}

fn library_config() -> GenerationConfig {
    let contents =
        fs::read_to_string(fixtures().join("library.config.json")).expect("read config");
    serde_json::from_str(&contents).expect("parse config")
}

fn temp_out_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("datafill_eval_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn generated_library_has_no_violations() {
    let schema = library_schema();
    let config = library_config();
    let result = generate(&schema, &config).expect("generate library");

    let options = EvaluateOptions {
        strict: true,
        ..EvaluateOptions::default()
    }
    .expect_config(&config, &schema);
    let evaluation = evaluate_dataset(&schema, &result.dataset, &options).expect("evaluate");

    assert!(evaluation.is_clean(), "violations: {:?}", evaluation.violations);
    assert!(evaluation.violations.is_empty());

    let constraints = &evaluation.metrics.constraints;
    assert_eq!(constraints.pk.checked, 6);
    assert_eq!(constraints.fk.checked, 5);
    assert_eq!(constraints.unique.checked, 4);
    assert_eq!(constraints.check.not_evaluated, 6);
    assert_eq!(evaluation.metrics.seed, Some(42));

    for table in &evaluation.metrics.tables {
        assert_eq!(table.rows_expected, Some(table.rows_found), "{}", table.table);
    }
    assert_eq!(evaluation.metrics.table("loans").map(|t| t.rows_found), Some(40));
    assert!(
        evaluation
            .metrics
            .warnings
            .iter()
            .all(|warning| warning.code == "check_not_evaluated")
    );
}

#[test]
fn broken_reference_is_reported() {
    let schema = library_schema();
    let config = library_config();
    let mut result = generate(&schema, &config).expect("generate library");

    let books = result
        .dataset
        .tables
        .iter_mut()
        .find(|table| table.name == "Books")
        .expect("books");
    books.rows[3].set("author_id", GeneratedValue::Int(999));

    let evaluation =
        evaluate_dataset(&schema, &result.dataset, &EvaluateOptions::default()).expect("evaluate");
    assert_eq!(evaluation.metrics.constraints.fk.violations, 1);
    let violation = evaluation
        .violations
        .iter()
        .find(|violation| violation.code == "foreign_key")
        .expect("fk violation");
    assert_eq!(violation.path, "Books -> Authors");
    assert_eq!(violation.row_index, Some(4));
    assert_eq!(violation.example.as_deref(), Some("999"));
}

#[test]
fn missing_table_is_a_warning() {
    let schema = library_schema();
    let mut result = generate(&schema, &library_config()).expect("generate library");
    result.dataset.tables.retain(|table| table.name != "Penalties");

    let evaluation =
        evaluate_dataset(&schema, &result.dataset, &EvaluateOptions::default()).expect("evaluate");
    assert!(
        evaluation
            .metrics
            .warnings
            .iter()
            .any(|warning| warning.code == "missing_table" && warning.path == "Penalties")
    );
    assert_eq!(evaluation.metrics.table("Penalties").map(|t| t.rows_found), Some(0));
}

#[test]
fn outputs_are_written_to_disk() {
    let schema = library_schema();
    let result = generate(&schema, &library_config()).expect("generate library");
    let evaluation =
        evaluate_dataset(&schema, &result.dataset, &EvaluateOptions::default()).expect("evaluate");

    let dir = temp_out_dir("outputs");
    let (metrics_path, report_path) = write_outputs(&dir, &evaluation, 20).expect("write outputs");

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(metrics_path).expect("read metrics"))
            .expect("parse metrics");
    assert_eq!(metrics["metrics_version"], "0.1");
    assert_eq!(metrics["dialect"], "postgres");
    assert_eq!(metrics["constraints"]["fk"]["violations"], 0);

    let report = fs::read_to_string(report_path).expect("read report");
    assert!(report.contains("## Constraint summary"));
    assert!(report.contains("| Books | - | 20 |"));
}

#[test]
fn library_schema_metrics() {
    let metrics = collect_schema_metrics(&library_schema());

    assert_eq!(metrics.counts.tables, 6);
    assert_eq!(metrics.counts.columns, 29);
    assert_eq!(metrics.counts.constraints.primary_keys, 6);
    assert_eq!(metrics.counts.constraints.foreign_keys, 5);
    assert_eq!(metrics.counts.constraints.unique, 4);
    assert_eq!(metrics.counts.constraints.checks, 6);
    assert_eq!(metrics.coverage.tables_with_pk_pct, 1.0);
    assert_eq!(metrics.fk_graph.edges, 5);
    assert!(!metrics.fk_graph.has_cycle);
    assert_eq!(
        metrics.fk_graph.topo_order,
        Some(
            ["Authors", "Categories", "Books", "Members", "Loans", "Penalties"]
                .iter()
                .map(|name| name.to_string())
                .collect()
        )
    );
    assert!(metrics.warnings.is_empty());
}
