use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures")
}

fn temp_out_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("datafill_cli_{label}_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn datafill(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_datafill"))
        .args(args)
        .env("DATAFILL_LOG", "warn")
        .output()
        .expect("spawn datafill")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

#[test]
fn generate_creates_run_directory() {
    let out_dir = temp_out_dir("generate");
    let ddl = fixtures().join("library.postgres.sql");
    let config = fixtures().join("library.config.json");

    let output = datafill(&[
        "generate",
        path_str(&ddl),
        "--dialect",
        "postgres",
        "--config",
        path_str(&config),
        "--out-dir",
        path_str(&out_dir),
        "--format",
        "sql",
        "--format",
        "csv",
        "--verify",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let runs: Vec<PathBuf> = fs::read_dir(&out_dir)
        .expect("read out dir")
        .map(|entry| entry.expect("entry").path())
        .collect();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    let name = run.file_name().and_then(|n| n.to_str()).expect("run name");
    assert!(name.contains("__run_"), "{name}");

    for file in [
        "config.json",
        "logs.ndjson",
        "generation_report.json",
        "data.sql",
        "Books.csv",
        "metrics.json",
        "report.md",
    ] {
        assert!(run.join(file).is_file(), "missing {file}");
    }

    let sql = fs::read_to_string(run.join("data.sql")).expect("read sql");
    assert!(sql.starts_with("INSERT INTO Authors"));

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(run.join("generation_report.json")).expect("read report"),
    )
    .expect("parse report");
    assert_eq!(report["seed"], 42);

    let logs = fs::read_to_string(run.join("logs.ndjson")).expect("read logs");
    assert!(logs.contains("run_started"));
}

#[test]
fn check_rejects_empty_pool() {
    let dir = temp_out_dir("check");
    let config = dir.join("bad.json");
    fs::write(
        &config,
        r#"{ "predefined_values": { "Authors": { "sex": [] } } }"#,
    )
    .expect("write config");
    let ddl = fixtures().join("library.postgres.sql");

    let output = datafill(&["check", path_str(&ddl), "--config", path_str(&config)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "{stderr}");
}

#[test]
fn parse_writes_schema_json() {
    let dir = temp_out_dir("parse");
    let out = dir.join("schema.json");
    let ddl = fixtures().join("shop.mysql.sql");

    let output = datafill(&[
        "parse",
        path_str(&ddl),
        "--dialect",
        "mysql",
        "--out",
        path_str(&out),
    ]);
    assert!(output.status.success());
    let schema: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out).expect("read schema")).expect("parse json");
    assert_eq!(schema["dialect"], "mysql");
    assert!(schema["tables"].as_array().is_some_and(|tables| !tables.is_empty()));
}

#[test]
fn missing_ddl_fails() {
    let output = datafill(&["parse", "/nonexistent/schema.sql"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read"));
}
