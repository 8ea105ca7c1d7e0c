use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use datafill_core::{Constraint, ForeignKey, Schema, Table};
use datafill_generate::{GeneratedDataset, GeneratedValue, Row};

use crate::errors::EvalError;
use crate::metrics::{
    ColumnStats, ConstraintSummary, METRICS_VERSION, MetricsReport, PerformanceMetrics,
    TableMetrics, WarningItem,
};
use crate::model::{EvaluateOptions, EvaluationResult, Violation};
use crate::report::render_report;

/// Check a generated dataset against the constraints of its schema.
///
/// Counters in the metrics cover every row; the returned violation list
/// keeps at most `max_examples` samples per constraint.
pub fn evaluate_dataset(
    schema: &Schema,
    dataset: &GeneratedDataset,
    options: &EvaluateOptions,
) -> Result<EvaluationResult, EvalError> {
    let start = Instant::now();

    for generated in &dataset.tables {
        if schema.table(&generated.name).is_none() {
            return Err(EvalError::InvalidDataset(format!(
                "table '{}' not found in schema",
                generated.name
            )));
        }
    }

    let mut warnings = Vec::new();
    let mut sink = ViolationSink::new(options.max_examples);
    let mut summary = ConstraintSummary::default();
    let mut tables = Vec::with_capacity(schema.tables.len());
    let mut column_stats = Vec::new();

    for table in &schema.tables {
        let generated = dataset.table(&table.name);
        let rows = generated.map(|generated| generated.rows.as_slice()).unwrap_or(&[]);
        let rows_expected = options.expected_for(&table.name);
        tables.push(TableMetrics {
            table: table.name.clone(),
            rows_found: rows.len() as u64,
            rows_expected,
        });

        if generated.is_none() {
            warnings.push(WarningItem {
                code: "missing_table".to_string(),
                path: table.name.clone(),
                message: format!("table '{}' is not in the dataset", table.name),
                hint: Some("generate every table of the schema".to_string()),
            });
            continue;
        }
        if let Some(expected) = rows_expected
            && expected != rows.len() as u64
        {
            warnings.push(WarningItem {
                code: "row_count_mismatch".to_string(),
                path: table.name.clone(),
                message: format!("expected {expected} row(s), found {}", rows.len()),
                hint: None,
            });
        }

        collect_column_stats(table, rows, &mut column_stats);
        evaluate_not_null(table, rows, &mut sink, &mut summary);
        evaluate_unique(table, rows, &mut sink, &mut summary);
        evaluate_foreign_keys(table, rows, dataset, &mut warnings, &mut sink, &mut summary);
        evaluate_checks(table, &mut warnings, &mut summary);
    }

    let mut violations = sink.into_samples();
    sort_warnings(&mut warnings);
    sort_violations(&mut violations);

    let metrics = MetricsReport {
        metrics_version: METRICS_VERSION.to_string(),
        schema_version: schema.schema_version.clone(),
        dialect: schema.dialect,
        seed: options.seed,
        tables,
        column_stats,
        constraints: summary,
        warnings,
        performance: PerformanceMetrics {
            validate_ms: start.elapsed().as_millis(),
        },
    };

    let total = metrics.total_violations();
    if total > 0 {
        warn!(
            violations = total,
            not_null = metrics.constraints.not_null.violations,
            pk = metrics.constraints.pk.violations,
            unique = metrics.constraints.unique.violations,
            fk = metrics.constraints.fk.violations,
            "dataset evaluated with violations"
        );
    } else {
        info!(
            tables = metrics.tables.len(),
            checks_not_evaluated = metrics.constraints.check.not_evaluated,
            "dataset evaluated"
        );
    }

    if options.strict && total > 0 {
        return Err(EvalError::Violations(total));
    }

    Ok(EvaluationResult {
        metrics,
        violations,
    })
}

/// Write `metrics.json` and `report.md` into `dir`.
pub fn write_outputs(
    dir: &Path,
    result: &EvaluationResult,
    max_examples: usize,
) -> Result<(PathBuf, PathBuf), EvalError> {
    std::fs::create_dir_all(dir)?;

    let metrics_path = dir.join("metrics.json");
    std::fs::write(&metrics_path, serde_json::to_vec_pretty(&result.metrics)?)?;

    let report_path = dir.join("report.md");
    let report = render_report(&result.metrics, &result.violations, max_examples);
    std::fs::write(&report_path, report.as_bytes())?;

    Ok((metrics_path, report_path))
}

/// Collects violation samples, capped per constraint path and code.
struct ViolationSink {
    max_examples: usize,
    samples: Vec<Violation>,
    per_constraint: HashMap<(String, String), usize>,
}

impl ViolationSink {
    fn new(max_examples: usize) -> Self {
        Self {
            max_examples,
            samples: Vec::new(),
            per_constraint: HashMap::new(),
        }
    }

    fn push(&mut self, violation: Violation) {
        let count = self
            .per_constraint
            .entry((violation.path.clone(), violation.code.clone()))
            .or_insert(0);
        if *count < self.max_examples {
            *count += 1;
            self.samples.push(violation);
        }
    }

    fn into_samples(self) -> Vec<Violation> {
        self.samples
    }
}

fn collect_column_stats(table: &Table, rows: &[Row], stats: &mut Vec<ColumnStats>) {
    for column in &table.columns {
        stats.push(ColumnStats {
            table: table.name.clone(),
            column: column.name.clone(),
            null_count: rows
                .iter()
                .filter(|row| is_null(row, &column.name))
                .count() as u64,
        });
    }
}

fn evaluate_not_null(
    table: &Table,
    rows: &[Row],
    sink: &mut ViolationSink,
    summary: &mut ConstraintSummary,
) {
    for column in table.columns.iter().filter(|column| !column.is_nullable) {
        summary.not_null.checked += 1;
        let path = format!("{}.{}", table.name, column.name);
        for (row_idx, row) in rows.iter().enumerate() {
            if is_null(row, &column.name) {
                summary.not_null.violations += 1;
                sink.push(Violation {
                    code: "not_null".to_string(),
                    path: path.clone(),
                    message: "null value in NOT NULL column".to_string(),
                    row_index: Some(row_idx as u64 + 1),
                    example: None,
                });
            }
        }
    }
}

fn evaluate_unique(
    table: &Table,
    rows: &[Row],
    sink: &mut ViolationSink,
    summary: &mut ConstraintSummary,
) {
    for constraint in &table.constraints {
        match constraint {
            Constraint::PrimaryKey(pk) => {
                summary.pk.checked += 1;
                summary.pk.violations +=
                    check_unique_columns("primary_key", table, &pk.columns, rows, sink);
            }
            Constraint::Unique(unique) => {
                summary.unique.checked += 1;
                summary.unique.violations +=
                    check_unique_columns("unique", table, &unique.columns, rows, sink);
            }
            _ => {}
        }
    }
}

/// Duplicate tuples are violations for both kinds; a null is a violation
/// only inside a primary key.
fn check_unique_columns(
    kind: &str,
    table: &Table,
    columns: &[String],
    rows: &[Row],
    sink: &mut ViolationSink,
) -> u64 {
    let path = format!("{}.{}", table.name, columns.join(","));
    let mut seen = HashSet::new();
    let mut violations = 0u64;

    for (row_idx, row) in rows.iter().enumerate() {
        let values = tuple(row, columns);
        if values.iter().any(|value| value.is_null()) {
            if kind == "primary_key" {
                violations += 1;
                sink.push(Violation {
                    code: kind.to_string(),
                    path: path.clone(),
                    message: "null value in primary key".to_string(),
                    row_index: Some(row_idx as u64 + 1),
                    example: None,
                });
            }
            continue;
        }

        let key = tuple_key(&values);
        if !seen.insert(key.clone()) {
            violations += 1;
            sink.push(Violation {
                code: kind.to_string(),
                path: path.clone(),
                message: "duplicate key detected".to_string(),
                row_index: Some(row_idx as u64 + 1),
                example: Some(key),
            });
        }
    }

    violations
}

fn evaluate_foreign_keys(
    table: &Table,
    rows: &[Row],
    dataset: &GeneratedDataset,
    warnings: &mut Vec<WarningItem>,
    sink: &mut ViolationSink,
    summary: &mut ConstraintSummary,
) {
    for fk in table.foreign_keys() {
        summary.fk.checked += 1;
        summary.fk.violations += check_foreign_key(table, fk, rows, dataset, warnings, sink);
    }
}

fn check_foreign_key(
    table: &Table,
    fk: &ForeignKey,
    rows: &[Row],
    dataset: &GeneratedDataset,
    warnings: &mut Vec<WarningItem>,
    sink: &mut ViolationSink,
) -> u64 {
    let path = format!("{} -> {}", table.name, fk.referenced_table);
    let Some(parent) = dataset.table(&fk.referenced_table) else {
        warnings.push(WarningItem {
            code: "missing_parent_table".to_string(),
            path,
            message: format!(
                "parent table '{}' not found in dataset",
                fk.referenced_table
            ),
            hint: Some("generate parent tables along with their children".to_string()),
        });
        return 0;
    };

    let parent_keys: HashSet<String> = parent
        .rows
        .iter()
        .map(|row| tuple(row, &fk.referenced_columns))
        .filter(|values| !values.iter().any(|value| value.is_null()))
        .map(|values| tuple_key(&values))
        .collect();

    let mut violations = 0u64;
    for (row_idx, row) in rows.iter().enumerate() {
        let values = tuple(row, &fk.columns);
        if values.iter().any(|value| value.is_null()) {
            continue;
        }
        let key = tuple_key(&values);
        if !parent_keys.contains(&key) {
            violations += 1;
            sink.push(Violation {
                code: "foreign_key".to_string(),
                path: path.clone(),
                message: format!("broken foreign key reference ({})", fk.label()),
                row_index: Some(row_idx as u64 + 1),
                example: Some(key),
            });
        }
    }
    violations
}

/// CHECK expressions are kept as opaque text and never evaluated.
fn evaluate_checks(table: &Table, warnings: &mut Vec<WarningItem>, summary: &mut ConstraintSummary) {
    for constraint in &table.constraints {
        if let Constraint::Check(check) = constraint {
            summary.check.not_evaluated += 1;
            warnings.push(WarningItem {
                code: "check_not_evaluated".to_string(),
                path: table.name.clone(),
                message: format!("check expression not evaluated: {}", check.expression),
                hint: None,
            });
        }
    }
}

static NULL: GeneratedValue = GeneratedValue::Null;

fn tuple<'a>(row: &'a Row, columns: &[String]) -> Vec<&'a GeneratedValue> {
    columns
        .iter()
        .map(|column| row.get(column).unwrap_or(&NULL))
        .collect()
}

fn is_null(row: &Row, column: &str) -> bool {
    row.get(column).is_none_or(GeneratedValue::is_null)
}

fn tuple_key(values: &[&GeneratedValue]) -> String {
    values
        .iter()
        .map(|value| escape_key_component(&value.unique_key()))
        .collect::<Vec<_>>()
        .join("|")
}

fn escape_key_component(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
}

fn sort_warnings(warnings: &mut [WarningItem]) {
    warnings.sort_by(|a, b| (&a.path, &a.code).cmp(&(&b.path, &b.code)));
}

fn sort_violations(violations: &mut [Violation]) {
    violations.sort_by(|a, b| {
        (&a.path, &a.code, a.row_index.unwrap_or_default()).cmp(&(
            &b.path,
            &b.code,
            b.row_index.unwrap_or_default(),
        ))
    });
}
