use crate::metrics::{ConstraintSummary, MetricsReport};
use crate::model::Violation;

/// Render a deterministic markdown report from metrics and violations.
pub fn render_report(
    metrics: &MetricsReport,
    violations: &[Violation],
    max_examples: usize,
) -> String {
    let mut lines = Vec::new();

    lines.push("# Datafill Evaluation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- dialect: {}", metrics.dialect));
    lines.push(format!("- schema_version: {}", metrics.schema_version));
    let seed = metrics
        .seed
        .map(|seed| seed.to_string())
        .unwrap_or_else(|| "-".to_string());
    lines.push(format!("- seed: {seed}"));
    lines.push(format!("- violations: {}", metrics.total_violations()));
    lines.push(String::new());

    lines.push("## Row counts".to_string());
    lines.push("| table | rows_expected | rows_found |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for table in &metrics.tables {
        let expected = table
            .rows_expected
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "| {} | {} | {} |",
            table.table, expected, table.rows_found
        ));
    }
    lines.push(String::new());

    lines.push("## Constraint summary".to_string());
    lines.push("| constraint | checked | violations | not_evaluated |".to_string());
    lines.push("| --- | --- | --- | --- |".to_string());
    for name in ["not_null", "pk", "unique", "fk", "check"] {
        push_constraint_row(&mut lines, name, &metrics.constraints);
    }
    lines.push(String::new());

    if !metrics.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in &metrics.warnings {
            let hint = warning
                .hint
                .as_ref()
                .map(|hint| format!(" (hint: {hint})"))
                .unwrap_or_default();
            lines.push(format!("- {}: {}{}", warning.path, warning.message, hint));
        }
        lines.push(String::new());
    }

    if !violations.is_empty() {
        lines.push("## Top violations".to_string());
        for violation in violations.iter().take(max_examples) {
            let row = violation
                .row_index
                .map(|row| format!(" row {row}"))
                .unwrap_or_default();
            let example = violation
                .example
                .as_ref()
                .map(|value| format!(" example={value}"))
                .unwrap_or_default();
            lines.push(format!(
                "- {}{}: {}{}",
                violation.path, row, violation.message, example
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(metrics));
    lines.join("\n")
}

fn push_constraint_row(lines: &mut Vec<String>, name: &str, summary: &ConstraintSummary) {
    let (checked, violations) = match name {
        "not_null" => (summary.not_null.checked, summary.not_null.violations),
        "pk" => (summary.pk.checked, summary.pk.violations),
        "unique" => (summary.unique.checked, summary.unique.violations),
        "fk" => (summary.fk.checked, summary.fk.violations),
        "check" => (summary.check.checked, summary.check.violations),
        _ => (0, 0),
    };
    let not_evaluated = if name == "check" {
        summary.check.not_evaluated.to_string()
    } else {
        "-".to_string()
    };
    lines.push(format!(
        "| {name} | {checked} | {violations} | {not_evaluated} |"
    ));
}

fn recommendations(metrics: &MetricsReport) -> Vec<String> {
    let constraints = &metrics.constraints;
    let mut lines = Vec::new();
    if constraints.not_null.violations > 0 {
        lines.push("- map a generator or pool to NOT NULL columns that produced nulls.".to_string());
    }
    if constraints.unique.violations > 0 || constraints.pk.violations > 0 {
        lines.push("- widen the value space of unique columns or lower the row counts.".to_string());
    }
    if constraints.fk.violations > 0 {
        lines.push("- ensure parent tables are generated before children.".to_string());
    }
    if constraints.check.not_evaluated > 0 {
        lines.push("- CHECK constraints are not evaluated; verify them in the target database.".to_string());
    }
    if metrics.total_violations() == 0 {
        lines.push("- no violations detected; compare metrics across runs for drift.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{METRICS_VERSION, PerformanceMetrics, TableMetrics};
    use datafill_core::Dialect;

    fn metrics() -> MetricsReport {
        let mut constraints = ConstraintSummary::default();
        constraints.pk.checked = 2;
        constraints.fk.checked = 1;
        constraints.fk.violations = 1;
        constraints.check.not_evaluated = 3;
        MetricsReport {
            metrics_version: METRICS_VERSION.to_string(),
            schema_version: "0.1".to_string(),
            dialect: Dialect::Postgres,
            seed: Some(42),
            tables: vec![TableMetrics {
                table: "books".to_string(),
                rows_found: 3,
                rows_expected: Some(3),
            }],
            column_stats: Vec::new(),
            constraints,
            warnings: Vec::new(),
            performance: PerformanceMetrics { validate_ms: 0 },
        }
    }

    #[test]
    fn report_lists_counts_and_violations() {
        let violations = vec![
            Violation {
                code: "foreign_key".to_string(),
                path: "books -> authors".to_string(),
                message: "broken foreign key reference (fk_books_author)".to_string(),
                row_index: Some(2),
                example: Some("9".to_string()),
            },
        ];
        let report = render_report(&metrics(), &violations, 10);

        assert!(report.starts_with("# Datafill Evaluation Report\n"));
        assert!(report.contains("- seed: 42"));
        assert!(report.contains("| books | 3 | 3 |"));
        assert!(report.contains("| fk | 1 | 1 | - |"));
        assert!(report.contains("| check | 0 | 0 | 3 |"));
        assert!(report.contains("- books -> authors row 2: broken foreign key reference (fk_books_author) example=9"));
        assert!(report.contains("ensure parent tables are generated before children"));
        assert!(!report.contains("no violations detected"));
    }

    #[test]
    fn report_is_deterministic() {
        let metrics = metrics();
        assert_eq!(render_report(&metrics, &[], 5), render_report(&metrics, &[], 5));
    }
}
