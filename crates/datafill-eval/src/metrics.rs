use serde::{Deserialize, Serialize};

use datafill_core::Dialect;

/// Metrics contract version for dataset evaluation.
pub const METRICS_VERSION: &str = "0.1";

/// Machine-readable metrics for a dataset evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    pub metrics_version: String,
    pub schema_version: String,
    pub dialect: Dialect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub tables: Vec<TableMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub column_stats: Vec<ColumnStats>,
    pub constraints: ConstraintSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningItem>,
    pub performance: PerformanceMetrics,
}

impl MetricsReport {
    /// Sum of violations across all constraint kinds.
    pub fn total_violations(&self) -> u64 {
        let summary = &self.constraints;
        summary.not_null.violations
            + summary.pk.violations
            + summary.unique.violations
            + summary.fk.violations
            + summary.check.violations
    }

    pub fn table(&self, name: &str) -> Option<&TableMetrics> {
        self.tables
            .iter()
            .find(|table| table.table.eq_ignore_ascii_case(name))
    }
}

/// Per-table row counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetrics {
    pub table: String,
    pub rows_found: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_expected: Option<u64>,
}

/// Per-column null counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnStats {
    pub table: String,
    pub column: String,
    pub null_count: u64,
}

/// Summary of constraint validation outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub not_null: ConstraintStats,
    pub pk: ConstraintStats,
    pub unique: ConstraintStats,
    pub fk: ConstraintStats,
    pub check: CheckConstraintStats,
}

/// Generic constraint counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintStats {
    pub checked: u64,
    pub violations: u64,
}

/// Check constraint counters with not-evaluated tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConstraintStats {
    pub checked: u64,
    pub violations: u64,
    pub not_evaluated: u64,
}

/// Structured warning entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningItem {
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Timings for the evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub validate_ms: u128,
}
