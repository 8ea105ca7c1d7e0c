use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use datafill_core::Schema;
use datafill_plan::GenerationConfig;

use crate::metrics::MetricsReport;

/// Options for dataset evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Fail when any violation is found.
    pub strict: bool,
    /// Violation samples kept per constraint.
    pub max_examples: usize,
    /// Expected row counts, keyed by table name.
    #[serde(default)]
    pub expected_rows: BTreeMap<String, u64>,
    /// Seed recorded in the metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_examples: 20,
            expected_rows: BTreeMap::new(),
            seed: None,
        }
    }
}

impl EvaluateOptions {
    /// Expect the row counts a generation config asks for.
    pub fn expect_config(mut self, config: &GenerationConfig, schema: &Schema) -> Self {
        self.expected_rows = schema
            .tables
            .iter()
            .map(|table| (table.name.clone(), config.rows_for(&table.name)))
            .collect();
        if self.seed.is_none() {
            self.seed = config.seed;
        }
        self
    }

    pub(crate) fn expected_for(&self, table: &str) -> Option<u64> {
        self.expected_rows
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(table))
            .map(|(_, rows)| *rows)
    }
}

/// Structured violation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    pub path: String,
    pub message: String,
    /// One-based row number within the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Result of a dataset evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub metrics: MetricsReport,
    pub violations: Vec<Violation>,
}

impl EvaluationResult {
    pub fn is_clean(&self) -> bool {
        self.metrics.total_violations() == 0
    }
}
