use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::generators::GeneratedValue;

/// One generated row, keyed by lowercased column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: HashMap<String, GeneratedValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&GeneratedValue> {
        self.values.get(&column.to_lowercase())
    }

    pub fn set(&mut self, column: &str, value: GeneratedValue) {
        self.values.insert(column.to_lowercase(), value);
    }

    pub fn contains(&self, column: &str) -> bool {
        self.values.contains_key(&column.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Rows of one table in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTable {
    pub name: String,
    pub rows: Vec<Row>,
}

/// All generated tables, in generation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedDataset {
    pub tables: Vec<GeneratedTable>,
}

impl GeneratedDataset {
    pub fn table(&self, name: &str) -> Option<&GeneratedTable> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    /// Rows of a table; empty when the table was not generated.
    pub fn rows(&self, name: &str) -> &[Row] {
        self.table(name)
            .map(|table| table.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|table| table.rows.len() as u64).sum()
    }
}

/// Summary of a generated table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows_requested: u64,
    pub rows_generated: u64,
    pub retries: u64,
}

/// Structured generation issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_id: Option<String>,
}

impl GenerationIssue {
    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self::new("info", code, message)
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::new("warning", code, message)
    }

    fn new(level: &str, code: &str, message: impl Into<String>) -> Self {
        Self {
            level: level.to_string(),
            code: code.to_string(),
            message: message.into(),
            table: None,
            column: None,
            generator_id: None,
        }
    }

    pub fn for_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn for_column(mut self, table: &str, column: &str) -> Self {
        self.table = Some(table.to_string());
        self.column = Some(column.to_string());
        self
    }

    pub fn with_generator(mut self, id: &str) -> Self {
        self.generator_id = Some(id.to_string());
        self
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Seed actually used, so a run can be replayed.
    pub seed: u64,
    pub tables: Vec<TableReport>,
    pub retries_total: u64,
    /// Columns per strategy kind.
    pub strategy_usage: BTreeMap<String, u64>,
    /// Values produced per generator id.
    pub generator_usage: BTreeMap<String, u64>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub issues: Vec<GenerationIssue>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tables: Vec::new(),
            retries_total: 0,
            strategy_usage: BTreeMap::new(),
            generator_usage: BTreeMap::new(),
            warnings_by_code: BTreeMap::new(),
            issues: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_strategy(&mut self, kind: &str) {
        *self.strategy_usage.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn record_generator_usage(&mut self, id: &str, count: u64) {
        *self.generator_usage.entry(id.to_string()).or_insert(0) += count;
    }

    pub fn record_issue(&mut self, issue: GenerationIssue) {
        if issue.level == "warning" {
            *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        }
        self.issues.push(issue);
    }

    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables
            .iter()
            .find(|table| table.table.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_ignores_case() {
        let mut row = Row::new();
        row.set("Author_ID", GeneratedValue::Int(3));
        assert_eq!(row.get("author_id"), Some(&GeneratedValue::Int(3)));
        assert!(row.contains("AUTHOR_ID"));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn only_warnings_are_counted_by_code() {
        let mut report = GenerationReport::new(1);
        report.record_issue(GenerationIssue::info("fuzzy_guess", "guessed"));
        report.record_issue(GenerationIssue::warning("fk_deferred", "deferred"));
        report.record_issue(GenerationIssue::warning("fk_deferred", "deferred"));
        assert_eq!(report.issues.len(), 3);
        assert_eq!(report.warnings_by_code.get("fk_deferred"), Some(&2));
        assert!(!report.warnings_by_code.contains_key("fuzzy_guess"));
    }
}
