//! Export adapters: SQL inserts and per-table JSON or CSV files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use datafill_core::Schema;

use crate::errors::GenerationError;
use crate::model::GeneratedDataset;

pub mod csv;
pub mod json;
pub mod sql;

pub use sql::to_sql_inserts;

/// Per-table file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    Json,
    Csv,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Json => "json",
            TableFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(TableFormat::Json),
            "csv" => Ok(TableFormat::Csv),
            other => Err(format!("unknown table format '{other}'")),
        }
    }
}

/// One file body per generated table, keyed by table name.
pub fn to_table_files(
    dataset: &GeneratedDataset,
    schema: &Schema,
    format: TableFormat,
) -> Result<BTreeMap<String, Vec<u8>>, GenerationError> {
    let mut files = BTreeMap::new();
    for generated in &dataset.tables {
        let table = schema.table(&generated.name).ok_or_else(|| {
            GenerationError::InvalidConfig(format!(
                "generated table '{}' is not in the schema",
                generated.name
            ))
        })?;
        let body = match format {
            TableFormat::Json => json::table_to_json(table, &generated.rows)?,
            TableFormat::Csv => csv::table_to_csv(table, &generated.rows)?,
        };
        files.insert(table.name.clone(), body);
    }
    Ok(files)
}

/// Write `<table>.<ext>` files into `dir` and return their paths.
pub fn write_table_files(
    dir: &Path,
    dataset: &GeneratedDataset,
    schema: &Schema,
    format: TableFormat,
) -> Result<Vec<PathBuf>, GenerationError> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::new();
    for (table, body) in to_table_files(dataset, schema, format)? {
        let path = dir.join(format!("{table}.{}", format.extension()));
        std::fs::write(&path, &body)?;
        info!(table = %table, path = %path.display(), bytes = body.len(), "table file written");
        paths.push(path);
    }
    Ok(paths)
}
