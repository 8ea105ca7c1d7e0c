use std::path::PathBuf;

use clap::Args;

use datafill_core::Dialect;
use datafill_generate::{StrategyPreview, preview_strategies};

use crate::errors::CliResult;
use crate::input::{load_config, load_schema};

#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// DDL script to preview.
    #[arg(value_name = "DDL")]
    ddl: PathBuf,
    /// SQL dialect of the script.
    #[arg(long, default_value = "postgres")]
    dialect: Dialect,
    /// Generation config (JSON or TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sample values drawn per column.
    #[arg(long, default_value_t = 5)]
    sample_size: usize,
    /// Print the preview as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

pub fn run_preview(args: PreviewArgs) -> CliResult<()> {
    let parsed = load_schema(&args.ddl, args.dialect)?;
    let config = load_config(args.config.as_deref(), &parsed.schema)?;
    let preview = preview_strategies(&parsed.schema, &config, args.sample_size)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print!("{}", render_preview(&preview));
    }
    Ok(())
}

/// Plain-text table, one line per column.
fn render_preview(preview: &StrategyPreview) -> String {
    let rows: Vec<[String; 5]> = preview
        .columns
        .iter()
        .map(|column| {
            let samples = if column.samples.is_empty() {
                column.note.clone().unwrap_or_default()
            } else {
                column
                    .samples
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            [
                format!("{}.{}", column.table, column.column),
                column.strategy.as_str().to_string(),
                column.generator_id.clone().unwrap_or_else(|| "-".to_string()),
                column
                    .score
                    .map(|score| format!("{score:.3}"))
                    .unwrap_or_else(|| "-".to_string()),
                samples,
            ]
        })
        .collect();

    let header = ["COLUMN", "STRATEGY", "GENERATOR", "SCORE", "SAMPLES"].map(String::from);
    let mut widths = header.clone().map(|cell| cell.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(&rows) {
        let line = row[..4]
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .chain(std::iter::once(row[4].clone()))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafill_parse::parse_schema;
    use datafill_plan::GenerationConfig;

    #[test]
    fn preview_table_aligns_columns() {
        let schema = parse_schema(
            "CREATE TABLE authors (author_id SERIAL PRIMARY KEY, sex CHAR(1) NOT NULL);",
            Dialect::Postgres,
        )
        .unwrap();
        let mut config = GenerationConfig::default();
        config.set_pool("global", "sex", vec!["M".into()]);
        let preview = preview_strategies(&schema, &config, 2).unwrap();

        let text = render_preview(&preview);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("COLUMN"));
        assert!(lines[1].starts_with("authors.author_id  primary_key"));
        assert!(lines[1].ends_with("1, 2"));
        assert!(lines[2].contains("fixed_pool"));
        assert!(lines[2].ends_with("\"M\", \"M\""));
    }
}
