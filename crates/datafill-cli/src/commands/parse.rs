use std::path::PathBuf;

use clap::Args;
use tracing::info;

use datafill_core::{Dialect, validate_schema};
use datafill_eval::collect_schema_metrics;

use crate::errors::CliResult;
use crate::input::load_schema;
use crate::registry::write_json;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// DDL script to parse.
    #[arg(value_name = "DDL")]
    ddl: PathBuf,
    /// SQL dialect of the script.
    #[arg(long, default_value = "postgres")]
    dialect: Dialect,
    /// Write the normalized schema JSON here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Also write schema metrics JSON to this path.
    #[arg(long)]
    metrics: Option<PathBuf>,
}

pub fn run_parse(args: ParseArgs) -> CliResult<()> {
    let result = load_schema(&args.ddl, args.dialect)?;
    validate_schema(&result.schema)?;

    match &args.out {
        Some(path) => {
            write_json(path, &result.schema)?;
            info!(path = %path.display(), tables = result.schema.tables.len(), "schema written");
        }
        None => println!("{}", serde_json::to_string_pretty(&result.schema)?),
    }

    if let Some(path) = &args.metrics {
        let metrics = collect_schema_metrics(&result.schema);
        write_json(path, &metrics)?;
        info!(path = %path.display(), "schema metrics written");
    }
    Ok(())
}
