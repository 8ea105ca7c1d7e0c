use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use tracing::{info, warn};
use uuid::Uuid;

use datafill_core::Dialect;
use datafill_eval::{EvaluateOptions, evaluate_dataset, write_outputs};
use datafill_generate::{TableFormat, generate, to_sql_inserts, write_table_files};

use crate::errors::{CliError, CliResult};
use crate::input::{load_config, load_schema};
use crate::registry::{
    RunConfig, RunContext, RunPaths, collect_git_info, init_logging, start_run, write_json,
};

/// File name of the SQL export inside a run directory.
const SQL_FILE: &str = "data.sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Sql,
    Json,
    Csv,
}

impl OutputFormat {
    fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Sql => "sql",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// DDL script describing the tables to fill.
    #[arg(value_name = "DDL")]
    ddl: PathBuf,
    /// SQL dialect of the script.
    #[arg(long, default_value = "postgres")]
    dialect: Dialect,
    /// Generation config (JSON or TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory that receives run directories.
    #[arg(long, default_value = "runs")]
    out_dir: PathBuf,
    /// Output formats; repeat for several.
    #[arg(long = "format", value_enum, default_values_t = [OutputFormat::Sql])]
    formats: Vec<OutputFormat>,
    /// Seed override for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    /// Check the generated rows against the schema constraints.
    #[arg(long, default_value_t = false)]
    verify: bool,
}

pub fn run_generate(args: GenerateArgs) -> CliResult<()> {
    let run_id = Uuid::new_v4().to_string();
    let ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        runs_dir: args.out_dir.clone(),
    };
    let paths = start_run(&ctx)?;
    init_logging(Some(&paths.logs_path))?;

    info!(event = "run_started", run_id = %run_id, dialect = %args.dialect);
    let timer = Instant::now();
    match execute(&args, &run_id, &paths) {
        Ok(()) => {
            info!(
                event = "run_finished",
                status = "success",
                duration_ms = timer.elapsed().as_millis() as u64
            );
            println!("run directory: {}", paths.root.display());
            Ok(())
        }
        Err(err) => {
            warn!(event = "run_finished", status = "failed", error = %err);
            Err(err)
        }
    }
}

fn execute(args: &GenerateArgs, run_id: &str, paths: &RunPaths) -> CliResult<()> {
    let parsed = load_schema(&args.ddl, args.dialect)?;
    let schema = &parsed.schema;
    let mut config = load_config(args.config.as_deref(), schema)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let run_config = RunConfig {
        run_id,
        started_at: chrono::Utc::now().to_rfc3339(),
        ddl_path: &args.ddl,
        dialect: args.dialect,
        formats: args
            .formats
            .iter()
            .map(|format| format.as_str().to_string())
            .collect(),
        verify: args.verify,
        config: &config,
        git: collect_git_info(),
    };
    write_json(&paths.config_path, &run_config)?;

    let result = generate(schema, &config)?;
    write_json(&paths.report_path, &result.report)?;
    info!(event = "report_written", path = %paths.report_path.display());

    for format in &args.formats {
        match format {
            OutputFormat::Sql => {
                let path = paths.root.join(SQL_FILE);
                std::fs::write(&path, to_sql_inserts(&result.dataset, schema))?;
                info!(event = "output_written", format = "sql", path = %path.display());
            }
            OutputFormat::Json => {
                write_table_files(&paths.root, &result.dataset, schema, TableFormat::Json)?;
            }
            OutputFormat::Csv => {
                write_table_files(&paths.root, &result.dataset, schema, TableFormat::Csv)?;
            }
        }
    }

    for table in &result.report.tables {
        println!("{:<24} {:>8} rows", table.table, table.rows_generated);
    }

    if args.verify {
        let options = EvaluateOptions {
            seed: Some(result.report.seed),
            ..EvaluateOptions::default()
        }
        .expect_config(&config, schema);
        let evaluation = evaluate_dataset(schema, &result.dataset, &options)?;
        let (metrics_path, report_path) =
            write_outputs(&paths.root, &evaluation, options.max_examples)?;
        info!(
            event = "verification_written",
            metrics = %metrics_path.display(),
            report = %report_path.display()
        );
        let violations = evaluation.metrics.total_violations();
        if violations > 0 {
            return Err(CliError::Verification(violations));
        }
        println!("verification passed");
    }
    Ok(())
}
