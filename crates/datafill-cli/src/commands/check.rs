use std::path::PathBuf;

use clap::Args;

use datafill_core::{Dialect, plan_order, validate_schema};
use datafill_plan::{PlanError, validate_config};

use crate::errors::{CliError, CliResult};
use crate::input::{load_schema, read_config_value};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// DDL script the config targets.
    #[arg(value_name = "DDL")]
    ddl: PathBuf,
    /// SQL dialect of the script.
    #[arg(long, default_value = "postgres")]
    dialect: Dialect,
    /// Generation config (JSON or TOML).
    #[arg(long)]
    config: PathBuf,
}

pub fn run_check(args: CheckArgs) -> CliResult<()> {
    let parsed = load_schema(&args.ddl, args.dialect)?;
    let schema = &parsed.schema;
    validate_schema(schema)?;

    let order = plan_order(schema)?;
    println!("generation order: {}", order.tables.join(", "));
    for edge in &order.deferred {
        println!(
            "deferred: {} on {} (references {}, left null)",
            edge.foreign_key, edge.table, edge.referenced_table
        );
    }

    let value = read_config_value(&args.config)?;
    match validate_config(&value, schema) {
        Ok(validated) => {
            for issue in &validated.warnings {
                println!("{issue}");
            }
            println!("config ok ({} warning(s))", validated.warnings.len());
            Ok(())
        }
        Err(report) => {
            for issue in report.issues() {
                println!("{issue}");
            }
            Err(CliError::Config(PlanError::Invalid(report)))
        }
    }
}
