mod commands;
mod errors;
mod input;
mod registry;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::{
    CheckArgs, GenerateArgs, ParseArgs, PreviewArgs, run_check, run_generate, run_parse,
    run_preview,
};
use errors::CliResult;
use registry::init_logging;

#[derive(Parser, Debug)]
#[command(name = "datafill", version, about = "Synthetic data from SQL DDL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a DDL script into normalized schema JSON.
    Parse(ParseArgs),
    /// Show the strategy chosen for every column with sample values.
    Preview(PreviewArgs),
    /// Generate a dataset into a new run directory.
    Generate(GenerateArgs),
    /// Validate a generation config against a DDL script.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    // Generate installs its own subscriber once the run directory exists.
    if !matches!(cli.command, Command::Generate(_)) {
        init_logging(None)?;
    }
    match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Preview(args) => run_preview(args),
        Command::Generate(args) => run_generate(args),
        Command::Check(args) => run_check(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_repeated_formats() {
        let cli = Cli::try_parse_from([
            "datafill",
            "generate",
            "schema.sql",
            "--dialect",
            "mysql",
            "--format",
            "sql",
            "--format",
            "csv",
            "--seed",
            "42",
            "--verify",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Generate(_)));
    }

    #[test]
    fn unknown_dialect_is_rejected() {
        let err = Cli::try_parse_from(["datafill", "parse", "schema.sql", "--dialect", "db2"])
            .unwrap_err();
        assert!(err.to_string().contains("db2"));
    }
}
