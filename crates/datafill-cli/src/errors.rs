use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors surfaced by the `datafill` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("parse error: {0}")]
    Parse(#[from] datafill_parse::ParseError),
    #[error("schema error: {0}")]
    Schema(#[from] datafill_core::Error),
    #[error("{0}")]
    Config(#[from] datafill_plan::PlanError),
    #[error("generation failed: {0}")]
    Generation(#[from] datafill_generate::GenerationError),
    #[error("evaluation failed: {0}")]
    Eval(#[from] datafill_eval::EvalError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("verification found {0} violation(s)")]
    Verification(u64),
}

pub type CliResult<T> = std::result::Result<T, CliError>;
