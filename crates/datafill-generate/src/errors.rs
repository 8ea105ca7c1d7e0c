use thiserror::Error;

/// Failure of a single value strategy, without table or row context.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("unknown generator id '{0}'")]
    UnknownGenerator(String),
    #[error("{id}: {message}")]
    InvalidParams { id: String, message: String },
    #[error("pool of {size} value(s) is exhausted")]
    PoolExhausted { size: usize },
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl StrategyError {
    pub(crate) fn params(id: &str, message: impl Into<String>) -> Self {
        StrategyError::InvalidParams {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Errors emitted by strategy resolution and the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Schema(#[from] datafill_core::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unknown generator id '{id}' for {table}.{column}")]
    UnknownGenerator {
        table: String,
        column: String,
        id: String,
    },
    #[error("invalid params for {table}.{column}: {source}")]
    InvalidParams {
        table: String,
        column: String,
        #[source]
        source: StrategyError,
    },
    #[error(
        "pool for unique column {table}.{column} has {pool_size} value(s) but {required} rows were requested"
    )]
    InsufficientPool {
        table: String,
        column: String,
        pool_size: usize,
        required: u64,
    },
    #[error("parent table '{parent}' has no rows for NOT NULL foreign key {foreign_key} on '{table}'")]
    MissingParentRows {
        table: String,
        foreign_key: String,
        parent: String,
    },
    #[error(
        "could not produce a unique value for {table}({}) at row {row_index} after {attempts} attempts",
        .columns.join(", ")
    )]
    UniquenessViolation {
        table: String,
        columns: Vec<String>,
        row_index: u64,
        attempts: u32,
    },
    #[error("{table}.{column} row {row_index}: {source}")]
    Strategy {
        table: String,
        column: String,
        row_index: u64,
        #[source]
        source: StrategyError,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
