use thiserror::Error;

/// Errors raised while turning DDL text into a schema.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no CREATE TABLE statement found")]
    NoCreateTable,
    #[error("cannot tokenize at line {line}, column {column}: {message} (near `{fragment}`)")]
    Tokenize {
        line: usize,
        column: usize,
        fragment: String,
        message: String,
    },
    #[error("syntax error at line {line}: {message} (near `{fragment}`)")]
    Syntax {
        line: usize,
        fragment: String,
        message: String,
    },
    #[error("{context} on table {table} references unknown column {column}")]
    UnknownColumn {
        table: String,
        column: String,
        context: String,
    },
    #[error("{context} references unknown table {table}")]
    UnknownTable { table: String, context: String },
    #[error("table {table} is declared more than once")]
    DuplicateTable { table: String },
    #[error("column {column} is declared more than once in table {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("table {table} declares conflicting primary keys")]
    ConflictingPrimaryKey { table: String },
    #[error("invalid foreign key on table {table}: {message}")]
    InvalidReference { table: String, message: String },
    #[error(transparent)]
    Schema(#[from] datafill_core::Error),
}
