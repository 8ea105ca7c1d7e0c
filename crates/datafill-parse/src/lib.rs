//! DDL parsing for datafill.
//!
//! Turns `CREATE TABLE` scripts written for Postgres, MySQL, SQLite or
//! Oracle into the normalized [`datafill_core::Schema`].

mod canonical;
pub mod error;
pub mod lexer;
mod parser;
pub mod result;
pub mod types;

use datafill_core::{Dialect, Schema};
use tracing::info;

pub use error::ParseError;
pub use result::{DiagnosticLevel, ParseDiagnostic, ParseResult};

use crate::lexer::{Lexer, Token};
use crate::parser::StatementParser;

/// Parse a DDL script into a schema plus diagnostics.
pub fn parse(text: &str, dialect: Dialect) -> Result<ParseResult, ParseError> {
    let tokens = Lexer::new(text, dialect).tokenize()?;
    let mut diagnostics = Vec::new();
    let mut statements = Vec::new();

    for statement in tokens.split(|spanned| spanned.token == Token::Semicolon) {
        if statement.is_empty() {
            continue;
        }
        let mut parser = StatementParser::new(text, statement, dialect);
        statements.push(parser.parse_statement(&mut diagnostics)?);
    }

    let schema = canonical::build_schema(statements, dialect, &mut diagnostics)?;
    info!(
        dialect = %dialect,
        tables = schema.tables.len(),
        diagnostics = diagnostics.len(),
        "schema parsed"
    );
    Ok(ParseResult {
        schema,
        diagnostics,
    })
}

/// Parse a DDL script, discarding diagnostics.
pub fn parse_schema(text: &str, dialect: Dialect) -> Result<Schema, ParseError> {
    parse(text, dialect).map(|result| result.schema)
}
