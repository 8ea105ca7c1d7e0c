use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// SQL dialect a DDL script is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Mysql,
    Sqlite,
    Oracle,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::Postgres,
        Dialect::Mysql,
        Dialect::Sqlite,
        Dialect::Oracle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Oracle => "oracle",
        }
    }

    /// Character used to open a quoted identifier when rendering SQL.
    pub fn identifier_quote(&self) -> char {
        match self {
            Dialect::Mysql => '`',
            _ => '"',
        }
    }

    /// Whether an unquoted reference to `name` reaches the identifier spelled
    /// exactly `name`. Postgres folds unquoted names to lower case and Oracle
    /// to upper case; MySQL and SQLite keep the spelling.
    pub fn keeps_unquoted_spelling(&self, name: &str) -> bool {
        match self {
            Dialect::Postgres => !name.chars().any(char::is_uppercase),
            Dialect::Oracle => !name.chars().any(char::is_lowercase),
            Dialect::Mysql | Dialect::Sqlite => true,
        }
    }

    pub fn accepts_backtick_identifiers(&self) -> bool {
        matches!(self, Dialect::Mysql | Dialect::Sqlite)
    }

    pub fn accepts_double_quoted_identifiers(&self) -> bool {
        !matches!(self, Dialect::Mysql)
    }

    pub fn accepts_bracket_identifiers(&self) -> bool {
        matches!(self, Dialect::Sqlite)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "oracle" => Ok(Dialect::Oracle),
            other => Err(Error::Unsupported(format!("unknown dialect '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("sqlite3".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert_eq!(" MySQL ".parse::<Dialect>().unwrap(), Dialect::Mysql);
        assert!("db2".parse::<Dialect>().is_err());
    }

    #[test]
    fn quoting_follows_dialect_family() {
        assert_eq!(Dialect::Mysql.identifier_quote(), '`');
        assert_eq!(Dialect::Oracle.identifier_quote(), '"');
        assert!(!Dialect::Postgres.accepts_backtick_identifiers());
        assert!(Dialect::Sqlite.accepts_bracket_identifiers());
    }

    #[test]
    fn unquoted_case_folding() {
        assert!(Dialect::Postgres.keeps_unquoted_spelling("authors"));
        assert!(!Dialect::Postgres.keeps_unquoted_spelling("Authors"));
        assert!(Dialect::Oracle.keeps_unquoted_spelling("AUTHORS"));
        assert!(!Dialect::Oracle.keeps_unquoted_spelling("authors"));
        assert!(Dialect::Mysql.keeps_unquoted_spelling("Authors"));
        assert!(Dialect::Sqlite.keeps_unquoted_spelling("authors"));
    }
}
