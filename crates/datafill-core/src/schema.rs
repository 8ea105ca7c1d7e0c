use serde::{Deserialize, Serialize};

use crate::constraints::{Constraint, ForeignKey, PrimaryKey, UniqueConstraint};
use crate::dialect::Dialect;
use crate::types::DataType;

/// Normalized schema produced from a DDL script.
///
/// Tables keep declaration order. Names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Contract version for this schema format.
    pub schema_version: String,
    /// Dialect the source script was parsed with.
    pub dialect: Dialect,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            schema_version: crate::SCHEMA_VERSION.to_string(),
            dialect,
            tables: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables
            .iter_mut()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    /// Declaration index of a table.
    pub fn table_index(&self, name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|table| table.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }
}

/// A table and its constraints in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// The name was written as a quoted identifier.
    #[serde(default, skip_serializing_if = "is_false")]
    pub quoted: bool,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: false,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.constraints.iter().find_map(|constraint| match constraint {
            Constraint::PrimaryKey(pk) => Some(pk),
            _ => None,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::ForeignKey(fk) => Some(fk),
            _ => None,
        })
    }

    pub fn unique_constraints(&self) -> impl Iterator<Item = &UniqueConstraint> {
        self.constraints.iter().filter_map(|constraint| match constraint {
            Constraint::Unique(unique) => Some(unique),
            _ => None,
        })
    }

    /// Column tuples that must be unique across rows: the primary key first,
    /// then unique constraints, without duplicates.
    pub fn unique_sets(&self) -> Vec<Vec<String>> {
        let mut sets: Vec<Vec<String>> = Vec::new();
        let candidates = self
            .primary_key()
            .map(|pk| pk.columns.clone())
            .into_iter()
            .chain(self.unique_constraints().map(|unique| unique.columns.clone()));
        for columns in candidates {
            if columns.is_empty() {
                continue;
            }
            if !sets.iter().any(|existing| same_columns(existing, &columns)) {
                sets.push(columns);
            }
        }
        sets
    }

    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key()
            .map(|pk| pk.columns.iter().any(|name| name.eq_ignore_ascii_case(column)))
            .unwrap_or(false)
    }

    /// Foreign key that owns `column`, if any.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys()
            .find(|fk| fk.columns.iter().any(|name| name.eq_ignore_ascii_case(column)))
    }

    /// Whether the given columns are covered by a declared unique set.
    pub fn is_unique_tuple(&self, columns: &[String]) -> bool {
        self.unique_sets().iter().any(|set| {
            set.iter()
                .all(|name| columns.iter().any(|column| column.eq_ignore_ascii_case(name)))
        })
    }
}

/// Column metadata in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// 1-based position in the table declaration.
    pub ordinal_position: u16,
    pub name: String,
    /// The name was written as a quoted identifier.
    #[serde(default, skip_serializing_if = "is_false")]
    pub quoted: bool,
    pub data_type: DataType,
    /// Type as spelled in the script, e.g. `VARCHAR(50)`.
    pub raw_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    /// True when a single-column unique constraint covers this column.
    pub is_unique: bool,
    pub default: Option<String>,
}

impl Column {
    pub fn new(ordinal_position: u16, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            ordinal_position,
            name: name.into(),
            quoted: false,
            raw_type: String::new(),
            data_type,
            is_nullable: true,
            is_primary_key: false,
            is_unique: false,
            default: None,
        }
    }
}

fn is_false(flag: &bool) -> bool {
    !flag
}

/// Compare column lists ignoring case and order.
pub fn same_columns(left: &[String], right: &[String]) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|name| right.iter().any(|other| other.eq_ignore_ascii_case(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn users() -> Table {
        let mut table = Table::new("Users");
        table.columns.push(Column::new(1, "id", DataType::integer()));
        table.columns.push(Column::new(2, "Email", DataType::text()));
        table.constraints.push(Constraint::PrimaryKey(PrimaryKey {
            name: None,
            columns: vec!["id".to_string()],
        }));
        table.constraints.push(Constraint::Unique(UniqueConstraint {
            name: None,
            columns: vec!["email".to_string()],
        }));
        table.constraints.push(Constraint::Unique(UniqueConstraint {
            name: Some("dup".to_string()),
            columns: vec!["ID".to_string()],
        }));
        table
    }

    #[test]
    fn lookups_ignore_case() {
        let mut schema = Schema::new(Dialect::Postgres);
        schema.tables.push(users());
        assert!(schema.table("users").is_some());
        assert!(schema.table("USERS").unwrap().column("email").is_some());
        assert_eq!(schema.table_index("uSeRs"), Some(0));
    }

    #[test]
    fn unique_sets_start_with_primary_key_and_skip_duplicates() {
        let sets = users().unique_sets();
        assert_eq!(
            sets,
            vec![vec!["id".to_string()], vec!["email".to_string()]]
        );
    }
}
