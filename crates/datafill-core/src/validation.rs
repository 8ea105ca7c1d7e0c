use std::collections::BTreeSet;

use crate::constraints::Constraint;
use crate::error::{Error, Result};
use crate::schema::{Schema, same_columns};

/// Validate internal consistency of a schema.
///
/// This checks:
/// - duplicate tables/columns (case-insensitive)
/// - constraint columns exist
/// - foreign key targets exist and have matching arity
/// - referenced columns form a primary key or unique constraint
pub fn validate_schema(schema: &Schema) -> Result<()> {
    let mut tables = BTreeSet::new();
    for table in &schema.tables {
        if !tables.insert(table.name.to_ascii_lowercase()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.to_ascii_lowercase()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }
    }

    for table in &schema.tables {
        let check_columns = |kind: &str, names: &[String]| -> Result<()> {
            for name in names {
                if table.column(name).is_none() {
                    return Err(Error::InvalidSchema(format!(
                        "{kind} column not found: {}.{}",
                        table.name, name
                    )));
                }
            }
            Ok(())
        };

        let mut primary_keys = 0usize;
        for constraint in &table.constraints {
            match constraint {
                Constraint::PrimaryKey(pk) => {
                    primary_keys += 1;
                    check_columns("primary key", &pk.columns)?;
                }
                Constraint::Unique(unique) => check_columns("unique", &unique.columns)?,
                Constraint::ForeignKey(fk) => {
                    check_columns("foreign key", &fk.columns)?;

                    let target = schema.table(&fk.referenced_table).ok_or_else(|| {
                        Error::InvalidSchema(format!(
                            "referenced table not found: {} (from {})",
                            fk.referenced_table, table.name
                        ))
                    })?;

                    if fk.columns.len() != fk.referenced_columns.len() {
                        return Err(Error::InvalidSchema(format!(
                            "foreign key {} on {} has {} columns but references {}",
                            fk.label(),
                            table.name,
                            fk.columns.len(),
                            fk.referenced_columns.len()
                        )));
                    }

                    for column in &fk.referenced_columns {
                        if target.column(column).is_none() {
                            return Err(Error::InvalidSchema(format!(
                                "referenced column not found: {}.{}",
                                target.name, column
                            )));
                        }
                    }

                    let keyed = target
                        .unique_sets()
                        .iter()
                        .any(|set| same_columns(set, &fk.referenced_columns));
                    if !keyed {
                        return Err(Error::InvalidSchema(format!(
                            "foreign key {} on {} references {}({}) which is not a primary or unique key",
                            fk.label(),
                            table.name,
                            target.name,
                            fk.referenced_columns.join(", ")
                        )));
                    }
                }
                Constraint::Check(_) => {}
            }
        }

        if primary_keys > 1 {
            return Err(Error::InvalidSchema(format!(
                "table {} declares {} primary keys",
                table.name, primary_keys
            )));
        }
    }

    Ok(())
}
