//! Folding parsed drafts into the canonical schema.

use std::collections::BTreeMap;

use datafill_core::schema::same_columns;
use datafill_core::{
    Column, Constraint, DataType, Dialect, ForeignKey, PrimaryKey, Schema, Table, validate_schema,
};
use tracing::warn;

use crate::error::ParseError;
use crate::parser::{ColumnDraft, Statement, TableDraft};
use crate::result::ParseDiagnostic;
use crate::types::normalize_type;

pub(crate) fn build_schema(
    statements: Vec<Statement>,
    dialect: Dialect,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> Result<Schema, ParseError> {
    let mut drafts: Vec<TableDraft> = Vec::new();
    let mut enum_types: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for statement in statements {
        match statement {
            Statement::CreateTable(draft) => {
                if drafts.iter().any(|existing| existing.name.eq_ignore_ascii_case(&draft.name)) {
                    if draft.if_not_exists {
                        diagnostics.push(
                            ParseDiagnostic::warning(
                                "duplicate_table_skipped",
                                format!("CREATE TABLE IF NOT EXISTS {} repeats an earlier definition", draft.name),
                            )
                            .with_table(&draft.name)
                            .with_line(draft.line),
                        );
                        continue;
                    }
                    return Err(ParseError::DuplicateTable { table: draft.name });
                }
                drafts.push(draft);
            }
            Statement::AlterTable(addition) => {
                let target = find_draft(&mut drafts, &addition.name, "ALTER TABLE")?;
                target.columns.extend(addition.columns);
                target.constraints.extend(addition.constraints);
            }
            Statement::UniqueIndex {
                table,
                line,
                constraint,
            } => {
                let context = format!(
                    "unique index {} on line {line}",
                    constraint.name().unwrap_or("(unnamed)")
                );
                find_draft(&mut drafts, &table, &context)?
                    .constraints
                    .push(constraint);
            }
            Statement::EnumType { name, values } => {
                enum_types.insert(name.to_ascii_lowercase(), values);
            }
            Statement::Skipped {
                line,
                summary,
                reason,
            } => {
                diagnostics.push(
                    ParseDiagnostic::info(
                        "statement_skipped",
                        format!("skipped `{summary}`: {reason}"),
                    )
                    .with_line(line),
                );
            }
        }
    }

    if drafts.is_empty() {
        return Err(ParseError::NoCreateTable);
    }

    let mut schema = Schema::new(dialect);
    for draft in &drafts {
        schema
            .tables
            .push(build_columns(draft, dialect, &enum_types, diagnostics)?);
    }

    for (table, draft) in schema.tables.iter_mut().zip(&drafts) {
        table.constraints = local_constraints(table, &draft.constraints)?;
    }

    for idx in 0..schema.tables.len() {
        let resolved = resolve_foreign_keys(&schema.tables, idx)?;
        let table = &mut schema.tables[idx];
        table.constraints = resolved;
        table.constraints.sort_by_key(Constraint::kind_rank);
        apply_column_flags(table, dialect);
    }

    validate_schema(&schema)?;
    Ok(schema)
}

fn find_draft<'d>(
    drafts: &'d mut [TableDraft],
    name: &str,
    context: &str,
) -> Result<&'d mut TableDraft, ParseError> {
    drafts
        .iter_mut()
        .find(|draft| draft.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ParseError::UnknownTable {
            table: name.to_string(),
            context: context.to_string(),
        })
}

fn build_columns(
    draft: &TableDraft,
    dialect: Dialect,
    enum_types: &BTreeMap<String, Vec<String>>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> Result<Table, ParseError> {
    let mut table = Table::new(draft.name.clone());
    table.quoted = draft.quoted;
    for (idx, column) in draft.columns.iter().enumerate() {
        if table.column(&column.name).is_some() {
            return Err(ParseError::DuplicateColumn {
                table: draft.name.clone(),
                column: column.name.clone(),
            });
        }

        let data_type = column_type(&draft.name, column, dialect, enum_types, diagnostics);
        table.columns.push(Column {
            ordinal_position: (idx + 1) as u16,
            name: column.name.clone(),
            quoted: column.quoted,
            raw_type: column
                .spec
                .as_ref()
                .map(|spec| spec.raw.clone())
                .unwrap_or_default(),
            data_type,
            is_nullable: column.nullable.unwrap_or(true),
            is_primary_key: false,
            is_unique: false,
            default: column.default.clone(),
        });
    }
    Ok(table)
}

fn column_type(
    table: &str,
    column: &ColumnDraft,
    dialect: Dialect,
    enum_types: &BTreeMap<String, Vec<String>>,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> DataType {
    let Some(spec) = &column.spec else {
        return DataType::text();
    };

    let mut data_type = match normalize_type(spec, dialect) {
        Some(data_type) => data_type,
        None => match spec.words.as_slice() {
            [name] if !spec.is_array && enum_types.contains_key(name) => DataType::Enum {
                values: enum_types[name].clone(),
            },
            _ => {
                warn!(table, column = %column.name, raw_type = %spec.raw, "unrecognized column type");
                diagnostics.push(
                    ParseDiagnostic::warning(
                        "unknown_type",
                        format!("type `{}` is not recognized and is kept as opaque text", spec.raw),
                    )
                    .with_table(table)
                    .with_column(&column.name)
                    .with_line(column.line),
                );
                DataType::Opaque {
                    raw: spec.raw.clone(),
                }
            }
        },
    };

    if column.auto_increment
        && let DataType::Integer { auto_increment, .. } = &mut data_type
    {
        *auto_increment = true;
    }
    data_type
}

/// Map constraint column names to their declared spelling.
fn canonical_columns(table: &Table, names: &[String], context: &str) -> Result<Vec<String>, ParseError> {
    names
        .iter()
        .map(|name| {
            table
                .column(name)
                .map(|column| column.name.clone())
                .ok_or_else(|| ParseError::UnknownColumn {
                    table: table.name.clone(),
                    column: name.clone(),
                    context: context.to_string(),
                })
        })
        .collect()
}

/// Resolve local column names, merge primary keys and drop repeated uniques.
fn local_constraints(table: &Table, drafts: &[Constraint]) -> Result<Vec<Constraint>, ParseError> {
    let mut primary_key: Option<PrimaryKey> = None;
    let mut constraints = Vec::new();

    for draft in drafts {
        match draft {
            Constraint::PrimaryKey(pk) => {
                let columns = canonical_columns(table, &pk.columns, "primary key")?;
                match &mut primary_key {
                    None => {
                        primary_key = Some(PrimaryKey {
                            name: pk.name.clone(),
                            columns,
                        });
                    }
                    Some(existing) if existing.columns == columns => {
                        if existing.name.is_none() {
                            existing.name = pk.name.clone();
                        }
                    }
                    Some(_) => {
                        return Err(ParseError::ConflictingPrimaryKey {
                            table: table.name.clone(),
                        });
                    }
                }
            }
            Constraint::Unique(unique) => {
                let columns = canonical_columns(table, &unique.columns, "unique constraint")?;
                let repeated = constraints.iter().any(|existing| {
                    matches!(existing, Constraint::Unique(other) if same_columns(&other.columns, &columns))
                });
                if !repeated {
                    let mut unique = unique.clone();
                    unique.columns = columns;
                    constraints.push(Constraint::Unique(unique));
                }
            }
            Constraint::ForeignKey(fk) => {
                let mut fk = fk.clone();
                fk.columns = canonical_columns(table, &fk.columns, &format!("foreign key {}", fk.label()))?;
                constraints.push(Constraint::ForeignKey(fk));
            }
            Constraint::Check(check) => constraints.push(Constraint::Check(check.clone())),
        }
    }

    if let Some(pk) = primary_key {
        constraints.insert(0, Constraint::PrimaryKey(pk));
    }
    Ok(constraints)
}

fn resolve_foreign_keys(tables: &[Table], idx: usize) -> Result<Vec<Constraint>, ParseError> {
    let table = &tables[idx];
    table
        .constraints
        .iter()
        .map(|constraint| match constraint {
            Constraint::ForeignKey(fk) => resolve_foreign_key(tables, table, fk).map(Constraint::ForeignKey),
            other => Ok(other.clone()),
        })
        .collect()
}

fn resolve_foreign_key(tables: &[Table], table: &Table, fk: &ForeignKey) -> Result<ForeignKey, ParseError> {
    let context = format!("foreign key {} on {}", fk.label(), table.name);
    let target = tables
        .iter()
        .find(|candidate| candidate.name.eq_ignore_ascii_case(&fk.referenced_table))
        .ok_or_else(|| ParseError::UnknownTable {
            table: fk.referenced_table.clone(),
            context: context.clone(),
        })?;

    let referenced_columns = if fk.referenced_columns.is_empty() {
        target
            .primary_key()
            .map(|pk| pk.columns.clone())
            .ok_or_else(|| ParseError::InvalidReference {
                table: table.name.clone(),
                message: format!("{context} omits columns but {} has no primary key", target.name),
            })?
    } else {
        canonical_columns(target, &fk.referenced_columns, &context)?
    };

    if referenced_columns.len() != fk.columns.len() {
        return Err(ParseError::InvalidReference {
            table: table.name.clone(),
            message: format!(
                "{context} maps {} columns onto {}",
                fk.columns.len(),
                referenced_columns.len()
            ),
        });
    }

    if !target
        .unique_sets()
        .iter()
        .any(|set| same_columns(set, &referenced_columns))
    {
        return Err(ParseError::InvalidReference {
            table: table.name.clone(),
            message: format!(
                "{context} targets {}({}) which is neither a primary key nor unique",
                target.name,
                referenced_columns.join(", ")
            ),
        });
    }

    Ok(ForeignKey {
        referenced_table: target.name.clone(),
        referenced_columns,
        ..fk.clone()
    })
}

fn apply_column_flags(table: &mut Table, dialect: Dialect) {
    let pk_columns = table
        .primary_key()
        .map(|pk| pk.columns.clone())
        .unwrap_or_default();
    let unique_columns: Vec<String> = table
        .unique_constraints()
        .filter(|unique| unique.columns.len() == 1)
        .map(|unique| unique.columns[0].clone())
        .collect();

    for column in &mut table.columns {
        column.is_primary_key = pk_columns.contains(&column.name);
        column.is_unique = unique_columns.contains(&column.name);
        if column.is_primary_key {
            column.is_nullable = false;
        }
        // SQLite aliases `INTEGER PRIMARY KEY` to the rowid.
        if dialect == Dialect::Sqlite
            && pk_columns.len() == 1
            && column.is_primary_key
            && column.raw_type.eq_ignore_ascii_case("integer")
            && let DataType::Integer { auto_increment, .. } = &mut column.data_type
        {
            *auto_increment = true;
        }
    }
}
