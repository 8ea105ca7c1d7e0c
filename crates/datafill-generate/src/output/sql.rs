use std::fmt::Write as _;

use datafill_core::{Column, Dialect, Schema, Table};

use crate::generators::GeneratedValue;
use crate::model::{GeneratedDataset, Row};

/// Rows per multi-row INSERT statement.
const INSERT_BATCH_SIZE: usize = 500;

/// Words that must be quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "check", "column", "comment", "constraint",
    "create", "date", "default", "delete", "desc", "distinct", "drop", "else", "end", "exists",
    "from", "grant", "group", "having", "in", "index", "insert", "into", "is", "join", "key",
    "level", "like", "limit", "not", "null", "number", "of", "on", "or", "order", "primary",
    "references", "rows", "select", "session", "set", "size", "table", "to", "trigger", "union",
    "unique", "update", "user", "values", "view", "when", "where",
];

/// Render the dataset as INSERT statements in generation order, columns in
/// declared order. Oracle gets one statement per row; other dialects get
/// multi-row statements of up to 500 rows.
pub fn to_sql_inserts(dataset: &GeneratedDataset, schema: &Schema) -> String {
    let dialect = schema.dialect;
    let mut out = String::new();
    for generated in &dataset.tables {
        if generated.rows.is_empty() {
            continue;
        }
        let Some(table) = schema.table(&generated.name) else {
            continue;
        };
        if !out.is_empty() {
            out.push('\n');
        }
        write_table(&mut out, dialect, table, &generated.rows);
    }
    out
}

fn write_table(out: &mut String, dialect: Dialect, table: &Table, rows: &[Row]) {
    let mut columns: Vec<&Column> = table.columns.iter().collect();
    columns.sort_by_key(|col| col.ordinal_position);

    let column_list = columns
        .iter()
        .map(|col| quote_identifier(dialect, &col.name, col.quoted))
        .collect::<Vec<_>>()
        .join(", ");
    let prefix = format!(
        "INSERT INTO {} ({column_list}) VALUES",
        quote_identifier(dialect, &table.name, table.quoted)
    );

    let render_row = |row: &Row| {
        let values = columns
            .iter()
            .map(|col| {
                row.get(&col.name)
                    .map(|value| sql_literal(dialect, col, value))
                    .unwrap_or_else(|| "NULL".to_string())
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("({values})")
    };

    if dialect == Dialect::Oracle {
        for row in rows {
            let _ = writeln!(out, "{prefix} {};", render_row(row));
        }
        return;
    }

    for batch in rows.chunks(INSERT_BATCH_SIZE) {
        out.push_str(&prefix);
        out.push('\n');
        let tuples: Vec<String> = batch.iter().map(|row| format!("  {}", render_row(row))).collect();
        out.push_str(&tuples.join(",\n"));
        out.push_str(";\n");
    }
}

/// Quote an identifier when it is not a plain word, collides with a
/// keyword, or was declared quoted with a spelling the dialect would fold
/// away if left unquoted.
pub fn quote_identifier(dialect: Dialect, name: &str, quoted: bool) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    let folds = quoted && !dialect.keeps_unquoted_spelling(name);
    if plain && !folds && !RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
        return name.to_string();
    }
    let quote = dialect.identifier_quote();
    let escaped = name.replace(quote, &format!("{quote}{quote}"));
    format!("{quote}{escaped}{quote}")
}

/// SQL literal for a value in the given dialect.
pub fn sql_literal(dialect: Dialect, column: &Column, value: &GeneratedValue) -> String {
    match value {
        GeneratedValue::Null => "NULL".to_string(),
        GeneratedValue::Bool(flag) => match (dialect, flag) {
            (Dialect::Postgres, true) => "TRUE".to_string(),
            (Dialect::Postgres, false) => "FALSE".to_string(),
            (_, true) => "1".to_string(),
            (_, false) => "0".to_string(),
        },
        GeneratedValue::Int(_) | GeneratedValue::Float(_) => value.render(column),
        GeneratedValue::Date(_) if dialect == Dialect::Oracle => {
            format!("DATE '{}'", value.render(column))
        }
        GeneratedValue::Timestamp(_) if dialect == Dialect::Oracle => {
            format!("TIMESTAMP '{}'", value.render(column))
        }
        _ => quote_string(dialect, &value.render(column)),
    }
}

fn quote_string(dialect: Dialect, text: &str) -> String {
    let mut escaped = text.replace('\'', "''");
    if dialect == Dialect::Mysql {
        escaped = escaped.replace('\\', "\\\\");
    }
    format!("'{escaped}'")
}
