use datafill_core::{GenerationOrder, Schema, plan_order};
use datafill_plan::GenerationConfig;

use crate::errors::GenerationError;

/// Planned generation task for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub table: String,
    pub rows: u64,
}

/// Dependency order plus the row count of every table, in that order.
pub fn plan_tables(
    schema: &Schema,
    config: &GenerationConfig,
) -> Result<(GenerationOrder, Vec<GenerationTask>), GenerationError> {
    if schema.tables.is_empty() {
        return Err(GenerationError::InvalidConfig(
            "schema has no tables to generate".to_string(),
        ));
    }

    let order = plan_order(schema)?;
    let tasks = order
        .tables
        .iter()
        .map(|table| GenerationTask {
            table: table.clone(),
            rows: config.rows_for(table),
        })
        .collect();
    Ok((order, tasks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafill_core::Dialect;

    #[test]
    fn rows_follow_overrides_and_default() {
        let schema = datafill_parse::parse_schema(
            "CREATE TABLE authors (id INT PRIMARY KEY);
             CREATE TABLE books (id INT PRIMARY KEY, author_id INT NOT NULL REFERENCES authors(id));",
            Dialect::Postgres,
        )
        .unwrap();
        let mut config = GenerationConfig::default();
        config.num_rows_per_table.insert("BOOKS".to_string(), 20);
        config.default_num_rows = 5;

        let (order, tasks) = plan_tables(&schema, &config).unwrap();
        assert_eq!(order.tables, vec!["authors", "books"]);
        assert_eq!(
            tasks,
            vec![
                GenerationTask {
                    table: "authors".to_string(),
                    rows: 5
                },
                GenerationTask {
                    table: "books".to_string(),
                    rows: 20
                },
            ]
        );
    }

    #[test]
    fn empty_schema_is_rejected() {
        let schema = Schema::new(Dialect::Sqlite);
        assert!(matches!(
            plan_tables(&schema, &GenerationConfig::default()),
            Err(GenerationError::InvalidConfig(_))
        ));
    }
}
