use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use datafill_core::{Column, Constraint, GenerationOrder, Schema, Table, validate_schema};
use datafill_plan::{GenerationConfig, validate_config_against_schema};

use crate::errors::{GenerationError, StrategyError};
use crate::foreign::{ForeignKeyFiller, ParentRows};
use crate::generators::GeneratorRegistry;
use crate::model::{
    GeneratedDataset, GeneratedTable, GenerationIssue, GenerationReport, Row, TableReport,
};
use crate::planner::{GenerationTask, plan_tables};
use crate::strategy::{ColumnStrategy, PoolDraw, ResolvedColumn, RowContext, StrategyMap, resolve};

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub dataset: GeneratedDataset,
    pub order: GenerationOrder,
    pub report: GenerationReport,
}

/// Entry point for generating datasets from a schema and a config.
#[derive(Debug)]
pub struct GenerationEngine {
    registry: GeneratorRegistry,
    base_date: NaiveDate,
}

impl Default for GenerationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a dataset with the built-in generators.
pub fn generate(
    schema: &Schema,
    config: &GenerationConfig,
) -> Result<GenerationResult, GenerationError> {
    GenerationEngine::new().run(schema, config)
}

impl GenerationEngine {
    pub fn new() -> Self {
        Self::with_registry(GeneratorRegistry::new())
    }

    pub fn with_registry(registry: GeneratorRegistry) -> Self {
        Self {
            registry,
            base_date: base_date(),
        }
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// Fill every table in dependency order. Nothing is returned on error.
    pub fn run(
        &self,
        schema: &Schema,
        config: &GenerationConfig,
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let seed = config.seed.unwrap_or_else(rand::random);

        info!(tables = schema.tables.len(), seed, "generation started");
        match self.run_inner(schema, config, seed) {
            Ok(mut result) => {
                result.report.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    tables = result.report.tables.len(),
                    rows = result.dataset.total_rows(),
                    retries = result.report.retries_total,
                    duration_ms = result.report.duration_ms,
                    "generation completed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(seed, error = %err, "generation failed");
                Err(err)
            }
        }
    }

    fn run_inner(
        &self,
        schema: &Schema,
        config: &GenerationConfig,
        seed: u64,
    ) -> Result<GenerationResult, GenerationError> {
        validate_schema(schema)?;
        let validation = validate_config_against_schema(config, schema);
        if !validation.is_ok() {
            let messages: Vec<String> = validation.errors.iter().map(ToString::to_string).collect();
            return Err(GenerationError::InvalidConfig(messages.join("; ")));
        }

        let (order, tasks) = plan_tables(schema, config)?;
        let strategies = resolve(schema, config, &self.registry)?;

        let mut report = GenerationReport::new(seed);
        for issue in &validation.warnings {
            report.record_issue(
                GenerationIssue::warning(&issue.code, issue.message.clone()),
            );
        }
        for edge in &order.deferred {
            let issue = GenerationIssue::warning(
                "fk_deferred",
                format!(
                    "foreign key {} references '{}', which is generated later; its columns are left null",
                    edge.foreign_key, edge.referenced_table
                ),
            )
            .for_table(&edge.table);
            log_issue(&issue);
            report.record_issue(issue);
        }

        let mut parents = ParentRows::new();
        for task in &tasks {
            let table = schema.table(&task.table).ok_or_else(|| {
                GenerationError::InvalidConfig(format!("table '{}' not found in schema", task.table))
            })?;
            let table_start = Instant::now();
            info!(table = %table.name, rows = task.rows, "generating table");

            record_table_issues(table, &strategies, task, &mut report);
            let outcome = self.generate_table(
                table,
                task.rows,
                strategies.table(&table.name),
                &order,
                config,
                &parents,
                seed,
            )?;

            report.tables.push(TableReport {
                table: table.name.clone(),
                rows_requested: task.rows,
                rows_generated: outcome.rows.len() as u64,
                retries: outcome.retries,
            });
            report.retries_total += outcome.retries;
            info!(
                table = %table.name,
                rows_generated = outcome.rows.len(),
                retries = outcome.retries,
                duration_ms = table_start.elapsed().as_millis() as u64,
                "table generated"
            );
            parents.ingest(&table.name, outcome.rows);
        }

        let dataset = GeneratedDataset {
            tables: tasks
                .iter()
                .map(|task| GeneratedTable {
                    name: task.table.clone(),
                    rows: parents.take(&task.table).unwrap_or_default(),
                })
                .collect(),
        };

        Ok(GenerationResult {
            dataset,
            order,
            report,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_table(
        &self,
        table: &Table,
        rows: u64,
        strategies: &[ResolvedColumn],
        order: &GenerationOrder,
        config: &GenerationConfig,
        parents: &ParentRows,
        seed: u64,
    ) -> Result<TableOutcome, GenerationError> {
        let table_seed = hash_seed(seed, &table.name.to_lowercase());
        let mut table_rng = ChaCha8Rng::seed_from_u64(table_seed);
        let mut filler = ForeignKeyFiller::new(
            table,
            order,
            parents,
            config.self_reference_offset(&table.name),
            rows,
            &mut table_rng,
        )?;
        for label in filler.null_foreign_keys() {
            debug!(table = %table.name, foreign_key = %label, "foreign key left null");
        }
        let mut decks = build_decks(table, strategies, rows, &mut table_rng)?;
        let mut unique_sets: Vec<UniqueSet> = table.unique_sets().into_iter().map(UniqueSet::new).collect();
        let columns = resolved_columns(table, strategies)?;
        let max_attempts = config.max_attempts_row.max(1);

        let mut rows_out: Vec<Row> = Vec::with_capacity(row_capacity(rows));
        let mut retries = 0_u64;

        for row_index in 0..rows {
            let mut attempt = 0_u32;
            loop {
                attempt += 1;
                let mut rng =
                    ChaCha8Rng::seed_from_u64(hash_row_seed(table_seed, row_index, attempt));
                let mut row = Row::new();
                filler.fill(&mut row, row_index, &rows_out, &mut rng);

                for &(column, strategy) in &columns {
                    if row.contains(&column.name) {
                        continue;
                    }
                    let draw_index = decks
                        .get(&column.name.to_lowercase())
                        .map(Deck::current)
                        .unwrap_or(0);
                    let mut ctx = RowContext {
                        table: &table.name,
                        column,
                        row_index,
                        draw_index,
                        registry: &self.registry,
                        base_date: self.base_date,
                        rng: &mut rng,
                    };
                    let value = strategy.produce(&mut ctx).map_err(|source| {
                        GenerationError::Strategy {
                            table: table.name.clone(),
                            column: column.name.clone(),
                            row_index,
                            source,
                        }
                    })?;
                    row.set(&column.name, value);
                }

                if let Some(column) = first_null_violation(table, &row) {
                    if attempt >= max_attempts {
                        return Err(GenerationError::Strategy {
                            table: table.name.clone(),
                            column: column.name.clone(),
                            row_index,
                            source: StrategyError::Unsupported(
                                "produced NULL for a NOT NULL column".to_string(),
                            ),
                        });
                    }
                    retries += 1;
                    continue;
                }

                if let Some(set) = unique_sets.iter().find(|set| set.conflicts(&row)) {
                    if attempt >= max_attempts {
                        return Err(GenerationError::UniquenessViolation {
                            table: table.name.clone(),
                            columns: set.columns.clone(),
                            row_index,
                            attempts: attempt,
                        });
                    }
                    retries += 1;
                    continue;
                }

                for set in &mut unique_sets {
                    set.insert(&row);
                }
                filler.commit();
                for deck in decks.values_mut() {
                    deck.cursor += 1;
                }
                rows_out.push(row);
                break;
            }
        }

        Ok(TableOutcome {
            rows: rows_out,
            retries,
        })
    }
}

/// Upper bound on rows reserved up front for one table.
const PREALLOCATED_ROWS: u64 = 1 << 16;

fn row_capacity(rows: u64) -> usize {
    rows.min(PREALLOCATED_ROWS) as usize
}

struct TableOutcome {
    rows: Vec<Row>,
    retries: u64,
}

/// Anchor for date defaults, shared with previews.
pub(crate) fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// Columns in declaration order paired with their strategies, foreign keys
/// excluded.
fn resolved_columns<'a>(
    table: &'a Table,
    strategies: &'a [ResolvedColumn],
) -> Result<Vec<(&'a Column, &'a ColumnStrategy)>, GenerationError> {
    strategies
        .iter()
        .filter(|resolved| !matches!(resolved.strategy, ColumnStrategy::ForeignKey { .. }))
        .map(|resolved| {
            table
                .column(&resolved.column)
                .map(|column| (column, &resolved.strategy))
                .ok_or_else(|| {
                    GenerationError::InvalidConfig(format!(
                        "column '{}.{}' not found in schema",
                        table.name, resolved.column
                    ))
                })
        })
        .collect()
}

/// Shuffled pool order for dealt columns.
struct Deck {
    order: Vec<usize>,
    cursor: usize,
}

impl Deck {
    fn current(&self) -> usize {
        self.order.get(self.cursor).copied().unwrap_or(usize::MAX)
    }
}

fn build_decks(
    table: &Table,
    strategies: &[ResolvedColumn],
    rows: u64,
    rng: &mut ChaCha8Rng,
) -> Result<HashMap<String, Deck>, GenerationError> {
    let mut decks = HashMap::new();
    for resolved in strategies {
        let ColumnStrategy::FixedPool {
            values,
            draw: PoolDraw::Deal,
            ..
        } = &resolved.strategy
        else {
            continue;
        };
        if (values.len() as u64) < rows {
            return Err(GenerationError::InsufficientPool {
                table: table.name.clone(),
                column: resolved.column.clone(),
                pool_size: values.len(),
                required: rows,
            });
        }
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.shuffle(rng);
        decks.insert(resolved.column.to_lowercase(), Deck { order, cursor: 0 });
    }
    Ok(decks)
}

fn first_null_violation<'a>(table: &'a Table, row: &Row) -> Option<&'a Column> {
    table.columns.iter().find(|column| {
        !column.is_nullable && row.get(&column.name).is_none_or(|value| value.is_null())
    })
}

fn record_table_issues(
    table: &Table,
    strategies: &StrategyMap,
    task: &GenerationTask,
    report: &mut GenerationReport,
) {
    for resolved in strategies.table(&table.name) {
        report.record_strategy(resolved.strategy.kind().as_str());
        if let Some(id) = resolved.strategy.generator_id() {
            report.record_generator_usage(id, task.rows);
        }
        if let ColumnStrategy::FuzzyGuess { id, entry, score } = &resolved.strategy {
            report.record_issue(
                GenerationIssue::info(
                    "fuzzy_guess",
                    format!("matched catalog entry '{entry}' with score {score:.3}"),
                )
                .for_column(&table.name, &resolved.column)
                .with_generator(id),
            );
        }
    }

    let checks = table
        .constraints
        .iter()
        .filter(|constraint| matches!(constraint, Constraint::Check(_)))
        .count();
    if checks > 0 {
        report.record_issue(
            GenerationIssue::info(
                "check_not_enforced",
                format!("{checks} CHECK constraint(s) are not evaluated during generation"),
            )
            .for_table(&table.name),
        );
    }
}

fn log_issue(issue: &GenerationIssue) {
    warn!(
        code = %issue.code,
        table = issue.table.as_deref().unwrap_or("-"),
        column = issue.column.as_deref().unwrap_or("-"),
        "{}",
        issue.message
    );
}

/// Seen keys of one unique column set. Rows with a NULL in the set are
/// never in conflict.
struct UniqueSet {
    columns: Vec<String>,
    seen: HashSet<String>,
}

impl UniqueSet {
    fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            seen: HashSet::new(),
        }
    }

    fn key_for(&self, row: &Row) -> Option<String> {
        let mut key_parts = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = row.get(column)?;
            if value.is_null() {
                return None;
            }
            key_parts.push(value.unique_key());
        }
        Some(key_parts.join("|"))
    }

    fn conflicts(&self, row: &Row) -> bool {
        self.key_for(row)
            .is_some_and(|key| self.seen.contains(&key))
    }

    fn insert(&mut self, row: &Row) {
        if let Some(key) = self.key_for(row) {
            self.seen.insert(key);
        }
    }
}

pub(crate) fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn hash_row_seed(table_seed: u64, row_index: u64, attempt: u32) -> u64 {
    let mut hash = table_seed ^ row_index.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= attempt as u64;
    hash = hash.wrapping_mul(0x100000001b3);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::GeneratedValue;

    #[test]
    fn row_reservation_is_capped() {
        assert_eq!(row_capacity(20), 20);
        assert_eq!(row_capacity(u64::MAX), 1 << 16);
    }

    #[test]
    fn seeds_differ_per_table_and_attempt() {
        assert_ne!(hash_seed(42, "authors"), hash_seed(42, "books"));
        assert_ne!(hash_seed(1, "authors"), hash_seed(2, "authors"));
        let table = hash_seed(42, "authors");
        assert_ne!(hash_row_seed(table, 0, 1), hash_row_seed(table, 0, 2));
        assert_ne!(hash_row_seed(table, 0, 1), hash_row_seed(table, 1, 1));
    }

    #[test]
    fn unique_sets_ignore_rows_with_nulls() {
        let mut set = UniqueSet::new(vec!["a".to_string(), "b".to_string()]);
        let mut row = Row::new();
        row.set("a", GeneratedValue::Int(1));
        row.set("b", GeneratedValue::Text("x".to_string()));
        assert!(!set.conflicts(&row));
        set.insert(&row);
        assert!(set.conflicts(&row));

        let mut with_null = Row::new();
        with_null.set("a", GeneratedValue::Int(1));
        with_null.set("b", GeneratedValue::Null);
        set.insert(&with_null);
        assert!(!set.conflicts(&with_null));
    }

    #[test]
    fn text_and_numbers_do_not_collide() {
        let set = {
            let mut set = UniqueSet::new(vec!["v".to_string()]);
            let mut row = Row::new();
            row.set("v", GeneratedValue::Int(1));
            set.insert(&row);
            set
        };
        let mut row = Row::new();
        row.set("v", GeneratedValue::Text("1".to_string()));
        assert!(!set.conflicts(&row));
    }
}
