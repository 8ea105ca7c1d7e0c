//! Strategy preview: which strategy each column gets, with a few sample
//! values, without running a full generation.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::Value;

use datafill_core::{Schema, Table};
use datafill_plan::GenerationConfig;

use crate::engine::{base_date, hash_seed};
use crate::errors::GenerationError;
use crate::generators::GeneratorRegistry;
use crate::planner::plan_tables;
use crate::strategy::{ColumnStrategy, PoolDraw, ResolvedColumn, RowContext, StrategyKind, primary_key_value, resolve};

/// Preview of one column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnPreview {
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub strategy: StrategyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub samples: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Column previews in generation order, columns in declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyPreview {
    pub sample_size: usize,
    pub columns: Vec<ColumnPreview>,
}

impl StrategyPreview {
    pub fn get(&self, table: &str, column: &str) -> Option<&ColumnPreview> {
        self.columns.iter().find(|preview| {
            preview.table.eq_ignore_ascii_case(table) && preview.column.eq_ignore_ascii_case(column)
        })
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ColumnPreview> + 'a {
        self.columns
            .iter()
            .filter(move |preview| preview.table.eq_ignore_ascii_case(table))
    }
}

/// Resolve strategies and draw `sample_size` values per column.
pub fn preview_strategies(
    schema: &Schema,
    config: &GenerationConfig,
    sample_size: usize,
) -> Result<StrategyPreview, GenerationError> {
    preview_with_registry(schema, config, &GeneratorRegistry::new(), sample_size)
}

pub fn preview_with_registry(
    schema: &Schema,
    config: &GenerationConfig,
    registry: &GeneratorRegistry,
    sample_size: usize,
) -> Result<StrategyPreview, GenerationError> {
    let (order, _) = plan_tables(schema, config)?;
    let strategies = resolve(schema, config, registry)?;
    let seed = config.seed.unwrap_or_default();

    let mut columns = Vec::new();
    for name in &order.tables {
        let Some(table) = schema.table(name) else {
            continue;
        };
        let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(seed, &table.name.to_lowercase()));
        for resolved in strategies.table(&table.name) {
            columns.push(preview_column(
                table,
                resolved,
                registry,
                sample_size,
                &mut rng,
            )?);
        }
    }

    Ok(StrategyPreview {
        sample_size,
        columns,
    })
}

fn preview_column(
    table: &Table,
    resolved: &ResolvedColumn,
    registry: &GeneratorRegistry,
    sample_size: usize,
    rng: &mut ChaCha8Rng,
) -> Result<ColumnPreview, GenerationError> {
    let column = table.column(&resolved.column).ok_or_else(|| {
        GenerationError::InvalidConfig(format!(
            "column '{}.{}' not found in schema",
            table.name, resolved.column
        ))
    })?;
    let base_date = base_date();
    let strategy = &resolved.strategy;

    let mut preview = ColumnPreview {
        table: table.name.clone(),
        column: column.name.clone(),
        data_type: column.data_type.category().to_string(),
        strategy: strategy.kind(),
        generator_id: strategy.generator_id().map(str::to_string),
        score: None,
        scope: None,
        samples: Vec::new(),
        note: None,
    };

    let strategy_error = |row_index: u64, source| GenerationError::Strategy {
        table: table.name.clone(),
        column: column.name.clone(),
        row_index,
        source,
    };

    match strategy {
        ColumnStrategy::ForeignKey {
            referenced_table,
            referenced_column,
            ..
        } => {
            preview.note = Some(format!("references {referenced_table}({referenced_column})"));
        }
        ColumnStrategy::PrimaryKey => {
            for row_index in 0..sample_size as u64 {
                let value = primary_key_value(column, row_index, base_date)
                    .map_err(|source| strategy_error(row_index, source))?;
                preview.samples.push(value.to_json(column));
            }
        }
        ColumnStrategy::FixedPool {
            values,
            scope,
            draw,
        } => {
            preview.scope = Some(scope.label().to_string());
            match draw {
                PoolDraw::Deal => {
                    let mut deck: Vec<usize> = (0..values.len()).collect();
                    deck.shuffle(rng);
                    preview.samples = deck
                        .iter()
                        .take(sample_size)
                        .map(|index| values[*index].to_json(column))
                        .collect();
                    preview.note = Some(format!(
                        "dealt without replacement from {} value(s)",
                        values.len()
                    ));
                }
                PoolDraw::Random => {
                    preview.samples = sample_values(strategy, table, column, registry, base_date, sample_size, rng)
                        .map_err(|(row_index, source)| strategy_error(row_index, source))?;
                }
            }
        }
        ColumnStrategy::NamedGenerator { source, .. } => {
            preview.scope = Some(source.label().to_string());
            preview.samples = sample_values(strategy, table, column, registry, base_date, sample_size, rng)
                .map_err(|(row_index, source)| strategy_error(row_index, source))?;
        }
        ColumnStrategy::FuzzyGuess { entry, score, .. } => {
            preview.score = Some(*score);
            preview.note = Some(format!("matched catalog entry '{entry}'"));
            preview.samples = sample_values(strategy, table, column, registry, base_date, sample_size, rng)
                .map_err(|(row_index, source)| strategy_error(row_index, source))?;
        }
        ColumnStrategy::TypeDefault => {
            preview.samples = sample_values(strategy, table, column, registry, base_date, sample_size, rng)
                .map_err(|(row_index, source)| strategy_error(row_index, source))?;
        }
    }

    Ok(preview)
}

fn sample_values(
    strategy: &ColumnStrategy,
    table: &Table,
    column: &datafill_core::Column,
    registry: &GeneratorRegistry,
    base_date: chrono::NaiveDate,
    sample_size: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Value>, (u64, crate::errors::StrategyError)> {
    let mut samples = Vec::with_capacity(sample_size);
    for row_index in 0..sample_size as u64 {
        let mut ctx = RowContext {
            table: &table.name,
            column,
            row_index,
            draw_index: 0,
            registry,
            base_date,
            rng: &mut *rng,
        };
        let value = strategy
            .produce(&mut ctx)
            .map_err(|source| (row_index, source))?;
        samples.push(value.to_json(column));
    }
    Ok(samples)
}
