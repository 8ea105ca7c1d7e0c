//! Column strategy resolution.
//!
//! Key columns bypass the config: primary keys follow a per-table sequence
//! and foreign keys copy values from parent rows. Every other column takes
//! the first match of: predefined pool, explicit mapping, fuzzy guess, type
//! default.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use rand::RngCore;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use datafill_core::{Column, DataType, Schema, Table};
use datafill_plan::{ConfigScope, GenerationConfig};

use crate::catalog;
use crate::errors::{GenerationError, StrategyError};
use crate::generators::primitives::{fit_text, lorem_words, random_date, random_time, random_uuid};
use crate::generators::{GeneratedValue, GeneratorContext, GeneratorRegistry, round_to_scale};

const DEFAULT_INT_MAX: i64 = 10_000;
const DEFAULT_DECIMAL_DIGITS: u32 = 6;
const MAX_CHAR_LETTERS: u32 = 16;

/// Kind of a resolved strategy, as reported in previews and run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    PrimaryKey,
    ForeignKey,
    FixedPool,
    NamedGenerator,
    FuzzyGuess,
    TypeDefault,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::PrimaryKey => "primary_key",
            StrategyKind::ForeignKey => "foreign_key",
            StrategyKind::FixedPool => "fixed_pool",
            StrategyKind::NamedGenerator => "named_generator",
            StrategyKind::FuzzyGuess => "fuzzy_guess",
            StrategyKind::TypeDefault => "type_default",
        }
    }
}

/// How a pool is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolDraw {
    /// Uniform draw with replacement.
    Random,
    /// Shuffled once per table and dealt without replacement.
    Deal,
}

/// How values of one column are produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStrategy {
    PrimaryKey,
    ForeignKey {
        foreign_key: String,
        referenced_table: String,
        referenced_column: String,
    },
    FixedPool {
        values: Vec<GeneratedValue>,
        scope: ConfigScope,
        draw: PoolDraw,
    },
    NamedGenerator {
        id: String,
        params: Option<Value>,
        source: ConfigScope,
    },
    FuzzyGuess {
        id: String,
        entry: &'static str,
        score: f64,
    },
    TypeDefault,
}

/// Inputs for producing one value.
pub struct RowContext<'a> {
    pub table: &'a str,
    pub column: &'a Column,
    pub row_index: u64,
    /// Pool index for dealt pools; ignored by other strategies.
    pub draw_index: usize,
    pub registry: &'a GeneratorRegistry,
    pub base_date: NaiveDate,
    pub rng: &'a mut dyn RngCore,
}

impl<'a> RowContext<'a> {
    fn generator_context(&self) -> GeneratorContext<'a> {
        GeneratorContext {
            table: self.table,
            column: self.column,
            row_index: self.row_index,
            base_date: self.base_date,
        }
    }
}

impl ColumnStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ColumnStrategy::PrimaryKey => StrategyKind::PrimaryKey,
            ColumnStrategy::ForeignKey { .. } => StrategyKind::ForeignKey,
            ColumnStrategy::FixedPool { .. } => StrategyKind::FixedPool,
            ColumnStrategy::NamedGenerator { .. } => StrategyKind::NamedGenerator,
            ColumnStrategy::FuzzyGuess { .. } => StrategyKind::FuzzyGuess,
            ColumnStrategy::TypeDefault => StrategyKind::TypeDefault,
        }
    }

    /// Registry id backing the strategy, if any.
    pub fn generator_id(&self) -> Option<&str> {
        match self {
            ColumnStrategy::NamedGenerator { id, .. } | ColumnStrategy::FuzzyGuess { id, .. } => {
                Some(id.as_str())
            }
            _ => None,
        }
    }

    /// Produce one value. Foreign keys are filled from parent rows by the
    /// engine and cannot be produced here.
    pub fn produce(&self, ctx: &mut RowContext<'_>) -> Result<GeneratedValue, StrategyError> {
        match self {
            ColumnStrategy::PrimaryKey => {
                primary_key_value(ctx.column, ctx.row_index, ctx.base_date)
            }
            ColumnStrategy::ForeignKey { foreign_key, .. } => Err(StrategyError::Unsupported(
                format!("foreign key {foreign_key} is filled from parent rows"),
            )),
            ColumnStrategy::FixedPool { values, draw, .. } => match draw {
                PoolDraw::Random => values
                    .choose(&mut *ctx.rng)
                    .cloned()
                    .ok_or(StrategyError::PoolExhausted { size: 0 }),
                PoolDraw::Deal => values
                    .get(ctx.draw_index)
                    .cloned()
                    .ok_or(StrategyError::PoolExhausted { size: values.len() }),
            },
            ColumnStrategy::NamedGenerator { id, params, .. } => {
                let generator = ctx
                    .registry
                    .generator(id)
                    .ok_or_else(|| StrategyError::UnknownGenerator(id.clone()))?;
                let gen_ctx = ctx.generator_context();
                generator.generate(&gen_ctx, params.as_ref(), &mut *ctx.rng)
            }
            ColumnStrategy::FuzzyGuess { id, .. } => {
                let generator = ctx
                    .registry
                    .generator(id)
                    .ok_or_else(|| StrategyError::UnknownGenerator(id.clone()))?;
                let gen_ctx = ctx.generator_context();
                generator.generate(&gen_ctx, None, &mut *ctx.rng)
            }
            ColumnStrategy::TypeDefault => {
                type_default(ctx.column, ctx.row_index, ctx.base_date, &mut *ctx.rng)
            }
        }
    }
}

/// Resolved strategy of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn {
    pub column: String,
    pub strategy: ColumnStrategy,
}

/// Strategies per table, columns in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyMap {
    tables: BTreeMap<String, Vec<ResolvedColumn>>,
}

impl StrategyMap {
    pub fn table(&self, table: &str) -> &[ResolvedColumn] {
        self.tables
            .get(&table.to_lowercase())
            .map(|columns| columns.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, table: &str, column: &str) -> Option<&ColumnStrategy> {
        self.table(table)
            .iter()
            .find(|resolved| resolved.column.eq_ignore_ascii_case(column))
            .map(|resolved| &resolved.strategy)
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, table: &str, resolved: Vec<ResolvedColumn>) {
        self.tables.insert(table.to_lowercase(), resolved);
    }
}

/// Resolve a strategy for every column of every table.
pub fn resolve(
    schema: &Schema,
    config: &GenerationConfig,
    registry: &GeneratorRegistry,
) -> Result<StrategyMap, GenerationError> {
    let mut map = StrategyMap::default();
    for table in &schema.tables {
        let mut columns: Vec<&Column> = table.columns.iter().collect();
        columns.sort_by_key(|column| column.ordinal_position);

        let mut resolved = Vec::with_capacity(columns.len());
        for column in columns {
            let strategy = resolve_column(table, column, config, registry)?;
            debug!(
                table = %table.name,
                column = %column.name,
                strategy = strategy.kind().as_str(),
                generator_id = strategy.generator_id().unwrap_or("-"),
                "strategy resolved"
            );
            resolved.push(ResolvedColumn {
                column: column.name.clone(),
                strategy,
            });
        }
        map.insert(&table.name, resolved);
    }
    Ok(map)
}

fn resolve_column(
    table: &Table,
    column: &Column,
    config: &GenerationConfig,
    registry: &GeneratorRegistry,
) -> Result<ColumnStrategy, GenerationError> {
    if let Some(fk) = table.foreign_key_for(&column.name) {
        let position = fk
            .columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(&column.name))
            .unwrap_or(0);
        let referenced_column = fk.referenced_columns.get(position).cloned().ok_or_else(|| {
            GenerationError::Schema(datafill_core::Error::InvalidSchema(format!(
                "foreign key {} on '{}' has no referenced column for '{}'",
                fk.label(),
                table.name,
                column.name
            )))
        })?;
        return Ok(ColumnStrategy::ForeignKey {
            foreign_key: fk.label(),
            referenced_table: fk.referenced_table.clone(),
            referenced_column,
        });
    }

    if table.is_primary_key_column(&column.name) {
        return Ok(ColumnStrategy::PrimaryKey);
    }

    if let Some((values, scope)) = config.pool_for(&table.name, &column.name) {
        let unique = column.is_unique || table.is_unique_tuple(std::slice::from_ref(&column.name));
        return Ok(ColumnStrategy::FixedPool {
            values: values
                .iter()
                .map(|value| GeneratedValue::from_pool(value, &column.data_type))
                .collect(),
            scope,
            draw: if unique { PoolDraw::Deal } else { PoolDraw::Random },
        });
    }

    if let Some((generator_ref, source)) = config.mapping_for(&table.name, &column.name) {
        let generator = registry.generator(generator_ref.id()).ok_or_else(|| {
            GenerationError::UnknownGenerator {
                table: table.name.clone(),
                column: column.name.clone(),
                id: generator_ref.id().to_string(),
            }
        })?;
        generator
            .validate(generator_ref.params())
            .map_err(|source| GenerationError::InvalidParams {
                table: table.name.clone(),
                column: column.name.clone(),
                source,
            })?;
        return Ok(ColumnStrategy::NamedGenerator {
            id: generator.id().to_string(),
            params: generator_ref.params().cloned(),
            source,
        });
    }

    if config.guess_enabled
        && let Some(hit) = catalog::guess(&column.name, &column.data_type, config.guess_threshold)
        && registry.contains(hit.entry.generator_id)
    {
        return Ok(ColumnStrategy::FuzzyGuess {
            id: hit.entry.generator_id.to_string(),
            entry: hit.entry.name,
            score: hit.score,
        });
    }

    Ok(ColumnStrategy::TypeDefault)
}

/// Deterministic key value for row `row_index` (0-based).
pub fn primary_key_value(
    column: &Column,
    row_index: u64,
    base_date: NaiveDate,
) -> Result<GeneratedValue, StrategyError> {
    let ordinal = row_index + 1;
    let value = match &column.data_type {
        DataType::Integer { width, .. } => {
            let value = i64::try_from(ordinal).unwrap_or(i64::MAX);
            if value > width.max_value() {
                return Err(key_space_exhausted(column, row_index));
            }
            GeneratedValue::Int(value)
        }
        DataType::Decimal { .. } | DataType::Float => {
            GeneratedValue::Int(i64::try_from(ordinal).unwrap_or(i64::MAX))
        }
        DataType::Uuid => GeneratedValue::Uuid(uuid::Uuid::from_u128(u128::from(ordinal)).to_string()),
        DataType::Date => GeneratedValue::Date(base_date + Duration::days(row_index as i64)),
        DataType::Timestamp => GeneratedValue::Timestamp(NaiveDateTime::new(
            base_date + Duration::days(row_index as i64),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
        )),
        DataType::Time => {
            if row_index >= 86_400 {
                return Err(key_space_exhausted(column, row_index));
            }
            GeneratedValue::Time(
                NaiveTime::from_num_seconds_from_midnight_opt(row_index as u32, 0)
                    .unwrap_or_default(),
            )
        }
        DataType::Boolean => match row_index {
            0 => GeneratedValue::Bool(false),
            1 => GeneratedValue::Bool(true),
            _ => return Err(key_space_exhausted(column, row_index)),
        },
        DataType::Enum { values } => values
            .get(row_index as usize)
            .cloned()
            .map(GeneratedValue::Text)
            .ok_or_else(|| key_space_exhausted(column, row_index))?,
        DataType::Text { .. } | DataType::Char { .. } | DataType::Opaque { .. } => {
            let width = column.data_type.max_chars().unwrap_or(10).min(10) as usize;
            let value = format!("{ordinal:0width$}");
            if value.chars().count() > width {
                return Err(key_space_exhausted(column, row_index));
            }
            GeneratedValue::Text(value)
        }
    };
    Ok(value)
}

fn key_space_exhausted(column: &Column, row_index: u64) -> StrategyError {
    StrategyError::Unsupported(format!(
        "key space of {} ({}) is exhausted at row {row_index}",
        column.name, column.raw_type
    ))
}

/// Value keyed only on the column type.
pub fn type_default(
    column: &Column,
    row_index: u64,
    base_date: NaiveDate,
    rng: &mut dyn RngCore,
) -> Result<GeneratedValue, StrategyError> {
    let value = match &column.data_type {
        DataType::Integer {
            width,
            auto_increment,
        } => {
            if *auto_increment {
                GeneratedValue::Int(i64::try_from(row_index + 1).unwrap_or(i64::MAX))
            } else {
                GeneratedValue::Int(rng.random_range(1..=DEFAULT_INT_MAX.min(width.max_value())))
            }
        }
        DataType::Decimal { precision, scale } => {
            let scale = scale.unwrap_or(0);
            let digits = precision
                .unwrap_or(10)
                .saturating_sub(scale)
                .min(DEFAULT_DECIMAL_DIGITS);
            let max = 10_f64.powi(digits as i32) - 10_f64.powi(-(scale.min(12) as i32));
            let value = if max > 0.0 { rng.random_range(0.0..=max) } else { 0.0 };
            GeneratedValue::Float(round_to_scale(value, scale).min(max))
        }
        DataType::Float => GeneratedValue::Float(round_to_scale(
            rng.random_range(0.0..=DEFAULT_INT_MAX as f64),
            2,
        )),
        DataType::Text { max_length } => {
            GeneratedValue::Text(fit_text(lorem_words(rng, 1, 6), *max_length))
        }
        DataType::Char { length } => {
            let count = length.unwrap_or(1).clamp(1, MAX_CHAR_LETTERS);
            GeneratedValue::Text(
                (0..count)
                    .map(|_| char::from(rng.random_range(b'A'..=b'Z')))
                    .collect(),
            )
        }
        DataType::Date => {
            let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
            GeneratedValue::Date(random_date(rng, start, base_date))
        }
        DataType::Time => GeneratedValue::Time(random_time(rng)),
        DataType::Timestamp => {
            let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default();
            let date = random_date(rng, start, base_date);
            GeneratedValue::Timestamp(NaiveDateTime::new(date, random_time(rng)))
        }
        DataType::Boolean => GeneratedValue::Bool(rng.random_bool(0.5)),
        DataType::Uuid => GeneratedValue::Uuid(random_uuid(rng)),
        DataType::Enum { values } => values
            .choose(rng)
            .cloned()
            .map(GeneratedValue::Text)
            .ok_or_else(|| StrategyError::Unsupported(format!("enum column {} has no values", column.name)))?,
        DataType::Opaque { .. } => GeneratedValue::Text(format!("{}_{}", column.name, row_index + 1)),
    };
    Ok(value)
}
