//! Dependency-aware synthetic data generation for datafill.
//!
//! This crate resolves a value strategy for every column, fills tables in
//! foreign-key order with deterministic seeded RNGs, and renders the
//! resulting dataset as SQL inserts, JSON or CSV.

pub mod catalog;
pub mod engine;
pub mod errors;
pub mod foreign;
pub mod generators;
pub mod model;
pub mod output;
pub mod params;
pub mod planner;
pub mod preview;
pub mod strategy;

pub use catalog::{CATALOG, CatalogEntry, CatalogMatch, best_match};
pub use engine::{GenerationEngine, GenerationResult, generate};
pub use errors::{GenerationError, StrategyError};
pub use generators::{GeneratedValue, Generator, GeneratorRegistry};
pub use model::{
    GeneratedDataset, GeneratedTable, GenerationIssue, GenerationReport, Row, TableReport,
};
pub use output::{TableFormat, to_sql_inserts, to_table_files, write_table_files};
pub use preview::{ColumnPreview, StrategyPreview, preview_strategies, preview_with_registry};
pub use strategy::{
    ColumnStrategy, PoolDraw, ResolvedColumn, RowContext, StrategyKind, StrategyMap, resolve,
};
