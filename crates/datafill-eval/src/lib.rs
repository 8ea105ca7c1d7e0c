//! Integrity evaluation for generated datasets.
//!
//! Checks a dataset against the key, uniqueness and NOT NULL constraints of
//! its schema, summarizes the schema itself, and renders both as a
//! markdown report.

pub mod engine;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod report;
pub mod schema_metrics;

pub use engine::{evaluate_dataset, write_outputs};
pub use errors::EvalError;
pub use metrics::{
    CheckConstraintStats, ColumnStats, ConstraintStats, ConstraintSummary, METRICS_VERSION,
    MetricsReport, PerformanceMetrics, TableMetrics, WarningItem,
};
pub use model::{EvaluateOptions, EvaluationResult, Violation};
pub use report::render_report;
pub use schema_metrics::{
    ConstraintCounts, CoverageMetrics, FkGraphMetrics, SchemaCounts, SchemaMetrics,
    collect_schema_metrics,
};
