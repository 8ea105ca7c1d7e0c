//! Core contracts and helpers for datafill.
//!
//! This crate defines the normalized schema types, the foreign-key dependency
//! resolver, and validation helpers shared by the parser, the generator and
//! the CLI.

pub mod constraints;
pub mod dialect;
pub mod error;
pub mod graph;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{CheckConstraint, Constraint, FkAction, ForeignKey, PrimaryKey, UniqueConstraint};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use graph::{
    DeferredEdge, FkGraphReport, FkGraphSummary, GenerationOrder, build_fk_graph_report, order,
    plan_order,
};
pub use schema::{Column, Schema, Table};
pub use types::{DataType, IntegerWidth};
pub use validation::validate_schema;

/// Current contract version for `schema.json` artifacts.
pub const SCHEMA_VERSION: &str = "0.1";
