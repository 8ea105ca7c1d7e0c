//! Generation config contract, its JSON Schema and validation.

mod errors;
mod model;
mod schema;
mod validate;

pub use errors::{IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport};
pub use model::{ConfigScope, GLOBAL_SCOPE, GenerationConfig, GeneratorRef, GeneratorSpec};
pub use schema::config_json_schema;
pub use validate::{
    ValidatedConfig, validate_config, validate_config_against_schema, validate_config_json,
    validate_config_structure,
};
