use std::collections::BTreeMap;

use datafill_core::{Schema, Table};
use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::{PlanError, ValidationIssue, ValidationReport};
use crate::model::{GLOBAL_SCOPE, GenerationConfig};
use crate::schema::config_json_schema;

/// Deserialized config with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: GenerationConfig,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a config document against the published JSON Schema.
pub fn validate_config_structure(config_json: &Value) -> Result<ValidationReport, PlanError> {
    let schema_json = serde_json::to_value(config_json_schema())?;
    let compiled =
        JSONSchema::compile(&schema_json).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();
    if let Err(errors) = compiled.validate(config_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error("schema_violation", path, error.to_string()));
        }
    }
    Ok(report)
}

/// Structural validation, deserialization and value checks that need no
/// schema.
pub fn validate_config_json(config_json: &Value) -> Result<ValidatedConfig, ValidationReport> {
    let config = deserialize(config_json)?;
    let mut report = ValidationReport::default();
    check_values(&config, &mut report);
    if !report.is_ok() {
        return Err(report);
    }
    Ok(ValidatedConfig {
        config,
        warnings: report.warnings,
    })
}

/// End-to-end validation of a config document for a parsed schema.
pub fn validate_config(
    config_json: &Value,
    schema: &Schema,
) -> Result<ValidatedConfig, ValidationReport> {
    let config = deserialize(config_json)?;
    let report = validate_config_against_schema(&config, schema);
    if !report.is_ok() {
        return Err(report);
    }
    Ok(ValidatedConfig {
        config,
        warnings: report.warnings,
    })
}

/// Check a config against the tables and columns of a schema.
///
/// Unknown names are warnings, since a config may be shared by several
/// scripts; values that can never generate are errors.
pub fn validate_config_against_schema(
    config: &GenerationConfig,
    schema: &Schema,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_values(config, &mut report);

    check_scoped_columns(
        &config.predefined_values,
        "predefined_values",
        schema,
        &mut report,
    );
    check_scoped_columns(
        &config.column_type_mappings,
        "column_type_mappings",
        schema,
        &mut report,
    );
    check_pool_sizes(config, schema, &mut report);

    for table in config.num_rows_per_table.keys() {
        if schema.table(table).is_none() {
            report.push(unknown_table(
                format!("/num_rows_per_table/{}", pointer_segment(table)),
                table,
            ));
        }
    }

    for table_name in config.self_reference_offsets.keys() {
        let path = format!("/self_reference_offsets/{}", pointer_segment(table_name));
        match schema.table(table_name) {
            None => report.push(unknown_table(path, table_name)),
            Some(table) if !has_self_reference(table) => {
                report.push(
                    ValidationIssue::warning(
                        "offset_without_self_reference",
                        path,
                        format!("table '{}' has no self-referencing foreign key", table.name),
                    )
                    .with_hint("remove the offset or add the foreign key"),
                );
            }
            Some(_) => {}
        }
    }

    report
}

fn deserialize(config_json: &Value) -> Result<GenerationConfig, ValidationReport> {
    let structural = match validate_config_structure(config_json) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "schema_validation_error",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };
    if !structural.is_ok() {
        return Err(structural);
    }

    serde_json::from_value(config_json.clone()).map_err(|err| {
        let mut report = ValidationReport::default();
        report.push(ValidationIssue::error("invalid_config_json", "/", err.to_string()));
        report
    })
}

fn check_values(config: &GenerationConfig, report: &mut ValidationReport) {
    if !(0.0..=1.0).contains(&config.guess_threshold) {
        report.push(
            ValidationIssue::error(
                "threshold_out_of_range",
                "/guess_threshold",
                format!("guess_threshold {} is outside 0..=1", config.guess_threshold),
            )
            .with_hint("use a similarity score such as 0.8"),
        );
    }

    if config.max_attempts_row == 0 {
        report.push(ValidationIssue::error(
            "max_attempts_zero",
            "/max_attempts_row",
            "max_attempts_row must be at least 1",
        ));
    }

    for (table, offset) in &config.self_reference_offsets {
        if *offset == 0 {
            report.push(ValidationIssue::error(
                "offset_zero",
                format!("/self_reference_offsets/{}", pointer_segment(table)),
                "a row cannot reference itself; use an offset of at least 1",
            ));
        }
    }

    for (scope, columns) in &config.predefined_values {
        for (column, values) in columns {
            let path = format!(
                "/predefined_values/{}/{}",
                pointer_segment(scope),
                pointer_segment(column)
            );
            if values.is_empty() {
                report.push(ValidationIssue::error(
                    "empty_pool",
                    path.clone(),
                    format!("pool for '{scope}.{column}' has no values"),
                ));
            }
            for (idx, value) in values.iter().enumerate() {
                if value.is_array() || value.is_object() {
                    report.push(ValidationIssue::error(
                        "non_scalar_pool_value",
                        format!("{path}/{idx}"),
                        "pool values must be strings, numbers, booleans or null",
                    ));
                }
            }
        }
    }
}

fn check_scoped_columns<V>(
    scoped: &BTreeMap<String, BTreeMap<String, V>>,
    section: &str,
    schema: &Schema,
    report: &mut ValidationReport,
) {
    for (scope, columns) in scoped {
        let scope_path = format!("/{section}/{}", pointer_segment(scope));
        if scope.eq_ignore_ascii_case(GLOBAL_SCOPE) {
            for column in columns.keys() {
                let known = schema
                    .tables
                    .iter()
                    .any(|table| table.column(column).is_some());
                if !known {
                    report.push(ValidationIssue::warning(
                        "unknown_column",
                        format!("{scope_path}/{}", pointer_segment(column)),
                        format!("no table has a column named '{column}'"),
                    ));
                }
            }
            continue;
        }

        let Some(table) = schema.table(scope) else {
            report.push(unknown_table(scope_path, scope));
            continue;
        };
        for column in columns.keys() {
            let path = format!("{scope_path}/{}", pointer_segment(column));
            if table.column(column).is_none() {
                report.push(ValidationIssue::warning(
                    "unknown_column",
                    path,
                    format!("column '{}.{column}' not found", table.name),
                ));
            } else if is_key_column(table, column) {
                report.push(ValidationIssue::warning(
                    "ignored_for_key_column",
                    path,
                    format!(
                        "'{}.{column}' is a key column; its values come from the key sequence or the parent table",
                        table.name
                    ),
                ));
            }
        }
    }
}

/// A pool bound to a unique column must hold at least one value per row.
fn check_pool_sizes(config: &GenerationConfig, schema: &Schema, report: &mut ValidationReport) {
    for table in &schema.tables {
        let rows = config.rows_for(&table.name);
        for column in table.columns.iter().filter(|column| column.is_unique) {
            if is_key_column(table, &column.name) {
                continue;
            }
            let Some((values, scope)) = config.pool_for(&table.name, &column.name) else {
                continue;
            };
            if (values.len() as u64) < rows {
                report.push(
                    ValidationIssue::warning(
                        "pool_smaller_than_rows",
                        format!(
                            "/predefined_values/{}/{}",
                            pointer_segment(scope.label()),
                            pointer_segment(&column.name)
                        ),
                        format!(
                            "unique column '{}.{}' needs {rows} distinct values but the pool has {}",
                            table.name,
                            column.name,
                            values.len()
                        ),
                    )
                    .with_hint("add values to the pool or lower the row count"),
                );
            }
        }
    }
}

fn is_key_column(table: &Table, column: &str) -> bool {
    table.is_primary_key_column(column) || table.foreign_key_for(column).is_some()
}

fn has_self_reference(table: &Table) -> bool {
    table.foreign_keys().any(|fk| fk.references(&table.name))
}

fn unknown_table(path: String, table: &str) -> ValidationIssue {
    ValidationIssue::warning("unknown_table", path, format!("table '{table}' not found in schema"))
}

fn pointer_segment(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_unknown_top_level_fields() {
        let report = validate_config_json(&json!({ "rows": 5 })).unwrap_err();
        assert!(report.has_code("schema_violation"));
    }

    #[test]
    fn rejects_wrong_value_types() {
        let report = validate_config_json(&json!({ "default_num_rows": "ten" })).unwrap_err();
        let issue = &report.errors[0];
        assert_eq!(issue.code, "schema_violation");
        assert_eq!(issue.path, "/default_num_rows");
    }

    #[test]
    fn value_checks_report_every_problem() {
        let report = validate_config_json(&json!({
            "guess_threshold": 1.5,
            "max_attempts_row": 0,
            "predefined_values": {
                "global": { "sex": [], "tags": [["a"]] }
            }
        }))
        .unwrap_err();

        let codes: Vec<&str> = report.errors.iter().map(|issue| issue.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "threshold_out_of_range",
                "max_attempts_zero",
                "empty_pool",
                "non_scalar_pool_value"
            ]
        );
        assert_eq!(report.errors[3].path, "/predefined_values/global/tags/0");
    }

    #[test]
    fn pointer_segments_are_escaped() {
        assert_eq!(pointer_segment("a/b~c"), "a~1b~0c");
    }
}
