use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use datafill_core::{Dialect, Schema};
use datafill_parse::{DiagnosticLevel, ParseDiagnostic, ParseResult, parse};
use datafill_plan::{GenerationConfig, PlanError, validate_config};

use crate::errors::{CliError, CliResult};

pub fn read_text(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a DDL file and print its warnings to stderr.
pub fn load_schema(path: &Path, dialect: Dialect) -> CliResult<ParseResult> {
    let text = read_text(path)?;
    let result = parse(&text, dialect)?;
    for diagnostic in &result.diagnostics {
        if diagnostic.level == DiagnosticLevel::Warning {
            eprintln!("{}", format_diagnostic(diagnostic));
        }
    }
    Ok(result)
}

pub fn format_diagnostic(diagnostic: &ParseDiagnostic) -> String {
    let level = match diagnostic.level {
        DiagnosticLevel::Info => "info",
        DiagnosticLevel::Warning => "warning",
    };
    let mut location = String::new();
    if let Some(table) = &diagnostic.table {
        location.push_str(table);
        if let Some(column) = &diagnostic.column {
            location.push('.');
            location.push_str(column);
        }
    }
    if let Some(line) = diagnostic.line {
        if !location.is_empty() {
            location.push_str(", ");
        }
        location.push_str(&format!("line {line}"));
    }
    if location.is_empty() {
        format!("{level}[{}]: {}", diagnostic.code, diagnostic.message)
    } else {
        format!("{level}[{}]: {} ({location})", diagnostic.code, diagnostic.message)
    }
}

/// Read a config document; `.toml` files are TOML, anything else JSON.
pub fn read_config_value(path: &Path) -> CliResult<Value> {
    let text = read_text(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        Ok(toml::from_str::<Value>(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

/// Load and validate a config for `schema`. Without a path the defaults
/// are used.
pub fn load_config(path: Option<&Path>, schema: &Schema) -> CliResult<GenerationConfig> {
    let Some(path) = path else {
        return Ok(GenerationConfig::default());
    };
    let value = read_config_value(path)?;
    let validated = validate_config(&value, schema).map_err(PlanError::Invalid)?;
    for issue in &validated.warnings {
        warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
    info!(path = %path.display(), warnings = validated.warnings.len(), "config loaded");
    Ok(validated.config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_show_their_location() {
        let diagnostic = ParseDiagnostic::warning("unknown_type", "type 'GEOMETRY' kept as opaque")
            .with_table("places")
            .with_column("shape")
            .with_line(4);
        assert_eq!(
            format_diagnostic(&diagnostic),
            "warning[unknown_type]: type 'GEOMETRY' kept as opaque (places.shape, line 4)"
        );

        let skipped = ParseDiagnostic::info("statement_skipped", "skipped CREATE VIEW");
        assert_eq!(
            format_diagnostic(&skipped),
            "info[statement_skipped]: skipped CREATE VIEW"
        );
    }

    #[test]
    fn toml_and_json_configs_read_alike() {
        let dir = std::env::temp_dir().join(format!("datafill_cfg_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();

        let toml_path = dir.join("config.toml");
        fs::write(
            &toml_path,
            "seed = 7\ndefault_num_rows = 3\n\n[num_rows_per_table]\nbooks = 20\n\n[predefined_values.global]\nsex = [\"M\", \"F\"]\n",
        )
        .unwrap();
        let json_path = dir.join("config.json");
        fs::write(
            &json_path,
            r#"{"seed": 7, "default_num_rows": 3, "num_rows_per_table": {"books": 20},
                "predefined_values": {"global": {"sex": ["M", "F"]}}}"#,
        )
        .unwrap();

        assert_eq!(
            read_config_value(&toml_path).unwrap(),
            read_config_value(&json_path).unwrap()
        );
    }
}
