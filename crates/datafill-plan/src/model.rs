use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scope key whose entries apply to every table.
pub const GLOBAL_SCOPE: &str = "global";

/// Where a pool or generator binding was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "table")]
pub enum ConfigScope {
    Global,
    Table(String),
}

impl ConfigScope {
    pub fn label(&self) -> &str {
        match self {
            ConfigScope::Global => GLOBAL_SCOPE,
            ConfigScope::Table(table) => table.as_str(),
        }
    }
}

/// Caller-supplied configuration for one generation run.
///
/// Pools and generator bindings are keyed by scope (`global` or a table
/// name) and then by column name. Table and column keys match
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Fixed value pools: scope -> column -> candidate values.
    #[serde(default)]
    pub predefined_values: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
    /// Explicit generator bindings: scope -> column -> generator.
    #[serde(default)]
    pub column_type_mappings: BTreeMap<String, BTreeMap<String, GeneratorRef>>,
    /// Row count overrides per table.
    #[serde(default)]
    pub num_rows_per_table: BTreeMap<String, u64>,
    /// Row count for tables without an override.
    #[serde(default = "default_num_rows")]
    pub default_num_rows: u64,
    /// Enables name-based generator guessing.
    #[serde(default)]
    pub guess_enabled: bool,
    /// Minimum similarity (0..=1) for a guess to be accepted.
    #[serde(default = "default_guess_threshold")]
    pub guess_threshold: f64,
    /// Seed for reproducible runs; a random seed is drawn when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// For self-referencing foreign keys: row `i` references row `i - k`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub self_reference_offsets: BTreeMap<String, u64>,
    /// Attempts per row before a uniqueness failure is reported.
    #[serde(default = "default_max_attempts_row")]
    pub max_attempts_row: u32,
}

fn default_num_rows() -> u64 {
    10
}

fn default_guess_threshold() -> f64 {
    0.8
}

fn default_max_attempts_row() -> u32 {
    50
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            predefined_values: BTreeMap::new(),
            column_type_mappings: BTreeMap::new(),
            num_rows_per_table: BTreeMap::new(),
            default_num_rows: default_num_rows(),
            guess_enabled: false,
            guess_threshold: default_guess_threshold(),
            seed: None,
            self_reference_offsets: BTreeMap::new(),
            max_attempts_row: default_max_attempts_row(),
        }
    }
}

impl GenerationConfig {
    /// Pool for a column: the table scope overrides `global`.
    pub fn pool_for(&self, table: &str, column: &str) -> Option<(&[Value], ConfigScope)> {
        scoped_lookup(&self.predefined_values, table, column)
            .map(|(values, scope)| (values.as_slice(), scope))
    }

    /// Generator binding for a column: the table scope overrides `global`.
    pub fn mapping_for(&self, table: &str, column: &str) -> Option<(&GeneratorRef, ConfigScope)> {
        scoped_lookup(&self.column_type_mappings, table, column)
    }

    pub fn rows_for(&self, table: &str) -> u64 {
        lookup(&self.num_rows_per_table, table)
            .copied()
            .unwrap_or(self.default_num_rows)
    }

    pub fn self_reference_offset(&self, table: &str) -> Option<u64> {
        lookup(&self.self_reference_offsets, table).copied()
    }

    pub fn set_pool(&mut self, scope: &str, column: &str, values: Vec<Value>) {
        self.predefined_values
            .entry(scope.to_string())
            .or_default()
            .insert(column.to_string(), values);
    }

    pub fn set_mapping(&mut self, scope: &str, column: &str, generator: GeneratorRef) {
        self.column_type_mappings
            .entry(scope.to_string())
            .or_default()
            .insert(column.to_string(), generator);
    }
}

/// Exact key first, then a case-insensitive match.
pub(crate) fn lookup<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn scoped_lookup<'a, V>(
    map: &'a BTreeMap<String, BTreeMap<String, V>>,
    table: &str,
    column: &str,
) -> Option<(&'a V, ConfigScope)> {
    if !table.eq_ignore_ascii_case(GLOBAL_SCOPE)
        && let Some(value) = lookup(map, table).and_then(|columns| lookup(columns, column))
    {
        return Some((value, ConfigScope::Table(table.to_string())));
    }
    lookup(map, GLOBAL_SCOPE)
        .and_then(|columns| lookup(columns, column))
        .map(|value| (value, ConfigScope::Global))
}

/// Generator reference; accepts a bare id or a spec with params.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum GeneratorRef {
    Id(String),
    Spec(GeneratorSpec),
}

/// Generator id with optional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl GeneratorRef {
    pub fn id(&self) -> &str {
        match self {
            GeneratorRef::Id(value) => value.as_str(),
            GeneratorRef::Spec(spec) => spec.id.as_str(),
        }
    }

    pub fn params(&self) -> Option<&Value> {
        match self {
            GeneratorRef::Id(_) => None,
            GeneratorRef::Spec(spec) => spec.params.as_ref(),
        }
    }
}

impl From<&str> for GeneratorRef {
    fn from(id: &str) -> Self {
        GeneratorRef::Id(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply_to_empty_document() {
        let config: GenerationConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, GenerationConfig::default());
        assert_eq!(config.default_num_rows, 10);
        assert_eq!(config.max_attempts_row, 50);
        assert!(!config.guess_enabled);
    }

    #[test]
    fn table_scope_overrides_global_case_insensitively() {
        let config: GenerationConfig = serde_json::from_value(json!({
            "predefined_values": {
                "global": { "sex": ["M", "F"] },
                "Authors": { "SEX": ["X"] }
            }
        }))
        .unwrap();

        let (values, scope) = config.pool_for("authors", "sex").unwrap();
        assert_eq!(values, [json!("X")]);
        assert_eq!(scope, ConfigScope::Table("authors".to_string()));

        let (values, scope) = config.pool_for("members", "Sex").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(scope, ConfigScope::Global);
        assert!(config.pool_for("members", "email").is_none());
    }

    #[test]
    fn generator_ref_accepts_both_forms() {
        let config: GenerationConfig = serde_json::from_value(json!({
            "column_type_mappings": {
                "global": { "email": "email" },
                "books": { "year": { "id": "int.range", "params": { "min": 1, "max": 2 } } }
            },
            "num_rows_per_table": { "Books": 3 }
        }))
        .unwrap();

        let (email, _) = config.mapping_for("members", "email").unwrap();
        assert_eq!(email.id(), "email");
        assert!(email.params().is_none());

        let (year, _) = config.mapping_for("BOOKS", "year").unwrap();
        assert_eq!(year.id(), "int.range");
        assert_eq!(year.params().unwrap()["max"], json!(2));

        assert_eq!(config.rows_for("books"), 3);
        assert_eq!(config.rows_for("authors"), 10);
    }
}
