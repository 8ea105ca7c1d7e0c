use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use datafill_core::{Column, DataType};
use rand::RngCore;
use serde_json::Value;

use crate::errors::StrategyError;
use crate::params::{ParamSpec, validate_params};

pub mod primitives;
pub mod semantic;

/// Generated value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Uuid(String),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Key used to compare values for uniqueness and parent lookups.
    pub fn unique_key(&self) -> String {
        match self {
            GeneratedValue::Null => "<null>".to_string(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => format!("{value:?}"),
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => format!("'{value}"),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Time(value) => value.format("%H:%M:%S").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    /// Plain text rendering; decimals honor the column scale.
    pub fn render(&self, column: &Column) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Bool(value) => value.to_string(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => match decimal_scale(&column.data_type) {
                Some(scale) => format!("{value:.scale$}"),
                None => value.to_string(),
            },
            GeneratedValue::Text(value) | GeneratedValue::Uuid(value) => value.clone(),
            GeneratedValue::Date(value) => value.format("%Y-%m-%d").to_string(),
            GeneratedValue::Time(value) => value.format("%H:%M:%S").to_string(),
            GeneratedValue::Timestamp(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn to_json(&self, column: &Column) -> Value {
        match self {
            GeneratedValue::Null => Value::Null,
            GeneratedValue::Bool(value) => Value::Bool(*value),
            GeneratedValue::Int(value) => Value::from(*value),
            GeneratedValue::Float(value) => {
                let rounded = match decimal_scale(&column.data_type) {
                    Some(scale) => round_to_scale(*value, scale as u32),
                    None => *value,
                };
                serde_json::Number::from_f64(rounded)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            other => Value::String(other.render(column)),
        }
    }

    /// Convert a pool entry to a value matching the column type. Strings
    /// that do not parse as the column type are kept as text.
    pub fn from_pool(value: &Value, data_type: &DataType) -> Self {
        match value {
            Value::Null => GeneratedValue::Null,
            Value::Bool(flag) => GeneratedValue::Bool(*flag),
            Value::Number(number) => match (number.as_i64(), data_type) {
                (Some(int), DataType::Integer { .. }) => GeneratedValue::Int(int),
                (_, DataType::Integer { .. } | DataType::Decimal { .. } | DataType::Float) => {
                    number
                        .as_f64()
                        .map(GeneratedValue::Float)
                        .unwrap_or(GeneratedValue::Null)
                }
                (Some(int), DataType::Boolean) => GeneratedValue::Bool(int != 0),
                _ => GeneratedValue::Text(number.to_string()),
            },
            Value::String(text) => parse_typed_text(text, data_type)
                .unwrap_or_else(|| GeneratedValue::Text(text.clone())),
            other => GeneratedValue::Text(other.to_string()),
        }
    }
}

fn parse_typed_text(text: &str, data_type: &DataType) -> Option<GeneratedValue> {
    match data_type {
        DataType::Integer { .. } => text.trim().parse().ok().map(GeneratedValue::Int),
        DataType::Decimal { .. } | DataType::Float => {
            text.trim().parse().ok().map(GeneratedValue::Float)
        }
        DataType::Date => crate::params::parse_date_value(text).map(GeneratedValue::Date),
        DataType::Time => crate::params::parse_time_value(text).map(GeneratedValue::Time),
        DataType::Timestamp => {
            crate::params::parse_timestamp_value(text).map(GeneratedValue::Timestamp)
        }
        DataType::Uuid => uuid::Uuid::parse_str(text)
            .ok()
            .map(|id| GeneratedValue::Uuid(id.to_string())),
        DataType::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some(GeneratedValue::Bool(true)),
            "false" | "f" | "0" | "no" => Some(GeneratedValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn decimal_scale(data_type: &DataType) -> Option<usize> {
    match data_type {
        DataType::Decimal { scale, .. } => Some(scale.unwrap_or(0) as usize),
        _ => None,
    }
}

pub(crate) fn round_to_scale(value: f64, scale: u32) -> f64 {
    let factor = 10_f64.powi(scale.min(12) as i32);
    (value * factor).round() / factor
}

/// Truncate to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(mut value: String, max: Option<u32>) -> String {
    if let Some(max) = max
        && let Some((idx, _)) = value.char_indices().nth(max as usize)
    {
        value.truncate(idx);
    }
    value
}

/// Per-value context handed to generators.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub table: &'a str,
    pub column: &'a Column,
    pub row_index: u64,
    pub base_date: NaiveDate,
}

/// A named value generator.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    /// Short names accepted in configs in place of the id.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        &[]
    }

    /// Check params once, before any row is generated.
    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        validate_params(params, self.param_specs(), self.id()).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, StrategyError>;
}

/// Generators by id, with alias lookup.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
    aliases: BTreeMap<&'static str, &'static str>,
}

impl GeneratorRegistry {
    /// Registry with every built-in generator.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        primitives::register(&mut registry);
        semantic::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            generators: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        for alias in generator.aliases() {
            self.aliases.insert(*alias, generator.id());
        }
        self.generators.insert(generator.id(), generator);
    }

    /// Canonical id for an id or alias, matched case-insensitively.
    pub fn canonical_id(&self, id: &str) -> Option<&'static str> {
        let wanted = id.trim();
        self.generators
            .keys()
            .find(|known| known.eq_ignore_ascii_case(wanted))
            .copied()
            .or_else(|| {
                self.aliases
                    .iter()
                    .find(|(alias, _)| alias.eq_ignore_ascii_case(wanted))
                    .map(|(_, target)| *target)
            })
    }

    pub fn generator(&self, id: &str) -> Option<&dyn Generator> {
        let canonical = self.canonical_id(id)?;
        self.generators.get(canonical).map(|generator| generator.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.canonical_id(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.aliases.iter().map(|(alias, target)| (*alias, *target))
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("generators", &self.generators.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_resolve_to_canonical_ids() {
        let registry = GeneratorRegistry::new();
        assert_eq!(registry.canonical_id("email"), Some("internet.email"));
        assert_eq!(registry.canonical_id("First_Name"), Some("person.first_name"));
        assert_eq!(registry.canonical_id("int.range"), Some("int.range"));
        assert!(registry.generator("no.such.generator").is_none());
    }

    #[test]
    fn pool_values_follow_column_type() {
        assert_eq!(
            GeneratedValue::from_pool(&json!("42"), &DataType::integer()),
            GeneratedValue::Int(42)
        );
        assert_eq!(
            GeneratedValue::from_pool(&json!("M"), &DataType::Char { length: Some(1) }),
            GeneratedValue::Text("M".to_string())
        );
        assert_eq!(
            GeneratedValue::from_pool(&json!("2024-02-29"), &DataType::Date),
            GeneratedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(
            GeneratedValue::from_pool(&json!(1.5), &DataType::Float),
            GeneratedValue::Float(1.5)
        );
    }

    #[test]
    fn decimals_render_with_declared_scale() {
        let column = Column::new(
            1,
            "price",
            DataType::Decimal {
                precision: Some(5),
                scale: Some(2),
            },
        );
        assert_eq!(GeneratedValue::Float(3.1).render(&column), "3.10");
        assert_eq!(GeneratedValue::Float(3.14159).to_json(&column), json!(3.14));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo".to_string(), Some(2)), "hé");
        assert_eq!(truncate_chars("abc".to_string(), Some(10)), "abc");
        assert_eq!(truncate_chars("abc".to_string(), None), "abc");
    }
}
