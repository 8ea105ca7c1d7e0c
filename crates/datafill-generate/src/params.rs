use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use crate::errors::StrategyError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    String,
    Date,
}

/// Declared parameter of a generator.
#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

impl ParamSpec {
    pub const fn new(key: &'static str, kind: ParamKind, required: bool) -> Self {
        Self {
            key,
            kind,
            required,
        }
    }
}

/// Params that passed [`validate_params`].
pub struct ParamMap<'a> {
    map: Option<&'a Map<String, Value>>,
}

/// Reject unknown keys, wrong kinds and missing required keys.
pub fn validate_params<'a>(
    params: Option<&'a Value>,
    specs: &[ParamSpec],
    ctx: &str,
) -> Result<ParamMap<'a>, StrategyError> {
    let map = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => return Err(StrategyError::params(ctx, "params must be a JSON object")),
    };

    if let Some(map) = map {
        for (key, value) in map {
            let Some(spec) = specs.iter().find(|spec| spec.key == key.as_str()) else {
                return Err(StrategyError::params(ctx, format!("unknown param '{key}'")));
            };
            validate_kind(ctx, key, spec.kind, value)?;
        }
    }

    for spec in specs {
        if spec.required && !map.is_some_and(|map| map.contains_key(spec.key)) {
            return Err(StrategyError::params(
                ctx,
                format!("missing required param '{}'", spec.key),
            ));
        }
    }

    Ok(ParamMap { map })
}

impl<'a> ParamMap<'a> {
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_i64())
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_u64())
            .and_then(|value| u32::try_from(value).ok())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_f64())
    }

    pub fn get_str(&self, key: &str) -> Option<&'a str> {
        self.map
            .and_then(|map| map.get(key))
            .and_then(|value| value.as_str())
    }

    pub fn get_date(&self, key: &str) -> Option<NaiveDate> {
        self.get_str(key).and_then(parse_date_value)
    }
}

fn validate_kind(ctx: &str, key: &str, kind: ParamKind, value: &Value) -> Result<(), StrategyError> {
    let valid = match kind {
        ParamKind::Int => value.as_i64().is_some(),
        ParamKind::Float => value.as_f64().is_some(),
        ParamKind::String => value.is_string(),
        ParamKind::Date => value.as_str().and_then(parse_date_value).is_some(),
    };

    if valid {
        Ok(())
    } else {
        Err(StrategyError::params(
            ctx,
            format!("invalid value for param '{key}'"),
        ))
    }
}

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn parse_time_value(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(value, "%H:%M:%S%.f").ok())
}

pub fn parse_timestamp_value(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPECS: &[ParamSpec] = &[
        ParamSpec::new("min", ParamKind::Int, true),
        ParamSpec::new("start", ParamKind::Date, false),
    ];

    #[test]
    fn accepts_declared_params() {
        let params = json!({ "min": 3, "start": "2020-01-31" });
        let map = validate_params(Some(&params), SPECS, "test").unwrap();
        assert_eq!(map.get_i64("min"), Some(3));
        assert_eq!(map.get_date("start"), NaiveDate::from_ymd_opt(2020, 1, 31));
    }

    #[test]
    fn rejects_unknown_missing_and_mistyped_params() {
        let unknown = json!({ "min": 1, "max": 2 });
        let missing = json!({ "start": "2020-01-01" });
        let mistyped = json!({ "min": "one" });
        for params in [unknown, missing, mistyped] {
            assert!(matches!(
                validate_params(Some(&params), SPECS, "test"),
                Err(StrategyError::InvalidParams { .. })
            ));
        }
        assert!(validate_params(Some(&json!([1])), SPECS, "test").is_err());
    }
}
