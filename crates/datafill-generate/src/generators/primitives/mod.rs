use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fake::Fake;
use fake::faker::lorem::en::Word;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_regex::Regex as RandRegex;
use serde_json::Value;

use datafill_core::DataType;

use crate::errors::StrategyError;
use crate::generators::{
    GeneratedValue, Generator, GeneratorContext, GeneratorRegistry, decimal_scale,
    round_to_scale, truncate_chars,
};
use crate::params::{ParamKind, ParamSpec, validate_params};

const DEFAULT_INT_MIN: i64 = 0;
const DEFAULT_INT_MAX: i64 = 10000;
const DEFAULT_FLOAT_MIN: f64 = 0.0;
const DEFAULT_FLOAT_MAX: f64 = 10000.0;
const DEFAULT_FLOAT_SCALE: u32 = 2;
const DEFAULT_MAX_REPEAT: u32 = 16;
const DEFAULT_MIN_WORDS: u32 = 1;
const DEFAULT_MAX_WORDS: u32 = 6;

const INT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Int, false),
    ParamSpec::new("max", ParamKind::Int, false),
];
const INT_SEQUENCE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Int, false),
    ParamSpec::new("step", ParamKind::Int, false),
];
const FLOAT_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min", ParamKind::Float, false),
    ParamSpec::new("max", ParamKind::Float, false),
    ParamSpec::new("scale", ParamKind::Int, false),
];
const TEXT_PATTERN_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("pattern", ParamKind::String, true),
    ParamSpec::new("max_repeat", ParamKind::Int, false),
];
const TEXT_LOREM_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("min_words", ParamKind::Int, false),
    ParamSpec::new("max_words", ParamKind::Int, false),
];
const DATE_RANGE_PARAMS: &[ParamSpec] = &[
    ParamSpec::new("start", ParamKind::Date, false),
    ParamSpec::new("end", ParamKind::Date, false),
];

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(BoolGenerator));
    registry.register_generator(Box::new(IntRangeGenerator));
    registry.register_generator(Box::new(IntSequenceGenerator));
    registry.register_generator(Box::new(FloatRangeGenerator));
    registry.register_generator(Box::new(TextPatternGenerator));
    registry.register_generator(Box::new(TextLoremGenerator));
    registry.register_generator(Box::new(DateRangeGenerator));
    registry.register_generator(Box::new(TimestampRangeGenerator));
    registry.register_generator(Box::new(TimeGenerator));
    registry.register_generator(Box::new(UuidGenerator));
}

struct BoolGenerator;

impl Generator for BoolGenerator {
    fn id(&self) -> &'static str {
        "bool.coin"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["bool", "boolean"]
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        validate_params(params, &[], self.id())?;
        Ok(GeneratedValue::Bool(rng.random_bool(0.5)))
    }
}

struct IntRangeGenerator;

impl IntRangeGenerator {
    fn bounds(&self, ctx: Option<&GeneratorContext<'_>>, params: Option<&Value>) -> Result<(i64, i64), StrategyError> {
        let params = validate_params(params, INT_RANGE_PARAMS, self.id())?;
        let width_max = match ctx.map(|ctx| &ctx.column.data_type) {
            Some(DataType::Integer { width, .. }) => width.max_value(),
            _ => i64::MAX,
        };
        let min = params.get_i64("min").unwrap_or(DEFAULT_INT_MIN);
        let max = params
            .get_i64("max")
            .unwrap_or(DEFAULT_INT_MAX)
            .min(width_max);
        if min > max {
            return Err(StrategyError::params(self.id(), "min must be <= max"));
        }
        Ok((min, max))
    }
}

impl Generator for IntRangeGenerator {
    fn id(&self) -> &'static str {
        "int.range"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["int", "integer"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        INT_RANGE_PARAMS
    }

    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        self.bounds(None, params).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let (min, max) = self.bounds(Some(ctx), params)?;
        Ok(GeneratedValue::Int(rng.random_range(min..=max)))
    }
}

/// `start + step * row_index`; ignores the RNG.
struct IntSequenceGenerator;

impl Generator for IntSequenceGenerator {
    fn id(&self) -> &'static str {
        "int.sequence"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["sequence"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        INT_SEQUENCE_PARAMS
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        _rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let params = validate_params(params, INT_SEQUENCE_PARAMS, self.id())?;
        let start = params.get_i64("start").unwrap_or(1);
        let step = params.get_i64("step").unwrap_or(1);
        let offset = i64::try_from(ctx.row_index)
            .ok()
            .and_then(|index| index.checked_mul(step))
            .and_then(|offset| offset.checked_add(start))
            .ok_or_else(|| StrategyError::params(self.id(), "sequence overflows i64"))?;
        Ok(GeneratedValue::Int(offset))
    }
}

struct FloatRangeGenerator;

impl FloatRangeGenerator {
    fn bounds(&self, params: Option<&Value>) -> Result<(f64, f64, Option<u32>), StrategyError> {
        let params = validate_params(params, FLOAT_RANGE_PARAMS, self.id())?;
        let min = params.get_f64("min").unwrap_or(DEFAULT_FLOAT_MIN);
        let max = params.get_f64("max").unwrap_or(DEFAULT_FLOAT_MAX);
        if !(min <= max) {
            return Err(StrategyError::params(self.id(), "min must be <= max"));
        }
        Ok((min, max, params.get_u32("scale")))
    }
}

impl Generator for FloatRangeGenerator {
    fn id(&self) -> &'static str {
        "float.range"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["float", "decimal"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        FLOAT_RANGE_PARAMS
    }

    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        self.bounds(params).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let (min, max, scale) = self.bounds(params)?;
        let scale = scale
            .or_else(|| decimal_scale(&ctx.column.data_type).map(|scale| scale as u32))
            .unwrap_or(DEFAULT_FLOAT_SCALE);
        let value = if min == max {
            min
        } else {
            rng.random_range(min..=max)
        };
        Ok(GeneratedValue::Float(round_to_scale(value, scale).clamp(min, max)))
    }
}

struct TextPatternGenerator;

impl TextPatternGenerator {
    fn compile(&self, params: Option<&Value>) -> Result<RandRegex, StrategyError> {
        let params = validate_params(params, TEXT_PATTERN_PARAMS, self.id())?;
        let pattern = params
            .get_str("pattern")
            .ok_or_else(|| StrategyError::params(self.id(), "requires params.pattern"))?;
        let max_repeat = params.get_u32("max_repeat").unwrap_or(DEFAULT_MAX_REPEAT);
        RandRegex::compile(pattern, max_repeat).map_err(|err| {
            StrategyError::params(self.id(), format!("invalid regex pattern: {err}"))
        })
    }
}

impl Generator for TextPatternGenerator {
    fn id(&self) -> &'static str {
        "text.pattern"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["pattern", "regex"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        TEXT_PATTERN_PARAMS
    }

    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        self.compile(params).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let regex = self.compile(params)?;
        let value: String = rng.sample(regex);
        if let Some(max) = ctx.column.data_type.max_chars()
            && value.chars().count() > max as usize
        {
            return Err(StrategyError::params(
                self.id(),
                format!("pattern produced more than {max} characters"),
            ));
        }
        Ok(GeneratedValue::Text(value))
    }
}

struct TextLoremGenerator;

impl TextLoremGenerator {
    fn word_bounds(&self, params: Option<&Value>) -> Result<(u32, u32), StrategyError> {
        let params = validate_params(params, TEXT_LOREM_PARAMS, self.id())?;
        let min = params.get_u32("min_words").unwrap_or(DEFAULT_MIN_WORDS);
        let max = params.get_u32("max_words").unwrap_or(DEFAULT_MAX_WORDS.max(min));
        if min == 0 || min > max {
            return Err(StrategyError::params(
                self.id(),
                "min_words must be >= 1 and <= max_words",
            ));
        }
        Ok((min, max))
    }
}

impl Generator for TextLoremGenerator {
    fn id(&self) -> &'static str {
        "text.lorem"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["lorem", "words"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        TEXT_LOREM_PARAMS
    }

    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        self.word_bounds(params).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let (min, max) = self.word_bounds(params)?;
        let text = lorem_words(rng, min, max);
        Ok(GeneratedValue::Text(fit_text(text, ctx.column.data_type.max_chars())))
    }
}

pub(crate) fn lorem_words(rng: &mut dyn rand::RngCore, min: u32, max: u32) -> String {
    let mut fake_rng = fake_rng(rng);
    let count = fake_rng.random_range(min..=max);
    (0..count)
        .map(|_| Word().fake_with_rng::<String, _>(&mut fake_rng))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Concrete RNG for the `fake` crate, seeded from the caller's stream.
pub(crate) fn fake_rng(rng: &mut dyn rand::RngCore) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(rng.next_u64())
}

/// Truncate and drop a dangling trailing space.
pub(crate) fn fit_text(text: String, max_chars: Option<u32>) -> String {
    let mut text = truncate_chars(text, max_chars);
    while text.ends_with(' ') {
        text.pop();
    }
    text
}

struct DateRangeGenerator;

fn date_bounds(
    id: &str,
    params: Option<&Value>,
    base_date: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), StrategyError> {
    let params = validate_params(params, DATE_RANGE_PARAMS, id)?;
    let start = params.get_date("start").unwrap_or(default_start_date());
    let end = params.get_date("end").unwrap_or(base_date);
    if start > end {
        return Err(StrategyError::params(id, "start must be <= end"));
    }
    Ok((start, end))
}

pub(crate) fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default()
}

pub(crate) fn random_date(rng: &mut dyn rand::RngCore, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let span = (end - start).num_days().max(0);
    start + Duration::days(rng.random_range(0..=span))
}

pub(crate) fn random_time(rng: &mut dyn rand::RngCore) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(rng.random_range(0..86_400), 0)
        .unwrap_or_default()
}

impl Generator for DateRangeGenerator {
    fn id(&self) -> &'static str {
        "date.range"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["date"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        DATE_RANGE_PARAMS
    }

    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        date_bounds(self.id(), params, NaiveDate::MAX).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let (start, end) = date_bounds(self.id(), params, ctx.base_date)?;
        Ok(GeneratedValue::Date(random_date(rng, start, end)))
    }
}

struct TimestampRangeGenerator;

impl Generator for TimestampRangeGenerator {
    fn id(&self) -> &'static str {
        "timestamp.range"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["timestamp", "datetime"]
    }

    fn param_specs(&self) -> &'static [ParamSpec] {
        DATE_RANGE_PARAMS
    }

    fn validate(&self, params: Option<&Value>) -> Result<(), StrategyError> {
        date_bounds(self.id(), params, NaiveDate::MAX).map(|_| ())
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        let (start, end) = date_bounds(self.id(), params, ctx.base_date)?;
        let date = random_date(rng, start, end);
        Ok(GeneratedValue::Timestamp(NaiveDateTime::new(
            date,
            random_time(rng),
        )))
    }
}

struct TimeGenerator;

impl Generator for TimeGenerator {
    fn id(&self) -> &'static str {
        "time.of_day"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["time"]
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        validate_params(params, &[], self.id())?;
        Ok(GeneratedValue::Time(random_time(rng)))
    }
}

struct UuidGenerator;

pub(crate) fn random_uuid(rng: &mut dyn rand::RngCore) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}

impl Generator for UuidGenerator {
    fn id(&self) -> &'static str {
        "uuid.v4"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["uuid", "guid"]
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        params: Option<&Value>,
        rng: &mut dyn rand::RngCore,
    ) -> Result<GeneratedValue, StrategyError> {
        validate_params(params, &[], self.id())?;
        Ok(GeneratedValue::Uuid(random_uuid(rng)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafill_core::{Column, IntegerWidth};
    use serde_json::json;

    fn ctx(column: &Column) -> GeneratorContext<'_> {
        GeneratorContext {
            table: "t",
            column,
            row_index: 4,
            base_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    #[test]
    fn int_range_stays_within_bounds_and_width() {
        let registry = GeneratorRegistry::new();
        let generator = registry.generator("int.range").unwrap();
        let column = Column::new(
            1,
            "n",
            DataType::Integer {
                width: IntegerWidth::Tiny,
                auto_increment: false,
            },
        );
        let params = json!({ "min": 100, "max": 1000 });
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            let value = generator
                .generate(&ctx(&column), Some(&params), &mut rng)
                .unwrap()
                .as_i64()
                .unwrap();
            assert!((100..=127).contains(&value));
        }
        assert!(generator.validate(Some(&json!({ "min": 5, "max": 1 }))).is_err());
    }

    #[test]
    fn sequence_uses_row_index() {
        let registry = GeneratorRegistry::new();
        let column = Column::new(1, "n", DataType::integer());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let value = registry
            .generator("int.sequence")
            .unwrap()
            .generate(&ctx(&column), Some(&json!({ "start": 100, "step": 10 })), &mut rng)
            .unwrap();
        assert_eq!(value, GeneratedValue::Int(140));
    }

    #[test]
    fn pattern_values_match_and_respect_length() {
        let registry = GeneratorRegistry::new();
        let generator = registry.generator("text.pattern").unwrap();
        let column = Column::new(1, "isbn", DataType::Text { max_length: Some(13) });
        let params = json!({ "pattern": "97[89][0-9]{10}" });
        let check = regex::Regex::new("^97[89][0-9]{10}$").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let value = generator.generate(&ctx(&column), Some(&params), &mut rng).unwrap();
            assert!(check.is_match(value.as_str().unwrap()));
        }

        let short = Column::new(1, "code", DataType::Text { max_length: Some(3) });
        assert!(
            generator
                .generate(&ctx(&short), Some(&json!({ "pattern": "[a-z]{5}" })), &mut rng)
                .is_err()
        );
        assert!(generator.validate(Some(&json!({ "pattern": "(" }))).is_err());
    }

    #[test]
    fn float_range_rounds_to_scale() {
        let registry = GeneratorRegistry::new();
        let column = Column::new(1, "rate", DataType::Float);
        let params = json!({ "min": 0.1, "max": 5.0, "scale": 2 });
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            let GeneratedValue::Float(value) = registry
                .generator("float.range")
                .unwrap()
                .generate(&ctx(&column), Some(&params), &mut rng)
                .unwrap()
            else {
                panic!("expected float");
            };
            assert!((0.1..=5.0).contains(&value));
            assert_eq!(round_to_scale(value, 2), value);
        }
    }

    #[test]
    fn lorem_is_capped_by_column_length() {
        let registry = GeneratorRegistry::new();
        let column = Column::new(1, "note", DataType::Text { max_length: Some(12) });
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let value = registry
                .generator("lorem")
                .unwrap()
                .generate(&ctx(&column), Some(&json!({ "min_words": 4, "max_words": 8 })), &mut rng)
                .unwrap();
            let text = value.as_str().unwrap();
            assert!(text.chars().count() <= 12);
            assert!(!text.ends_with(' '));
        }
    }

    #[test]
    fn date_range_is_inclusive() {
        let registry = GeneratorRegistry::new();
        let column = Column::new(1, "d", DataType::Date);
        let params = json!({ "start": "2024-01-01", "end": "2024-01-03" });
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..50 {
            let GeneratedValue::Date(date) = registry
                .generator("date")
                .unwrap()
                .generate(&ctx(&column), Some(&params), &mut rng)
                .unwrap()
            else {
                panic!("expected date");
            };
            assert!(date >= start && date <= end);
        }
    }
}
