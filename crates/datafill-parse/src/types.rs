//! Vendor type spelling to semantic category mapping.

use datafill_core::{DataType, Dialect, IntegerWidth};

/// A column type as written in the script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSpec {
    /// Lowercased type words, e.g. `["double", "precision"]`.
    pub words: Vec<String>,
    /// Arguments inside the parentheses, string literals unquoted.
    pub args: Vec<String>,
    pub is_array: bool,
    /// Verbatim spelling from the source.
    pub raw: String,
}

impl TypeSpec {
    fn base(&self) -> String {
        self.words
            .iter()
            .filter(|word| !matches!(word.as_str(), "unsigned" | "signed" | "zerofill"))
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn arg(&self, index: usize) -> Option<u32> {
        self.args
            .get(index)
            .and_then(|arg| arg.split_whitespace().next())
            .and_then(|value| value.parse().ok())
    }
}

/// Map a declared type to its semantic category; `None` for types the
/// generator has no model for.
pub fn normalize_type(spec: &TypeSpec, dialect: Dialect) -> Option<DataType> {
    if spec.is_array {
        return None;
    }
    let base = spec.base();
    match dialect {
        Dialect::Postgres => map_postgres_type(&base, spec),
        Dialect::Mysql => map_mysql_type(&base, spec),
        Dialect::Sqlite => map_sqlite_type(&base, spec),
        Dialect::Oracle => map_oracle_type(&base, spec),
    }
}

/// Whether `word` starts a type the normalizer knows for this dialect.
pub fn is_known_type_word(word: &str, dialect: Dialect) -> bool {
    let spec = TypeSpec {
        words: vec![word.to_ascii_lowercase()],
        ..TypeSpec::default()
    };
    normalize_type(&spec, dialect).is_some()
}

fn integer(width: IntegerWidth, auto_increment: bool) -> DataType {
    DataType::Integer {
        width,
        auto_increment,
    }
}

fn decimal(spec: &TypeSpec) -> DataType {
    let precision = spec.arg(0);
    let scale = spec.arg(1).or(precision.map(|_| 0));
    DataType::Decimal { precision, scale }
}

fn map_postgres_type(base: &str, spec: &TypeSpec) -> Option<DataType> {
    let data_type = match base {
        "smallint" | "int2" => integer(IntegerWidth::Small, false),
        "integer" | "int" | "int4" => integer(IntegerWidth::Regular, false),
        "bigint" | "int8" => integer(IntegerWidth::Big, false),
        "smallserial" | "serial2" => integer(IntegerWidth::Small, true),
        "serial" | "serial4" => integer(IntegerWidth::Regular, true),
        "bigserial" | "serial8" => integer(IntegerWidth::Big, true),
        "numeric" | "decimal" => decimal(spec),
        "real" | "float4" | "float8" | "float" | "double precision" => DataType::Float,
        "varchar" | "character varying" => DataType::Text {
            max_length: spec.arg(0),
        },
        "text" | "citext" => DataType::text(),
        "char" | "character" | "bpchar" => DataType::Char {
            length: spec.arg(0),
        },
        "date" => DataType::Date,
        "time" | "timetz" | "time with time zone" | "time without time zone" => DataType::Time,
        "timestamp"
        | "timestamptz"
        | "timestamp with time zone"
        | "timestamp without time zone" => DataType::Timestamp,
        "boolean" | "bool" => DataType::Boolean,
        "uuid" => DataType::Uuid,
        _ => return None,
    };
    Some(data_type)
}

fn map_mysql_type(base: &str, spec: &TypeSpec) -> Option<DataType> {
    let data_type = match base {
        "tinyint" if spec.arg(0) == Some(1) => DataType::Boolean,
        "bit" if spec.arg(0).unwrap_or(1) == 1 => DataType::Boolean,
        "tinyint" => integer(IntegerWidth::Tiny, false),
        "smallint" | "year" => integer(IntegerWidth::Small, false),
        "mediumint" | "int" | "integer" => integer(IntegerWidth::Regular, false),
        "bigint" => integer(IntegerWidth::Big, false),
        "serial" => integer(IntegerWidth::Big, true),
        "decimal" | "numeric" | "dec" | "fixed" => decimal(spec),
        "float" | "double" | "double precision" | "real" => DataType::Float,
        "varchar" | "nvarchar" | "national varchar" => DataType::Text {
            max_length: spec.arg(0),
        },
        "char" | "nchar" | "national char" => DataType::Char {
            length: spec.arg(0),
        },
        "tinytext" => DataType::Text {
            max_length: Some(255),
        },
        "text" | "mediumtext" | "longtext" => DataType::text(),
        "date" => DataType::Date,
        "datetime" | "timestamp" => DataType::Timestamp,
        "time" => DataType::Time,
        "bool" | "boolean" => DataType::Boolean,
        "enum" if !spec.args.is_empty() => DataType::Enum {
            values: spec.args.clone(),
        },
        _ => return None,
    };
    Some(data_type)
}

/// SQLite has no strict types; known names map directly and the rest
/// follow the column affinity rules.
fn map_sqlite_type(base: &str, spec: &TypeSpec) -> Option<DataType> {
    let data_type = match base {
        "boolean" | "bool" => DataType::Boolean,
        "date" => DataType::Date,
        "datetime" | "timestamp" => DataType::Timestamp,
        "time" => DataType::Time,
        "uuid" => DataType::Uuid,
        "numeric" | "decimal" if !spec.args.is_empty() => decimal(spec),
        "bigint" | "int8" | "unsigned big int" => integer(IntegerWidth::Big, false),
        "smallint" | "int2" | "tinyint" => integer(IntegerWidth::Small, false),
        "char" | "character" | "nchar" => DataType::Char {
            length: spec.arg(0),
        },
        other if other.contains("int") => integer(IntegerWidth::Regular, false),
        other if ["char", "clob", "text"].iter().any(|affinity| other.contains(affinity)) => {
            DataType::Text {
                max_length: spec.arg(0),
            }
        }
        other if ["real", "floa", "doub"].iter().any(|affinity| other.contains(affinity)) => {
            DataType::Float
        }
        "numeric" | "decimal" => decimal(spec),
        _ => return None,
    };
    Some(data_type)
}

fn map_oracle_type(base: &str, spec: &TypeSpec) -> Option<DataType> {
    let data_type = match base {
        "number" => match (spec.arg(0), spec.arg(1)) {
            (None, _) => DataType::Decimal {
                precision: None,
                scale: None,
            },
            (Some(precision), None | Some(0)) => integer(oracle_width(precision), false),
            (Some(precision), Some(scale)) => DataType::Decimal {
                precision: Some(precision),
                scale: Some(scale),
            },
        },
        "integer" | "int" => integer(IntegerWidth::Regular, false),
        "smallint" => integer(IntegerWidth::Small, false),
        "decimal" | "numeric" | "dec" => decimal(spec),
        "float" | "real" | "binary_float" | "binary_double" | "double precision" => {
            DataType::Float
        }
        "varchar2" | "nvarchar2" | "varchar" => DataType::Text {
            max_length: spec.arg(0),
        },
        "char" | "nchar" | "character" => DataType::Char {
            length: spec.arg(0),
        },
        "clob" | "nclob" | "long" => DataType::text(),
        "date" => DataType::Date,
        "timestamp"
        | "timestamp with time zone"
        | "timestamp with local time zone" => DataType::Timestamp,
        "boolean" => DataType::Boolean,
        _ => return None,
    };
    Some(data_type)
}

fn oracle_width(precision: u32) -> IntegerWidth {
    match precision {
        0..=2 => IntegerWidth::Tiny,
        3..=4 => IntegerWidth::Small,
        5..=9 => IntegerWidth::Regular,
        _ => IntegerWidth::Big,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(words: &[&str], args: &[&str]) -> TypeSpec {
        TypeSpec {
            words: words.iter().map(|word| word.to_string()).collect(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            is_array: false,
            raw: words.join(" "),
        }
    }

    #[test]
    fn postgres_serial_is_auto_increment_integer() {
        let data_type = normalize_type(&spec(&["serial"], &[]), Dialect::Postgres).unwrap();
        assert!(data_type.is_auto_increment());
    }

    #[test]
    fn multi_word_types_map() {
        assert_eq!(
            normalize_type(&spec(&["character", "varying"], &["40"]), Dialect::Postgres),
            Some(DataType::Text {
                max_length: Some(40)
            })
        );
        assert_eq!(
            normalize_type(
                &spec(&["timestamp", "with", "time", "zone"], &[]),
                Dialect::Postgres
            ),
            Some(DataType::Timestamp)
        );
    }

    #[test]
    fn mysql_tinyint_one_is_boolean() {
        assert_eq!(
            normalize_type(&spec(&["tinyint"], &["1"]), Dialect::Mysql),
            Some(DataType::Boolean)
        );
        assert_eq!(
            normalize_type(&spec(&["int", "unsigned"], &["11"]), Dialect::Mysql),
            Some(DataType::integer())
        );
    }

    #[test]
    fn oracle_number_scale_decides_category() {
        assert_eq!(
            normalize_type(&spec(&["number"], &["10"]), Dialect::Oracle),
            Some(DataType::Integer {
                width: IntegerWidth::Big,
                auto_increment: false
            })
        );
        assert_eq!(
            normalize_type(&spec(&["number"], &["8", "2"]), Dialect::Oracle),
            Some(DataType::Decimal {
                precision: Some(8),
                scale: Some(2)
            })
        );
        assert_eq!(
            normalize_type(&spec(&["varchar2"], &["30 BYTE"]), Dialect::Oracle),
            Some(DataType::Text {
                max_length: Some(30)
            })
        );
    }

    #[test]
    fn sqlite_uses_affinity_rules() {
        assert_eq!(
            normalize_type(&spec(&["mediumint"], &[]), Dialect::Sqlite),
            Some(DataType::integer())
        );
        assert_eq!(
            normalize_type(&spec(&["varying", "character"], &["70"]), Dialect::Sqlite),
            Some(DataType::Text {
                max_length: Some(70)
            })
        );
        assert_eq!(normalize_type(&spec(&["blob"], &[]), Dialect::Sqlite), None);
    }

    #[test]
    fn decimal_without_scale_defaults_to_zero() {
        assert_eq!(
            normalize_type(&spec(&["decimal"], &["5"]), Dialect::Postgres),
            Some(DataType::Decimal {
                precision: Some(5),
                scale: Some(0)
            })
        );
    }
}
