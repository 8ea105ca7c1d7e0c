use serde::{Deserialize, Serialize};

/// Storage width of an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerWidth {
    Tiny,
    Small,
    Regular,
    Big,
}

impl IntegerWidth {
    /// Largest value that is safe to generate for this width.
    pub fn max_value(&self) -> i64 {
        match self {
            IntegerWidth::Tiny => i8::MAX as i64,
            IntegerWidth::Small => i16::MAX as i64,
            IntegerWidth::Regular => i32::MAX as i64,
            IntegerWidth::Big => i64::MAX,
        }
    }
}

/// Semantic type category of a column, independent of vendor spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataType {
    Integer {
        width: IntegerWidth,
        auto_increment: bool,
    },
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Float,
    Text {
        max_length: Option<u32>,
    },
    Char {
        length: Option<u32>,
    },
    Date,
    Time,
    Timestamp,
    Boolean,
    Uuid,
    Enum {
        values: Vec<String>,
    },
    /// Type the parser did not recognize; `raw` keeps the declared spelling.
    Opaque {
        raw: String,
    },
}

impl DataType {
    pub fn integer() -> Self {
        DataType::Integer {
            width: IntegerWidth::Regular,
            auto_increment: false,
        }
    }

    pub fn text() -> Self {
        DataType::Text { max_length: None }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Integer { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer { .. } | DataType::Decimal { .. } | DataType::Float
        )
    }

    pub fn is_auto_increment(&self) -> bool {
        matches!(
            self,
            DataType::Integer {
                auto_increment: true,
                ..
            }
        )
    }

    /// Maximum number of characters a value may hold, when declared.
    pub fn max_chars(&self) -> Option<u32> {
        match self {
            DataType::Text { max_length } => *max_length,
            DataType::Char { length } => Some(length.unwrap_or(1)),
            _ => None,
        }
    }

    /// Short category label used in reports and previews.
    pub fn category(&self) -> &'static str {
        match self {
            DataType::Integer { .. } => "integer",
            DataType::Decimal { .. } => "decimal",
            DataType::Float => "float",
            DataType::Text { .. } => "text",
            DataType::Char { .. } => "char",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Timestamp => "timestamp",
            DataType::Boolean => "boolean",
            DataType::Uuid => "uuid",
            DataType::Enum { .. } => "enum",
            DataType::Opaque { .. } => "opaque",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_defaults_to_single_character() {
        assert_eq!(DataType::Char { length: None }.max_chars(), Some(1));
        assert_eq!(DataType::text().max_chars(), None);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let value = serde_json::to_value(DataType::Decimal {
            precision: Some(5),
            scale: Some(2),
        })
        .unwrap();
        assert_eq!(value["kind"], "decimal");
        assert_eq!(value["precision"], 5);
    }
}
