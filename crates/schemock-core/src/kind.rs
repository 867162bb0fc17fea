use std::fmt;

use serde_json::{Number, Value};

use crate::overrides::Override;

/// Runtime kind of a value, using JSON Schema type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No value at all. Never a valid schema type.
    Undefined,
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    /// Classify an override.
    pub fn of(value: &Override) -> Self {
        match value {
            Override::Absent => Self::Undefined,
            Override::Null => Self::Null,
            Override::Bool(_) => Self::Boolean,
            Override::Number(number) => Self::of_number(number),
            Override::String(_) => Self::String,
            Override::Array(_) => Self::Array,
            Override::Object(_) => Self::Object,
        }
    }

    /// Classify a plain JSON value.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(number) => Self::of_number(number),
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Whole numbers are integers even when stored as floats (`3.0`).
    pub fn of_number(number: &Number) -> Self {
        if number.is_i64() || number.is_u64() {
            return Self::Integer;
        }
        match number.as_f64() {
            Some(value) if value.is_finite() && value.fract() == 0.0 => Self::Integer,
            _ => Self::Number,
        }
    }

    /// Parse a schema `type` name. `undefined` is not a schema type.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether a value of this kind satisfies a schema declaring `declared`.
    ///
    /// Integers satisfy `number`; the reverse never holds.
    pub fn fits(self, declared: &str) -> bool {
        declared == self.as_str() || (self == Self::Integer && declared == "number")
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Array | Self::Object)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_values() {
        assert_eq!(Kind::of(&Override::Absent), Kind::Undefined);
        assert_eq!(Kind::of_value(&json!(null)), Kind::Null);
        assert_eq!(Kind::of_value(&json!(true)), Kind::Boolean);
        assert_eq!(Kind::of_value(&json!(7)), Kind::Integer);
        assert_eq!(Kind::of_value(&json!(-7)), Kind::Integer);
        assert_eq!(Kind::of_value(&json!(7.5)), Kind::Number);
        assert_eq!(Kind::of_value(&json!("7")), Kind::String);
        assert_eq!(Kind::of_value(&json!([7])), Kind::Array);
        assert_eq!(Kind::of_value(&json!({"a": 7})), Kind::Object);
    }

    #[test]
    fn whole_floats_are_integers() {
        assert_eq!(Kind::of_value(&json!(3.0)), Kind::Integer);
    }

    #[test]
    fn integers_fit_number_schemas_only_one_way() {
        assert!(Kind::Integer.fits("number"));
        assert!(Kind::Integer.fits("integer"));
        assert!(!Kind::Number.fits("integer"));
        assert!(!Kind::String.fits("number"));
    }
}
