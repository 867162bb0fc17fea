use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

static ABSENT: Override = Override::Absent;

/// Caller-supplied partial value pinned into generated data.
///
/// Unlike [`Value`], an override can be `Absent` at any depth: the top-level
/// override, an object entry or a hole in an array. Absent means "no
/// constraint here", which is different from `Null`. An absent object entry
/// behaves exactly like a missing key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Override {
    #[default]
    Absent,
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Override>),
    Object(BTreeMap<String, Override>),
}

impl Override {
    pub fn is_absent(&self) -> bool {
        matches!(self, Override::Absent)
    }

    /// Entry `key` of an object override, or `Absent`.
    pub fn get(&self, key: &str) -> &Override {
        match self {
            Override::Object(entries) => entries.get(key).unwrap_or(&ABSENT),
            _ => &ABSENT,
        }
    }

    /// Position `index` of an array override, or `Absent`.
    pub fn item(&self, index: usize) -> &Override {
        match self {
            Override::Array(items) => items.get(index).unwrap_or(&ABSENT),
            _ => &ABSENT,
        }
    }

    /// Number of positions of an array override; zero for anything else.
    pub fn len(&self) -> usize {
        match self {
            Override::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present entries of an object override.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Override)> {
        let entries = match self {
            Override::Object(entries) => Some(entries),
            _ => None,
        };
        entries
            .into_iter()
            .flatten()
            .filter(|(_, value)| !value.is_absent())
    }

    /// Lossy projection to JSON: absent holes in arrays become `null`, absent
    /// object entries are dropped, and a top-level `Absent` becomes `null`.
    pub fn to_value(&self) -> Value {
        match self {
            Override::Absent | Override::Null => Value::Null,
            Override::Bool(value) => Value::Bool(*value),
            Override::Number(number) => Value::Number(number.clone()),
            Override::String(value) => Value::String(value.clone()),
            Override::Array(items) => Value::Array(items.iter().map(Override::to_value).collect()),
            Override::Object(_) => {
                let map: Map<String, Value> = self
                    .entries()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect();
                Value::Object(map)
            }
        }
    }

    /// Deep equality against a JSON literal (`const` / `enum` members).
    ///
    /// Numbers compare by value, so `1` equals `1.0`. An absent array hole
    /// never matches.
    pub fn matches_value(&self, value: &Value) -> bool {
        match (self, value) {
            (Override::Null, Value::Null) => true,
            (Override::Bool(left), Value::Bool(right)) => left == right,
            (Override::Number(left), Value::Number(right)) => numbers_equal(left, right),
            (Override::String(left), Value::String(right)) => left == right,
            (Override::Array(left), Value::Array(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(right)
                        .all(|(left, right)| left.matches_value(right))
            }
            (Override::Object(_), Value::Object(right)) => {
                let mut present = 0;
                for (key, left) in self.entries() {
                    present += 1;
                    match right.get(key) {
                        Some(right) if left.matches_value(right) => {}
                        _ => return false,
                    }
                }
                present == right.len()
            }
            _ => false,
        }
    }
}

fn numbers_equal(left: &Number, right: &Number) -> bool {
    if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
        return left == right;
    }
    if let (Some(left), Some(right)) = (left.as_u64(), right.as_u64()) {
        return left == right;
    }
    match (left.as_f64(), right.as_f64()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

impl From<Value> for Override {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Override::Null,
            Value::Bool(value) => Override::Bool(value),
            Value::Number(number) => Override::Number(number),
            Value::String(value) => Override::String(value),
            Value::Array(items) => Override::Array(items.into_iter().map(Override::from).collect()),
            Value::Object(map) => Override::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Override::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for Override {
    fn from(value: &Value) -> Self {
        Override::from(value.clone())
    }
}

impl From<Option<Value>> for Override {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Override::Absent, Override::from)
    }
}

impl FromIterator<Override> for Override {
    fn from_iter<I: IntoIterator<Item = Override>>(iter: I) -> Self {
        Override::Array(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_entries_read_as_absent() {
        let value = Override::from(json!({"a": [1]}));
        assert!(value.get("b").is_absent());
        assert!(value.get("a").item(3).is_absent());
        assert!(Override::Null.get("a").is_absent());
    }

    #[test]
    fn projection_fills_holes_with_null() {
        let value: Override = vec![Override::Absent, Override::from(json!(5))]
            .into_iter()
            .collect();
        assert_eq!(value.to_value(), json!([null, 5]));
    }

    #[test]
    fn absent_object_entries_are_ignored() {
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Override::from(json!(1)));
        entries.insert("b".to_string(), Override::Absent);
        let value = Override::Object(entries);

        assert_eq!(value.to_value(), json!({"a": 1}));
        assert!(value.matches_value(&json!({"a": 1})));
        assert_eq!(value.entries().count(), 1);
    }

    #[test]
    fn deep_equality_compares_numbers_by_value() {
        assert!(Override::from(json!({"foo": 2, "bar": [1.0]})).matches_value(&json!({"foo": 2.0, "bar": [1]})));
        assert!(!Override::from(json!({"foo": 2})).matches_value(&json!({"foo": 2, "bar": 1})));
        assert!(!Override::from(json!(2)).matches_value(&json!("2")));
    }

    #[test]
    fn holes_never_match() {
        let value: Override = vec![Override::Absent].into_iter().collect();
        assert!(!value.matches_value(&json!([null])));
    }
}
