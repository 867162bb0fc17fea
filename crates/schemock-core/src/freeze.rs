use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// Read-only JSON tree.
///
/// Built by [`freeze`]; exposes no way to change a node at any depth. Clones
/// share the underlying tree. [`FrozenValue::to_value`] hands out an
/// independent mutable copy.
#[derive(Debug, Clone, PartialEq)]
pub enum FrozenValue {
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<[FrozenValue]>),
    Object(Arc<BTreeMap<String, FrozenValue>>),
}

/// Deep-freeze a JSON value.
pub fn freeze(value: Value) -> FrozenValue {
    match value {
        Value::Null => FrozenValue::Null,
        Value::Bool(value) => FrozenValue::Bool(value),
        Value::Number(number) => FrozenValue::Number(number),
        Value::String(value) => FrozenValue::String(Arc::from(value)),
        Value::Array(items) => FrozenValue::Array(items.into_iter().map(freeze).collect()),
        Value::Object(map) => FrozenValue::Object(Arc::new(
            map.into_iter()
                .map(|(key, value)| (key, freeze(value)))
                .collect(),
        )),
    }
}

impl FrozenValue {
    pub fn get(&self, key: &str) -> Option<&FrozenValue> {
        match self {
            FrozenValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn get_index(&self, index: usize) -> Option<&FrozenValue> {
        match self {
            FrozenValue::Array(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[FrozenValue]> {
        match self {
            FrozenValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, FrozenValue>> {
        match self {
            FrozenValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FrozenValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FrozenValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FrozenValue::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FrozenValue::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FrozenValue::Null)
    }

    /// Number of entries of an array or object; zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            FrozenValue::Array(items) => items.len(),
            FrozenValue::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Independent mutable copy.
    pub fn to_value(&self) -> Value {
        match self {
            FrozenValue::Null => Value::Null,
            FrozenValue::Bool(value) => Value::Bool(*value),
            FrozenValue::Number(number) => Value::Number(number.clone()),
            FrozenValue::String(value) => Value::String(value.to_string()),
            FrozenValue::Array(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            FrozenValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

impl From<Value> for FrozenValue {
    fn from(value: Value) -> Self {
        freeze(value)
    }
}

impl PartialEq<Value> for FrozenValue {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (FrozenValue::Null, Value::Null) => true,
            (FrozenValue::Bool(left), Value::Bool(right)) => left == right,
            (FrozenValue::Number(left), Value::Number(right)) => left == right,
            (FrozenValue::String(left), Value::String(right)) => **left == **right,
            (FrozenValue::Array(left), Value::Array(right)) => {
                left.len() == right.len() && left.iter().zip(right).all(|(left, right)| left == right)
            }
            (FrozenValue::Object(left), Value::Object(right)) => {
                left.len() == right.len()
                    && left
                        .iter()
                        .all(|(key, left)| right.get(key).is_some_and(|right| left == right))
            }
            _ => false,
        }
    }
}

impl Serialize for FrozenValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FrozenValue::Null => serializer.serialize_unit(),
            FrozenValue::Bool(value) => serializer.serialize_bool(*value),
            FrozenValue::Number(number) => number.serialize(serializer),
            FrozenValue::String(value) => serializer.serialize_str(value),
            FrozenValue::Array(items) => serializer.collect_seq(items.iter()),
            FrozenValue::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn freezes_nested_values() {
        let frozen = freeze(json!({"field1": ["hello", 3], "field2": {"a": true}}));

        assert_eq!(frozen.get("field1").and_then(|v| v.get_index(0)).and_then(FrozenValue::as_str), Some("hello"));
        assert_eq!(frozen.get("field1").and_then(|v| v.get_index(1)).and_then(FrozenValue::as_i64), Some(3));
        assert_eq!(frozen.get("field2").and_then(|v| v.get("a")).and_then(FrozenValue::as_bool), Some(true));
        assert_eq!(frozen, json!({"field1": ["hello", 3], "field2": {"a": true}}));
    }

    #[test]
    fn copies_do_not_affect_the_frozen_tree() {
        let frozen = freeze(json!({"field1": ["hello", 3]}));

        let mut copy = frozen.to_value();
        copy["field1"] = json!([1, 2, 3]);
        if let Some(items) = copy["field1"].as_array_mut() {
            items.push(json!(10));
        }

        assert_eq!(frozen, json!({"field1": ["hello", 3]}));
        assert_eq!(frozen.get("field1").map(FrozenValue::len), Some(2));
    }

    #[test]
    fn serializes_like_the_original() {
        let original = json!([{"b": 1, "a": [null, 2.5, "x"]}]);
        let frozen = freeze(original.clone());
        assert_eq!(serde_json::to_value(&frozen).expect("serialize frozen"), original);
    }
}
