use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::overrides::Override;
use crate::path::SchemaPath;
use crate::validation::SchemaValidator;

/// Keywords whose subschemas are checked by deep coercion or final validation,
/// never by the shape pre-check.
const DEEP_KEYWORDS: &[&str] = &[
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "const",
    "enum",
    "contains",
    "propertyNames",
    "dependencies",
];

/// Check the structure of `override_value` against `schema` before recursing.
///
/// `schema` must already carry the override's concrete `type`. Only the
/// skeleton is validated: `type`, `required`, property and pattern keys,
/// tuple arity and the `additional*` gates. Failures are reported rooted at
/// `path`.
pub fn shallow_validate(
    schema: &Map<String, Value>,
    override_value: &Override,
    path: &SchemaPath,
    validator: &dyn SchemaValidator,
) -> Result<()> {
    let shape = shape_schema(schema);
    let instance = shape_instance(schema, override_value);

    validator
        .validate(&Value::Object(shape), &instance)
        .map_err(|failure| Error::Shape(failure.rooted_at(path.as_str())))
}

fn shape_schema(schema: &Map<String, Value>) -> Map<String, Value> {
    let mut shape = schema.clone();
    for keyword in DEEP_KEYWORDS {
        shape.remove(*keyword);
    }

    for keyword in ["properties", "patternProperties"] {
        if let Some(Value::Object(subschemas)) = schema.get(keyword) {
            let placeholders = subschemas
                .keys()
                .map(|key| (key.clone(), unconstrained()))
                .collect();
            shape.insert(keyword.to_string(), Value::Object(placeholders));
        }
    }

    match schema.get("items") {
        Some(Value::Array(items)) => {
            shape.insert(
                "items".to_string(),
                Value::Array(items.iter().map(|_| unconstrained()).collect()),
            );
        }
        Some(_) => {
            shape.insert("items".to_string(), unconstrained());
        }
        None => {}
    }

    // Object-valued gates constrain values deeply; only `false` is structural.
    for keyword in ["additionalProperties", "additionalItems"] {
        if let Some(Value::Object(_)) = schema.get(keyword) {
            shape.insert(keyword.to_string(), Value::Bool(true));
        }
    }

    shape
}

fn shape_instance(schema: &Map<String, Value>, override_value: &Override) -> Value {
    match override_value {
        Override::Object(_) => {
            let mut object = Map::new();
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for key in properties.keys() {
                    object.insert(key.clone(), Value::Null);
                }
            }
            for (key, value) in override_value.entries() {
                object.insert(key.clone(), value.to_value());
            }
            Value::Object(object)
        }
        Override::Array(items) => {
            let mut values: Vec<Value> = items.iter().map(Override::to_value).collect();
            if let Some(Value::Array(tuple)) = schema.get("items")
                && tuple.len() > values.len()
            {
                values.resize(tuple.len(), Value::Null);
            }
            Value::Array(values)
        }
        other => other.to_value(),
    }
}

fn unconstrained() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::JsonSchemaValidator;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object schema"),
        }
    }

    #[test]
    fn erases_nested_constraints() {
        let schema = object(json!({
            "type": "object",
            "properties": {"a": {"type": "string", "minLength": 3}},
            "patternProperties": {"^x-": {"type": "integer"}},
            "additionalProperties": {"type": "boolean"},
            "required": ["a"],
            "anyOf": [{"required": ["b"]}],
        }));

        let shape = shape_schema(&schema);

        assert_eq!(
            Value::Object(shape),
            json!({
                "type": "object",
                "properties": {"a": {}},
                "patternProperties": {"^x-": {}},
                "additionalProperties": true,
                "required": ["a"],
            })
        );
    }

    #[test]
    fn keeps_tuple_arity() {
        let schema = object(json!({
            "type": "array",
            "items": [{"type": "string"}, {"type": "number"}],
            "additionalItems": false,
        }));

        assert_eq!(
            Value::Object(shape_schema(&schema)),
            json!({"type": "array", "items": [{}, {}], "additionalItems": false})
        );
    }

    #[test]
    fn partial_object_overrides_pass_required_checks() {
        let schema = object(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "number"}},
            "required": ["a", "b"],
        }));
        let validator = JsonSchemaValidator::default();
        let override_value = Override::from(json!({"a": "abcd"}));

        assert!(shallow_validate(&schema, &override_value, &SchemaPath::root(), &validator).is_ok());
    }

    #[test]
    fn reports_additional_properties_at_the_override_path() {
        let schema = object(json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false,
        }));
        let validator = JsonSchemaValidator::default();
        let override_value = Override::from(json!({"a": "x", "extra": 1}));
        let path = SchemaPath::root().property("field1");

        let error = shallow_validate(&schema, &override_value, &path, &validator)
            .expect_err("extra key is not allowed");

        let message = error.to_string();
        assert!(message.starts_with("override.field1: "), "{message}");
        assert!(message.contains("extra"), "{message}");
    }

    #[test]
    fn short_tuples_are_padded_before_the_arity_check() {
        let schema = object(json!({
            "type": "array",
            "items": [{"type": "boolean"}, {"type": "string"}, {"type": "number"}],
            "minItems": 3,
        }));
        let validator = JsonSchemaValidator::default();
        let override_value: Override = vec![Override::Absent, Override::from(json!("abcd"))]
            .into_iter()
            .collect();

        assert!(shallow_validate(&schema, &override_value, &SchemaPath::root(), &validator).is_ok());
    }

    #[test]
    fn long_tuples_fail_when_additional_items_are_closed() {
        let schema = object(json!({
            "type": "array",
            "items": [{"type": "boolean"}],
            "additionalItems": false,
        }));
        let validator = JsonSchemaValidator::default();
        let override_value = Override::from(json!([true, false]));

        let error = shallow_validate(&schema, &override_value, &SchemaPath::root(), &validator)
            .expect_err("second item is not allowed");
        assert!(matches!(error, Error::Shape(_)));
    }
}
