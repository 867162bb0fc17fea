use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value, json};

use schemock_core::GenerationError;

const LOWER_BOUNDS: &[&str] = &[
    "minimum",
    "exclusiveMinimum",
    "minItems",
    "minLength",
    "minProperties",
];
const UPPER_BOUNDS: &[&str] = &[
    "maximum",
    "exclusiveMaximum",
    "maxItems",
    "maxLength",
    "maxProperties",
];

/// Flatten the combinators of `schema` into a single schema object.
///
/// `allOf` branches are all folded in; for `anyOf`/`oneOf` one branch is
/// picked at random among those compatible with the rest of the schema.
pub(crate) fn resolve<R: Rng>(
    schema: &Value,
    rng: &mut R,
) -> Result<Map<String, Value>, GenerationError> {
    let schema = match schema {
        Value::Object(schema) => schema,
        Value::Bool(true) => return Ok(Map::new()),
        Value::Bool(false) => {
            return Err(GenerationError::Unsatisfiable(
                "schema `false` admits no value".to_string(),
            ));
        }
        other => {
            return Err(GenerationError::InvalidSchema(format!(
                "expected a schema object, found {other}"
            )));
        }
    };

    let mut resolved = schema.clone();
    let all_of = resolved.remove("allOf");
    let any_of = resolved.remove("anyOf");
    let one_of = resolved.remove("oneOf");

    if let Some(branches) = all_of {
        for branch in branches_of("allOf", &branches)? {
            let branch = resolve(branch, rng)?;
            fold(&mut resolved, branch)?;
        }
    }

    for (keyword, branches) in [("anyOf", any_of), ("oneOf", one_of)] {
        if let Some(branches) = branches {
            resolved = pick_branch(keyword, resolved, &branches, rng)?;
        }
    }

    Ok(resolved)
}

fn pick_branch<R: Rng>(
    keyword: &str,
    base: Map<String, Value>,
    branches: &Value,
    rng: &mut R,
) -> Result<Map<String, Value>, GenerationError> {
    let mut candidates: Vec<&Value> = branches_of(keyword, branches)?.iter().collect();
    candidates.shuffle(rng);

    let mut last_error = None;
    for candidate in candidates {
        let attempt = resolve(candidate, rng).and_then(|branch| {
            let mut folded = base.clone();
            fold(&mut folded, branch)?;
            Ok(folded)
        });
        match attempt {
            Ok(folded) => return Ok(folded),
            Err(err) => last_error = Some(err),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        GenerationError::Unsatisfiable(format!("`{keyword}` has no usable branch"))
    }))
}

fn branches_of<'s>(keyword: &str, branches: &'s Value) -> Result<&'s [Value], GenerationError> {
    match branches {
        Value::Array(branches) if !branches.is_empty() => Ok(branches),
        _ => Err(GenerationError::InvalidSchema(format!(
            "`{keyword}` must be a non-empty array"
        ))),
    }
}

/// Fold `source` into `target` so that values of the result satisfy both.
pub(crate) fn fold(
    target: &mut Map<String, Value>,
    source: Map<String, Value>,
) -> Result<(), GenerationError> {
    for (keyword, value) in source {
        let Some(current) = target.remove(&keyword) else {
            target.insert(keyword, value);
            continue;
        };

        let folded = match keyword.as_str() {
            "type" => intersect_types(&current, &value)?,
            "properties" | "patternProperties" => merge_subschemas(current, value),
            "required" => union(current, value),
            "enum" => intersect_members(current, &value)?,
            "const" if current != value => {
                return Err(GenerationError::Unsatisfiable(format!(
                    "conflicting constants {current} and {value}"
                )));
            }
            "items" => merge_items(current, value),
            "additionalProperties" | "additionalItems" => merge_gates(current, value),
            bound if LOWER_BOUNDS.contains(&bound) => pick_bound(current, value, f64::max),
            bound if UPPER_BOUNDS.contains(&bound) => pick_bound(current, value, f64::min),
            _ => current,
        };
        target.insert(keyword, folded);
    }
    Ok(())
}

fn type_names(value: &Value) -> Vec<&str> {
    match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn intersect_types(left: &Value, right: &Value) -> Result<Value, GenerationError> {
    let right_names = type_names(right);
    let mut common: Vec<&str> = Vec::new();
    for name in type_names(left) {
        let shared = if right_names.contains(&name) {
            Some(name)
        } else if (name == "integer" && right_names.contains(&"number"))
            || (name == "number" && right_names.contains(&"integer"))
        {
            Some("integer")
        } else {
            None
        };
        if let Some(shared) = shared
            && !common.contains(&shared)
        {
            common.push(shared);
        }
    }

    match common.as_slice() {
        [] => Err(GenerationError::Unsatisfiable(format!(
            "no common type between {left} and {right}"
        ))),
        [single] => Ok(Value::String((*single).to_string())),
        many => Ok(json!(many)),
    }
}

fn merge_subschemas(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Object(mut current), Value::Object(incoming)) => {
            for (key, schema) in incoming {
                let merged = match current.remove(&key) {
                    Some(existing) => json!({ "allOf": [existing, schema] }),
                    None => schema,
                };
                current.insert(key, merged);
            }
            Value::Object(current)
        }
        (current, _) => current,
    }
}

fn union(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Array(mut current), Value::Array(incoming)) => {
            for name in incoming {
                if !current.contains(&name) {
                    current.push(name);
                }
            }
            Value::Array(current)
        }
        (current, _) => current,
    }
}

fn intersect_members(current: Value, incoming: &Value) -> Result<Value, GenerationError> {
    match (current, incoming) {
        (Value::Array(current), Value::Array(incoming)) => {
            let common: Vec<Value> = current
                .into_iter()
                .filter(|member| incoming.contains(member))
                .collect();
            if common.is_empty() {
                return Err(GenerationError::Unsatisfiable(
                    "`enum` lists have no common member".to_string(),
                ));
            }
            Ok(Value::Array(common))
        }
        (current, _) => Ok(current),
    }
}

fn merge_items(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Array(current), Value::Array(incoming)) => {
            let len = current.len().max(incoming.len());
            let mut current = current.into_iter();
            let mut incoming = incoming.into_iter();
            let items = (0..len)
                .map(|_| match (current.next(), incoming.next()) {
                    (Some(left), Some(right)) => json!({ "allOf": [left, right] }),
                    (Some(only), None) | (None, Some(only)) => only,
                    (None, None) => Value::Bool(true),
                })
                .collect();
            Value::Array(items)
        }
        (Value::Array(tuple), list) | (list, Value::Array(tuple)) => Value::Array(
            tuple
                .into_iter()
                .map(|item| json!({ "allOf": [item, list.clone()] }))
                .collect(),
        ),
        (left, right) => json!({ "allOf": [left, right] }),
    }
}

fn merge_gates(current: Value, incoming: Value) -> Value {
    match (current, incoming) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => Value::Bool(false),
        (Value::Bool(true), other) | (other, Value::Bool(true)) => other,
        (left, right) => json!({ "allOf": [left, right] }),
    }
}

fn pick_bound(current: Value, incoming: Value, choose: fn(f64, f64) -> f64) -> Value {
    match (current.as_f64(), incoming.as_f64()) {
        (Some(left), Some(right)) => {
            if choose(left, right) == left {
                current
            } else {
                incoming
            }
        }
        (None, Some(_)) => incoming,
        _ => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn all_of_branches_fold_into_one_schema() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "required": ["a"],
            "allOf": [
                {"properties": {"a": {"minLength": 2}, "b": {"type": "number"}}, "required": ["b"]},
                {"minProperties": 1, "maxProperties": 5},
                {"maxProperties": 3},
            ],
        });

        let resolved = resolve(&schema, &mut rng()).expect("resolve allOf");

        assert_eq!(
            Value::Object(resolved),
            json!({
                "type": "object",
                "properties": {
                    "a": {"allOf": [{"type": "string"}, {"minLength": 2}]},
                    "b": {"type": "number"},
                },
                "required": ["a", "b"],
                "minProperties": 1,
                "maxProperties": 3,
            })
        );
    }

    #[test]
    fn integer_and_number_intersect_to_integer() {
        let schema = json!({"type": ["number", "string"], "allOf": [{"type": "integer"}]});
        let resolved = resolve(&schema, &mut rng()).expect("resolve types");
        assert_eq!(resolved.get("type"), Some(&json!("integer")));
    }

    #[test]
    fn disjoint_types_are_unsatisfiable() {
        let schema = json!({"type": "string", "allOf": [{"type": "boolean"}]});
        let err = resolve(&schema, &mut rng()).expect_err("no common type");
        assert!(matches!(err, GenerationError::Unsatisfiable(_)));
    }

    #[test]
    fn any_of_skips_incompatible_branches() {
        let schema = json!({
            "type": "string",
            "anyOf": [{"type": "boolean"}, {"type": "string", "maxLength": 3}, {"type": "null"}],
        });

        for seed in 0..16 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let resolved = resolve(&schema, &mut rng).expect("a string branch exists");
            assert_eq!(resolved.get("maxLength"), Some(&json!(3)));
        }
    }

    #[test]
    fn closed_gates_win() {
        assert_eq!(merge_gates(json!({"type": "string"}), json!(false)), json!(false));
        assert_eq!(merge_gates(json!(true), json!({"type": "string"})), json!({"type": "string"}));
    }

    #[test]
    fn tuples_fold_position_by_position() {
        let folded = merge_items(json!([{"type": "integer"}]), json!({"minimum": 1}));
        assert_eq!(folded, json!([{"allOf": [{"type": "integer"}, {"minimum": 1}]}]));
    }
}
