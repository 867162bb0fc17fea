//! Schema narrowing.
//!
//! [`Coercer::coerce`] derives, from a schema and a partial override, a schema
//! that admits the override's runtime shape and only leaves the unspecified
//! parts open. A random generator fed with the result produces data with the
//! right types, lengths and literals at every overridden position, so that
//! merging the override on top of it stays valid.

use fancy_regex::Regex;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::kind::Kind;
use crate::overrides::Override;
use crate::path::SchemaPath;
use crate::shape::shallow_validate;
use crate::validation::SchemaValidator;

/// Combinator keywords, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    AllOf,
    AnyOf,
    OneOf,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::AllOf => "allOf",
            Combinator::AnyOf => "anyOf",
            Combinator::OneOf => "oneOf",
        }
    }
}

/// Structural shape the recursion dispatches on, borrowed from the input schema.
enum ShapeKind<'s> {
    Object {
        properties: Option<&'s Map<String, Value>>,
        pattern_properties: Option<&'s Map<String, Value>>,
    },
    Tuple {
        items: &'s [Value],
        additional: Option<&'s Value>,
    },
    List(&'s Value),
    Leaf,
}

impl<'s> ShapeKind<'s> {
    fn select(kind: Kind, schema: &'s Map<String, Value>) -> Self {
        match kind {
            Kind::Object => {
                let properties = schema.get("properties").and_then(Value::as_object);
                let pattern_properties = schema.get("patternProperties").and_then(Value::as_object);
                if properties.is_none() && pattern_properties.is_none() {
                    ShapeKind::Leaf
                } else {
                    ShapeKind::Object {
                        properties,
                        pattern_properties,
                    }
                }
            }
            Kind::Array => match schema.get("items") {
                Some(Value::Array(items)) => ShapeKind::Tuple {
                    items,
                    additional: schema.get("additionalItems").filter(|value| value.is_object()),
                },
                Some(item) => ShapeKind::List(item),
                None => ShapeKind::Leaf,
            },
            _ => ShapeKind::Leaf,
        }
    }
}

/// Narrows schemas to overrides, using `validator` for shape pre-checks.
#[derive(Clone, Copy)]
pub struct Coercer<'v> {
    validator: &'v dyn SchemaValidator,
}

impl<'v> Coercer<'v> {
    pub fn new(validator: &'v dyn SchemaValidator) -> Self {
        Self { validator }
    }

    /// Coerce `schema` so that it matches `override_value` at `path`.
    ///
    /// An absent override returns the schema unchanged. Otherwise the result
    /// is a copy whose `type` is the override's concrete kind and whose
    /// properties, items and combinator branches all admit the matching
    /// sub-override.
    pub fn coerce(
        &self,
        schema: &Value,
        override_value: &Override,
        path: &SchemaPath,
    ) -> Result<Value> {
        let kind = Kind::of(override_value);
        if kind == Kind::Undefined {
            return Ok(schema.clone());
        }

        let empty = Map::new();
        let schema = match schema {
            Value::Object(schema) => schema,
            Value::Bool(true) => &empty,
            Value::Bool(false) => {
                return Err(Error::invalid_schema(path, "schema `false` admits no value"));
            }
            other => {
                return Err(Error::invalid_schema(
                    path,
                    format!("expected a schema object, found {}", Kind::of_value(other)),
                ));
            }
        };

        let allowed = declared_types(schema, path)?;
        if !allowed.is_empty() && !allowed.iter().any(|declared| kind.fits(declared)) {
            return Err(Error::TypeMismatch {
                path: path.clone(),
                found: kind,
                expected: allowed.join(","),
            });
        }

        debug!(path = %path, kind = %kind, "coercing schema");

        let mut coerced = schema.clone();
        coerced.insert("type".to_string(), Value::String(kind.as_str().to_string()));

        match ShapeKind::select(kind, schema) {
            ShapeKind::Object {
                properties,
                pattern_properties,
            } => {
                let patterns = pattern_properties
                    .map(|pattern_properties| compile_patterns(pattern_properties, path))
                    .transpose()?;
                shallow_validate(&coerced, override_value, path, self.validator)?;
                self.coerce_object(&mut coerced, properties, patterns, override_value, path)?;
            }
            ShapeKind::Tuple { items, additional } => {
                shallow_validate(&coerced, override_value, path, self.validator)?;
                let unconstrained = Value::Object(Map::new());
                let len = items.len().max(override_value.len());
                let mut coerced_items = Vec::with_capacity(len);
                for index in 0..len {
                    let item_schema = items
                        .get(index)
                        .or(additional)
                        .unwrap_or(&unconstrained);
                    coerced_items.push(self.coerce(
                        item_schema,
                        override_value.item(index),
                        &path.index(index),
                    )?);
                }
                coerced.insert("items".to_string(), Value::Array(coerced_items));
            }
            ShapeKind::List(item_schema) => {
                shallow_validate(&coerced, override_value, path, self.validator)?;
                let coerced_items = (0..override_value.len())
                    .map(|index| {
                        self.coerce(item_schema, override_value.item(index), &path.index(index))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let len = coerced_items.len();
                coerced.insert("items".to_string(), Value::Array(coerced_items));
                coerced.insert("minItems".to_string(), json!(len));
                coerced.insert("maxItems".to_string(), json!(len));
            }
            ShapeKind::Leaf => {}
        }

        if let Some(branches) = schema.get(Combinator::AllOf.keyword()) {
            let branches = combinator_branches(Combinator::AllOf, branches, path)?;
            let coerced_branches = branches
                .iter()
                .enumerate()
                .map(|(index, branch)| {
                    self.coerce(
                        branch,
                        override_value,
                        &path.branch(Combinator::AllOf.keyword(), index),
                    )
                })
                .collect::<Result<Vec<_>>>()?;
            coerced.insert(
                Combinator::AllOf.keyword().to_string(),
                Value::Array(coerced_branches),
            );
        }

        for combinator in [Combinator::AnyOf, Combinator::OneOf] {
            if let Some(branches) = schema.get(combinator.keyword()) {
                let branches = combinator_branches(combinator, branches, path)?;
                let survivors = self.coerce_alternatives(combinator, branches, override_value, path)?;
                coerced.insert(combinator.keyword().to_string(), Value::Array(survivors));
            }
        }

        if let Some(constant) = schema.get("const")
            && !override_value.matches_value(constant)
        {
            return Err(Error::ConstMismatch { path: path.clone() });
        }

        if let Some(members) = schema.get("enum") {
            let members = members
                .as_array()
                .ok_or_else(|| Error::invalid_schema(path, "`enum` must be an array"))?;
            let member = members
                .iter()
                .find(|member| override_value.matches_value(member))
                .ok_or_else(|| Error::EnumMismatch { path: path.clone() })?;
            coerced.insert("enum".to_string(), Value::Array(vec![member.clone()]));
        }

        Ok(Value::Object(coerced))
    }

    fn coerce_object(
        &self,
        coerced: &mut Map<String, Value>,
        properties: Option<&Map<String, Value>>,
        patterns: Option<Vec<(Regex, &Value)>>,
        override_value: &Override,
        path: &SchemaPath,
    ) -> Result<()> {
        let mut coerced_properties = Map::new();
        if let Some(properties) = properties {
            for (name, property_schema) in properties {
                let property =
                    self.coerce(property_schema, override_value.get(name), &path.property(name))?;
                coerced_properties.insert(name.clone(), property);
            }
        }

        if let Some(patterns) = patterns {
            let mut required = match coerced.get("required") {
                Some(Value::Array(required)) => required.clone(),
                _ => Vec::new(),
            };

            for (key, value) in override_value.entries() {
                let mut matching: Vec<&Value> = Vec::new();
                for (pattern, schema) in &patterns {
                    let matched = pattern.is_match(key).map_err(|err| {
                        Error::invalid_schema(
                            path,
                            format!("pattern '{}' failed on key '{key}': {err}", pattern.as_str()),
                        )
                    })?;
                    if matched {
                        matching.push(*schema);
                    }
                }
                if matching.is_empty() {
                    continue;
                }

                let key_path = path.quoted_property(key);
                let mut branches = Vec::with_capacity(matching.len() + 1);
                if let Some(declared) = coerced_properties.remove(key) {
                    branches.push(declared);
                }
                for schema in matching {
                    branches.push(self.coerce(schema, value, &key_path)?);
                }

                coerced_properties.insert(key.clone(), json!({ "allOf": branches }));
                let key_value = Value::String(key.clone());
                if !required.contains(&key_value) {
                    required.push(key_value);
                }
            }

            coerced.remove("patternProperties");
            coerced.insert("required".to_string(), Value::Array(required));
        }

        coerced.insert("properties".to_string(), Value::Object(coerced_properties));
        Ok(())
    }

    /// Keep the `anyOf`/`oneOf` branches that admit the override.
    fn coerce_alternatives(
        &self,
        combinator: Combinator,
        branches: &[Value],
        override_value: &Override,
        path: &SchemaPath,
    ) -> Result<Vec<Value>> {
        let (survivors, failures): (Vec<_>, Vec<_>) = branches
            .iter()
            .enumerate()
            .map(|(index, branch)| {
                self.coerce(
                    branch,
                    override_value,
                    &path.branch(combinator.keyword(), index),
                )
            })
            .partition(Result::is_ok);

        if survivors.is_empty() {
            return Err(Error::CombinatorExhausted {
                keyword: combinator.keyword(),
                path: path.clone(),
                failures: failures.into_iter().filter_map(Result::err).collect(),
            });
        }

        debug!(
            path = %path,
            keyword = combinator.keyword(),
            survivors = survivors.len(),
            branches = branches.len(),
            "pruned combinator branches"
        );

        Ok(survivors.into_iter().filter_map(Result::ok).collect())
    }
}

/// `type` as a list of names; empty when the schema allows any type.
fn declared_types<'s>(schema: &'s Map<String, Value>, path: &SchemaPath) -> Result<Vec<&'s str>> {
    match schema.get("type") {
        None => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![name.as_str()]),
        Some(Value::Array(names)) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .ok_or_else(|| Error::invalid_schema(path, "`type` entries must be strings"))
            })
            .collect(),
        Some(_) => Err(Error::invalid_schema(
            path,
            "`type` must be a string or an array of strings",
        )),
    }
}

fn combinator_branches<'s>(
    combinator: Combinator,
    branches: &'s Value,
    path: &SchemaPath,
) -> Result<&'s [Value]> {
    match branches {
        Value::Array(branches) if !branches.is_empty() => Ok(branches),
        _ => Err(Error::invalid_schema(
            path,
            format!("`{}` must be a non-empty array", combinator.keyword()),
        )),
    }
}

fn compile_patterns<'s>(
    pattern_properties: &'s Map<String, Value>,
    path: &SchemaPath,
) -> Result<Vec<(Regex, &'s Value)>> {
    pattern_properties
        .iter()
        .map(|(pattern, schema)| {
            Regex::new(pattern)
                .map(|regex| (regex, schema))
                .map_err(|err| {
                    Error::invalid_schema(path, format!("invalid pattern '{pattern}': {err}"))
                })
        })
        .collect()
}
