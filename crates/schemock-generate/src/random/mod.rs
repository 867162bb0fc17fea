//! Default [`FakeDataGenerator`]: seeded random data for JSON schemas.

mod resolve;
mod text;

use std::sync::{Mutex, PoisonError};

use fancy_regex::Regex;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{Map, Number, Value, json};
use tracing::debug;

use schemock_core::{FakeDataGenerator, GenerationError, Kind};

use crate::model::{GenerateOptions, GeneratorSettings};

use resolve::resolve;

const DEFAULT_INT_SPAN: i64 = 1000;
const DEFAULT_FLOAT_SPAN: f64 = 1000.0;
const KEY_ATTEMPTS: usize = 8;
const UNIQUE_ATTEMPTS: usize = 8;

const ANY_KINDS: &[Kind] = &[
    Kind::Null,
    Kind::Boolean,
    Kind::Integer,
    Kind::Number,
    Kind::String,
    Kind::Array,
    Kind::Object,
];
const SCALAR_KINDS: &[Kind] = &[
    Kind::Null,
    Kind::Boolean,
    Kind::Integer,
    Kind::Number,
    Kind::String,
];

/// Random data generator backed by a `ChaCha8Rng`.
///
/// The random source sits behind a mutex, so one instance can serve
/// concurrent callers. A seeded instance yields the same data for the same
/// sequence of calls.
pub struct RandomDataGenerator {
    settings: GeneratorSettings,
    rng: Mutex<ChaCha8Rng>,
}

impl RandomDataGenerator {
    /// Generator seeded from the thread-local entropy source.
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            rng: Mutex::new(ChaCha8Rng::from_rng(&mut rand::rng())),
        }
    }

    pub fn seeded(seed: u64, settings: GeneratorSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn from_options(options: &GenerateOptions) -> Self {
        match options.seed {
            Some(seed) => Self::seeded(seed, options.generator.clone()),
            None => Self::new(options.generator.clone()),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }
}

impl Default for RandomDataGenerator {
    fn default() -> Self {
        Self::new(GeneratorSettings::default())
    }
}

impl FakeDataGenerator for RandomDataGenerator {
    fn generate(&self, schema: &Value) -> Result<Value, GenerationError> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut session = Session {
            settings: &self.settings,
            rng: &mut *rng,
        };
        session.value(schema, 0)
    }
}

/// One generation pass over a schema tree.
struct Session<'a> {
    settings: &'a GeneratorSettings,
    rng: &'a mut ChaCha8Rng,
}

impl Session<'_> {
    fn value(&mut self, schema: &Value, depth: usize) -> Result<Value, GenerationError> {
        let schema = resolve(schema, self.rng)?;

        if let Some(constant) = schema.get("const") {
            return Ok(constant.clone());
        }
        if let Some(members) = schema.get("enum") {
            let members = members.as_array().ok_or_else(|| {
                GenerationError::InvalidSchema("`enum` must be an array".to_string())
            })?;
            return members.choose(self.rng).cloned().ok_or_else(|| {
                GenerationError::Unsatisfiable("`enum` has no members".to_string())
            });
        }

        let kind = self.pick_kind(&schema, depth)?;
        debug!(kind = %kind, depth, "generating value");

        match kind {
            Kind::Undefined | Kind::Null => Ok(Value::Null),
            Kind::Boolean => Ok(Value::Bool(self.rng.random_bool(0.5))),
            Kind::Integer => self.integer(&schema).map(Value::from),
            Kind::Number => self.number(&schema),
            Kind::String => text::generate_string(&schema, self.settings, self.rng).map(Value::String),
            Kind::Array => self.array(&schema, depth),
            Kind::Object => self.object(&schema, depth),
        }
    }

    fn pick_kind(&mut self, schema: &Map<String, Value>, depth: usize) -> Result<Kind, GenerationError> {
        let declared: Vec<Kind> = match schema.get("type") {
            None => Vec::new(),
            Some(Value::String(name)) => vec![parse_kind(name)?],
            Some(Value::Array(names)) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .ok_or_else(|| {
                            GenerationError::InvalidSchema(
                                "`type` entries must be strings".to_string(),
                            )
                        })
                        .and_then(parse_kind)
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(GenerationError::InvalidSchema(format!(
                    "`type` must be a string or an array of strings, found {other}"
                )));
            }
        };

        if let Some(kind) = declared.choose(self.rng) {
            return Ok(*kind);
        }
        if let Some(kind) = implied_kind(schema) {
            return Ok(kind);
        }

        let pool = if depth >= self.settings.max_depth {
            SCALAR_KINDS
        } else {
            ANY_KINDS
        };
        pool.choose(self.rng).copied().ok_or_else(|| {
            GenerationError::Unsatisfiable("no value kind to choose from".to_string())
        })
    }

    fn integer(&mut self, schema: &Map<String, Value>) -> Result<i64, GenerationError> {
        let lower = lower_bound(schema).map(|(value, exclusive)| {
            if exclusive {
                value.floor() as i64 + 1
            } else {
                value.ceil() as i64
            }
        });
        let upper = upper_bound(schema).map(|(value, exclusive)| {
            if exclusive {
                value.ceil() as i64 - 1
            } else {
                value.floor() as i64
            }
        });
        let (lower, upper) = match (lower, upper) {
            (Some(lower), Some(upper)) => (lower, upper),
            (Some(lower), None) => (lower, lower.saturating_add(DEFAULT_INT_SPAN)),
            (None, Some(upper)) => (upper.saturating_sub(DEFAULT_INT_SPAN), upper),
            (None, None) => (0, DEFAULT_INT_SPAN),
        };
        if lower > upper {
            return Err(GenerationError::Unsatisfiable(format!(
                "no integer between {lower} and {upper}"
            )));
        }

        match multiple_of(schema) {
            Some(step) if step.fract() == 0.0 && step >= 1.0 => {
                let step = step as i64;
                let first = lower.div_euclid(step) + i64::from(lower.rem_euclid(step) != 0);
                let last = upper.div_euclid(step);
                if first > last {
                    return Err(GenerationError::Unsatisfiable(format!(
                        "no multiple of {step} between {lower} and {upper}"
                    )));
                }
                Ok(self.rng.random_range(first..=last) * step)
            }
            Some(step) if (1.0 / step).fract() != 0.0 => Err(GenerationError::Unsatisfiable(
                format!("integers cannot honour multipleOf {step}"),
            )),
            _ => Ok(self.rng.random_range(lower..=upper)),
        }
    }

    fn number(&mut self, schema: &Map<String, Value>) -> Result<Value, GenerationError> {
        let (lower, lower_exclusive) = lower_bound(schema).unwrap_or((f64::NAN, false));
        let (upper, upper_exclusive) = upper_bound(schema).unwrap_or((f64::NAN, false));
        let (lower, upper) = match (lower.is_nan(), upper.is_nan()) {
            (false, false) => (lower, upper),
            (false, true) => (lower, lower + DEFAULT_FLOAT_SPAN),
            (true, false) => (upper - DEFAULT_FLOAT_SPAN, upper),
            (true, true) => (0.0, DEFAULT_FLOAT_SPAN),
        };
        let admits = |value: f64| {
            (if lower_exclusive { value > lower } else { value >= lower })
                && (if upper_exclusive { value < upper } else { value <= upper })
        };

        let value = if let Some(step) = multiple_of(schema) {
            let first = (lower / step).ceil() as i64;
            let last = (upper / step).floor() as i64;
            let candidates: Vec<f64> = [first, last]
                .into_iter()
                .chain(std::iter::once(if first < last {
                    self.rng.random_range(first..=last)
                } else {
                    first
                }))
                .map(|factor| factor as f64 * step)
                .filter(|value| admits(*value))
                .collect();
            candidates.last().copied()
        } else if lower < upper {
            // A width past f64::MAX cannot be sampled uniformly.
            let (from, to) = if (upper - lower).is_finite() {
                (lower, upper)
            } else {
                (lower.max(-DEFAULT_FLOAT_SPAN), upper.min(DEFAULT_FLOAT_SPAN))
            };
            let sampled = self.rng.random_range(from..to);
            let rounded = (sampled * 100.0).round() / 100.0;
            [rounded, sampled, (lower + upper) / 2.0]
                .into_iter()
                .find(|value| admits(*value))
        } else {
            Some(lower).filter(|value| admits(*value))
        };

        value
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                GenerationError::Unsatisfiable(format!("no number between {lower} and {upper}"))
            })
    }

    fn array(&mut self, schema: &Map<String, Value>, depth: usize) -> Result<Value, GenerationError> {
        let min_items = count(schema, "minItems").unwrap_or(0);
        let max_items = count(schema, "maxItems");
        if let Some(max_items) = max_items
            && max_items < min_items
        {
            return Err(GenerationError::Unsatisfiable(format!(
                "maxItems {max_items} is below minItems {min_items}"
            )));
        }

        let unconstrained = Value::Bool(true);
        let (tuple, rest): (&[Value], &Value) = match schema.get("items") {
            Some(Value::Array(tuple)) => (
                tuple,
                schema.get("additionalItems").unwrap_or(&unconstrained),
            ),
            Some(item) => (&[], item),
            None => (&[], &unconstrained),
        };

        let len = if !tuple.is_empty() {
            tuple.len().max(min_items)
        } else if depth >= self.settings.max_depth {
            min_items
        } else {
            let upper = max_items.unwrap_or_else(|| min_items.max(self.settings.max_items));
            self.rng.random_range(min_items..=upper)
        };
        let len = max_items.map_or(len, |max_items| len.min(max_items));

        if len > tuple.len() && rest == &Value::Bool(false) {
            return Err(GenerationError::Unsatisfiable(format!(
                "{len} items required but additionalItems is false"
            )));
        }

        let unique = schema.get("uniqueItems") == Some(&Value::Bool(true));
        let mut items = Vec::with_capacity(len);
        for index in 0..len {
            let item_schema = tuple.get(index).unwrap_or(rest);
            let mut item = self.value(item_schema, depth + 1)?;
            if unique {
                let mut attempts = 0;
                while items.contains(&item) && attempts < UNIQUE_ATTEMPTS {
                    item = self.value(item_schema, depth + 1)?;
                    attempts += 1;
                }
            }
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn object(&mut self, schema: &Map<String, Value>, depth: usize) -> Result<Value, GenerationError> {
        let empty = Map::new();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let patterns = compile_patterns(schema)?;
        let additional = schema.get("additionalProperties");

        let mut object = Map::new();
        for (name, property_schema) in properties {
            let emit = required.contains(&name.as_str())
                || (depth < self.settings.max_depth
                    && self
                        .rng
                        .random_bool(self.settings.optional_probability));
            if emit {
                let property_schema = with_patterns(property_schema, name, &patterns);
                object.insert(name.clone(), self.value(&property_schema, depth + 1)?);
            }
        }

        for name in &required {
            if object.contains_key(*name) {
                continue;
            }
            let property_schema = undeclared_schema(name, &patterns, additional)?;
            object.insert(name.to_string(), self.value(&property_schema, depth + 1)?);
        }

        let min_properties = count(schema, "minProperties").unwrap_or(0);
        let mut attempts = 0;
        while object.len() < min_properties {
            if attempts >= KEY_ATTEMPTS.saturating_mul(min_properties) {
                return Err(GenerationError::Unsatisfiable(format!(
                    "could not produce {min_properties} properties"
                )));
            }
            attempts += 1;
            let (key, property_schema) =
                self.extra_property(&object, properties, &patterns, additional)?;
            if !object.contains_key(&key) {
                let value = self.value(&property_schema, depth + 1)?;
                object.insert(key, value);
            }
        }

        if let Some(max_properties) = count(schema, "maxProperties") {
            let optional: Vec<String> = object
                .keys()
                .filter(|key| !required.contains(&key.as_str()))
                .cloned()
                .collect();
            for key in optional {
                if object.len() <= max_properties {
                    break;
                }
                object.remove(&key);
            }
        }

        Ok(Value::Object(object))
    }

    /// Key and schema for one more property: a skipped optional property
    /// first, then a pattern-generated key, then an additional property.
    fn extra_property(
        &mut self,
        present: &Map<String, Value>,
        properties: &Map<String, Value>,
        patterns: &[(Regex, String, Value)],
        additional: Option<&Value>,
    ) -> Result<(String, Value), GenerationError> {
        let skipped: Vec<(&String, &Value)> = properties
            .iter()
            .filter(|(name, _)| !present.contains_key(*name))
            .collect();
        if let Some((name, schema)) = skipped.choose(self.rng) {
            return Ok(((*name).clone(), with_patterns(schema, name, patterns)));
        }

        if let Some((_, source, schema)) = patterns.choose(self.rng) {
            let key = text::from_pattern(source, 1, None, self.settings.max_repeat, self.rng)?;
            let schema = with_patterns(schema, &key, patterns);
            return Ok((key, schema));
        }

        match additional {
            Some(Value::Bool(false)) => Err(GenerationError::Unsatisfiable(
                "minProperties needs more keys than the schema allows".to_string(),
            )),
            other => {
                let key = text::generate_string(&Map::new(), self.settings, self.rng)?;
                let schema = other.cloned().unwrap_or(Value::Bool(true));
                Ok((key.clone(), with_patterns(&schema, &key, patterns)))
            }
        }
    }
}

fn parse_kind(name: &str) -> Result<Kind, GenerationError> {
    Kind::parse(name)
        .filter(|kind| *kind != Kind::Undefined)
        .ok_or_else(|| GenerationError::InvalidSchema(format!("unknown type '{name}'")))
}

/// Kind suggested by the keywords of an untyped schema.
fn implied_kind(schema: &Map<String, Value>) -> Option<Kind> {
    const OBJECT: &[&str] = &["properties", "patternProperties", "required", "minProperties"];
    const ARRAY: &[&str] = &["items", "additionalItems", "minItems", "maxItems"];
    const STRING: &[&str] = &["pattern", "format", "minLength", "maxLength"];
    const NUMBER: &[&str] = &["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf"];

    let has = |keywords: &[&str]| keywords.iter().any(|keyword| schema.contains_key(*keyword));
    if has(OBJECT) {
        Some(Kind::Object)
    } else if has(ARRAY) {
        Some(Kind::Array)
    } else if has(STRING) {
        Some(Kind::String)
    } else if has(NUMBER) {
        Some(Kind::Number)
    } else {
        None
    }
}

/// `(bound, exclusive)`, accepting both numeric and boolean `exclusiveMinimum`.
fn lower_bound(schema: &Map<String, Value>) -> Option<(f64, bool)> {
    tightest(schema, "minimum", "exclusiveMinimum", f64::max)
}

fn upper_bound(schema: &Map<String, Value>) -> Option<(f64, bool)> {
    tightest(schema, "maximum", "exclusiveMaximum", f64::min)
}

fn tightest(
    schema: &Map<String, Value>,
    inclusive: &str,
    exclusive: &str,
    choose: fn(f64, f64) -> f64,
) -> Option<(f64, bool)> {
    let bound = schema.get(inclusive).and_then(Value::as_f64);
    match schema.get(exclusive) {
        Some(Value::Bool(true)) => bound.map(|bound| (bound, true)),
        Some(Value::Number(number)) => {
            let strict = number.as_f64()?;
            match bound {
                Some(bound) if choose(bound, strict) == bound && bound != strict => {
                    Some((bound, false))
                }
                _ => Some((strict, true)),
            }
        }
        _ => bound.map(|bound| (bound, false)),
    }
}

fn multiple_of(schema: &Map<String, Value>) -> Option<f64> {
    schema
        .get("multipleOf")
        .and_then(Value::as_f64)
        .filter(|step| *step > 0.0)
}

fn count(schema: &Map<String, Value>, keyword: &str) -> Option<usize> {
    schema
        .get(keyword)
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
}

fn compile_patterns(
    schema: &Map<String, Value>,
) -> Result<Vec<(Regex, String, Value)>, GenerationError> {
    let Some(pattern_properties) = schema.get("patternProperties").and_then(Value::as_object) else {
        return Ok(Vec::new());
    };
    pattern_properties
        .iter()
        .map(|(pattern, schema)| {
            Regex::new(pattern)
                .map(|regex| (regex, pattern.clone(), schema.clone()))
                .map_err(|err| {
                    GenerationError::InvalidSchema(format!("invalid pattern '{pattern}': {err}"))
                })
        })
        .collect()
}

/// `schema` combined with every pattern property schema matching `key`.
fn with_patterns(schema: &Value, key: &str, patterns: &[(Regex, String, Value)]) -> Value {
    let matching: Vec<Value> = patterns
        .iter()
        .filter(|(regex, _, _)| matches!(regex.is_match(key), Ok(true)))
        .map(|(_, _, schema)| schema.clone())
        .collect();
    if matching.is_empty() {
        return schema.clone();
    }
    let mut branches = vec![schema.clone()];
    branches.extend(matching);
    json!({ "allOf": branches })
}

/// Schema for a required key missing from `properties`.
fn undeclared_schema(
    key: &str,
    patterns: &[(Regex, String, Value)],
    additional: Option<&Value>,
) -> Result<Value, GenerationError> {
    if patterns
        .iter()
        .any(|(regex, _, _)| matches!(regex.is_match(key), Ok(true)))
    {
        return Ok(with_patterns(&Value::Bool(true), key, patterns));
    }
    match additional {
        Some(Value::Bool(false)) => Err(GenerationError::Unsatisfiable(format!(
            "required property '{key}' is not allowed by the schema"
        ))),
        Some(schema) => Ok(schema.clone()),
        None => Ok(Value::Bool(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> RandomDataGenerator {
        RandomDataGenerator::seeded(seed, GeneratorSettings::default())
    }

    #[test]
    fn seeded_generators_repeat_themselves() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "array", "items": {"type": "integer"}}},
        });
        let first = generator(42).generate(&schema).expect("first");
        let second = generator(42).generate(&schema).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn integers_honour_bounds_and_multiples() {
        let generator = generator(1);
        let schema = json!({"type": "integer", "minimum": 3, "exclusiveMaximum": 40, "multipleOf": 6});
        for _ in 0..50 {
            let value = generator.generate(&schema).expect("integer").as_i64().expect("i64");
            assert!((6..=36).contains(&value), "{value}");
            assert_eq!(value % 6, 0);
        }
    }

    #[test]
    fn numbers_honour_exclusive_bounds() {
        let generator = generator(2);
        let schema = json!({"type": "number", "exclusiveMinimum": 0.5, "maximum": 0.75});
        for _ in 0..50 {
            let value = generator.generate(&schema).expect("number").as_f64().expect("f64");
            assert!(value > 0.5 && value <= 0.75, "{value}");
        }
    }

    #[test]
    fn empty_ranges_are_unsatisfiable() {
        let err = generator(3)
            .generate(&json!({"type": "integer", "minimum": 5, "maximum": 4}))
            .expect_err("empty range");
        assert!(matches!(err, GenerationError::Unsatisfiable(_)));
    }

    #[test]
    fn pinned_lengths_are_exact() {
        let generator = generator(4);
        let schema = json!({"type": "array", "items": {"type": "boolean"}, "minItems": 3, "maxItems": 3});
        for _ in 0..10 {
            let value = generator.generate(&schema).expect("array");
            assert_eq!(value.as_array().map(Vec::len), Some(3));
        }
    }

    #[test]
    fn tuples_follow_their_positions() {
        let schema = json!({
            "type": "array",
            "items": [{"type": "boolean"}, {"type": "string"}, {"const": 5}],
        });
        let value = generator(5).generate(&schema).expect("tuple");
        let items = value.as_array().expect("array");
        assert_eq!(items.len(), 3);
        assert!(items[0].is_boolean());
        assert!(items[1].is_string());
        assert_eq!(items[2], json!(5));
    }

    #[test]
    fn required_and_pattern_properties_are_emitted() {
        let schema = json!({
            "type": "object",
            "properties": {"id": {"type": "integer"}},
            "patternProperties": {"^x-[a-z]{2}$": {"type": "boolean"}},
            "additionalProperties": false,
            "required": ["id"],
            "minProperties": 2,
        });
        let value = generator(6).generate(&schema).expect("object");
        let object = value.as_object().expect("object");

        assert!(object.get("id").is_some_and(Value::is_i64));
        assert!(object.len() >= 2);
        let matcher = regex::Regex::new("^x-[a-z]{2}$").expect("regex");
        for (key, value) in object.iter().filter(|(key, _)| key.as_str() != "id") {
            assert!(matcher.is_match(key), "{key}");
            assert!(value.is_boolean());
        }
    }

    #[test]
    fn enums_pick_a_member() {
        let generator = generator(7);
        let members = [json!("a"), json!(2), json!(null)];
        for _ in 0..20 {
            let value = generator.generate(&json!({"enum": members})).expect("enum");
            assert!(members.contains(&value));
        }
    }

    #[test]
    fn untyped_schemas_stop_nesting_at_max_depth() {
        let settings = GeneratorSettings {
            max_depth: 0,
            ..GeneratorSettings::default()
        };
        let generator = RandomDataGenerator::seeded(8, settings);
        for _ in 0..20 {
            let value = generator.generate(&json!({})).expect("scalar");
            assert!(!value.is_array() && !value.is_object(), "{value}");
        }
    }

    #[test]
    fn numbers_between_extreme_bounds_are_sampled() {
        let generator = generator(9);
        let schema = json!({"type": "number", "minimum": -1.7e308, "maximum": 1.7e308});
        for _ in 0..20 {
            let value = generator.generate(&schema).expect("number").as_f64().expect("f64");
            assert!((-1.7e308..=1.7e308).contains(&value), "{value}");
        }
    }

    #[test]
    fn nan_probability_still_emits_objects() {
        let settings = GeneratorSettings {
            optional_probability: f64::NAN,
            ..GeneratorSettings::default()
        };
        let generator = RandomDataGenerator::seeded(10, settings);
        assert_eq!(generator.settings().optional_probability, 0.5);

        let schema = json!({"type": "object", "properties": {"a": {"type": "integer"}}});
        for _ in 0..10 {
            assert!(generator.generate(&schema).expect("object").is_object());
        }
    }

    #[test]
    fn huge_min_properties_are_unsatisfiable() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}},
            "additionalProperties": false,
            "minProperties": u64::MAX,
        });
        let err = generator(11).generate(&schema).expect_err("too many properties");
        assert!(matches!(err, GenerationError::Unsatisfiable(_)));
    }
}
