use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use schemock_core::{
    Coercer, Error, FakeDataGenerator, FrozenValue, JsonSchemaValidator, Kind, Override, Result,
    SchemaPath, SchemaValidator, freeze, merge,
};

use crate::model::GenerateOptions;
use crate::random::RandomDataGenerator;

/// Output of [`DataGenerator::generate`].
///
/// Arrays and objects come back [`Data::Frozen`] when the generator was built
/// with `immutable`; everything else is [`Data::Mutable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Mutable(Value),
    Frozen(FrozenValue),
}

impl Data {
    /// Owned JSON; a frozen tree is copied out.
    pub fn into_value(self) -> Value {
        match self {
            Data::Mutable(value) => value,
            Data::Frozen(frozen) => frozen.to_value(),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Data::Mutable(value) => Some(value),
            Data::Frozen(_) => None,
        }
    }

    pub fn as_frozen(&self) -> Option<&FrozenValue> {
        match self {
            Data::Frozen(frozen) => Some(frozen),
            Data::Mutable(_) => None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Data::Frozen(_))
    }
}

impl PartialEq<Value> for Data {
    fn eq(&self, other: &Value) -> bool {
        match self {
            Data::Mutable(value) => value == other,
            Data::Frozen(frozen) => frozen == other,
        }
    }
}

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Data::Mutable(value) => value.serialize(serializer),
            Data::Frozen(frozen) => frozen.serialize(serializer),
        }
    }
}

/// Produces schema-valid data that contains a caller-supplied override.
///
/// Cloning is cheap: the schema and both collaborators are shared.
#[derive(Clone)]
pub struct DataGenerator {
    schema: Arc<Value>,
    options: GenerateOptions,
    generator: Arc<dyn FakeDataGenerator>,
    validator: Arc<dyn SchemaValidator>,
}

/// Build a generator for `schema` with the default random generator and
/// validator.
pub fn make_generator(schema: Option<Value>, options: GenerateOptions) -> Result<DataGenerator> {
    let generator = Arc::new(RandomDataGenerator::from_options(&options));
    DataGenerator::with_collaborators(
        schema,
        options,
        generator,
        Arc::new(JsonSchemaValidator::default()),
    )
}

/// Build one generator per named schema, all sharing the same collaborators.
pub fn make_generators<I>(schemas: I, options: GenerateOptions) -> Result<BTreeMap<String, DataGenerator>>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let generator: Arc<dyn FakeDataGenerator> =
        Arc::new(RandomDataGenerator::from_options(&options));
    let validator: Arc<dyn SchemaValidator> = Arc::new(JsonSchemaValidator::default());

    schemas
        .into_iter()
        .map(|(name, schema)| {
            let built = DataGenerator::with_collaborators(
                Some(schema),
                options.clone(),
                Arc::clone(&generator),
                Arc::clone(&validator),
            )?;
            Ok((name, built))
        })
        .collect()
}

impl DataGenerator {
    pub fn with_collaborators(
        schema: Option<Value>,
        options: GenerateOptions,
        generator: Arc<dyn FakeDataGenerator>,
        validator: Arc<dyn SchemaValidator>,
    ) -> Result<Self> {
        let schema = match schema {
            None | Some(Value::Null) => return Err(Error::MissingSchema),
            Some(schema) => schema,
        };
        Ok(Self {
            schema: Arc::new(schema),
            options,
            generator,
            validator,
        })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// The schema narrowed to `override_value`.
    pub fn coerce(&self, override_value: &Override) -> Result<Value> {
        Coercer::new(self.validator.as_ref()).coerce(
            &self.schema,
            override_value,
            &SchemaPath::root(),
        )
    }

    /// Generate data that satisfies the schema and contains `override_value`.
    pub fn generate(&self, override_value: &Override) -> Result<Data> {
        let start = Instant::now();

        let mut coerced = self.coerce(override_value)?;
        require_overridden(&mut coerced, override_value);
        debug!(schema = %coerced, "coerced schema");

        let base = self.generator.generate(&coerced)?;
        let data = merge(base, override_value);

        if let Err(failure) = self.validator.validate(&self.schema, &data) {
            warn!(
                event = "final_validation_failed",
                issues = failure.issues.len(),
                error = %failure,
                "generated data does not satisfy the schema"
            );
            return Err(Error::FinalValidation {
                schema: self.schema.as_ref().clone(),
                message: failure.text(),
                data,
            });
        }

        info!(
            event = "generation_finished",
            overridden = !override_value.is_absent(),
            immutable = self.options.immutable,
            duration_us = start.elapsed().as_micros() as u64,
            "data generated"
        );

        if self.options.immutable && Kind::of_value(&data).is_container() {
            Ok(Data::Frozen(freeze(data)))
        } else {
            Ok(Data::Mutable(data))
        }
    }

    /// `count` independent results for the same override.
    pub fn generate_many(&self, override_value: &Override, count: usize) -> Result<Vec<Data>> {
        (0..count).map(|_| self.generate(override_value)).collect()
    }
}

impl fmt::Debug for DataGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataGenerator")
            .field("schema", &self.schema)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Mark every key an object override sets as `required` in the coerced
/// schema, so that partially overridden optional objects are generated in
/// full before the override is merged on top.
fn require_overridden(schema: &mut Value, override_value: &Override) {
    let Value::Object(schema) = schema else {
        return;
    };

    match override_value {
        Override::Object(_) => {
            let mut required = match schema.remove("required") {
                Some(Value::Array(required)) => required,
                _ => Vec::new(),
            };
            for (key, _) in override_value.entries() {
                let key = Value::String(key.clone());
                if !required.contains(&key) {
                    required.push(key);
                }
            }
            if !required.is_empty() {
                schema.insert("required".to_string(), Value::Array(required));
            }

            if let Some(Value::Object(properties)) = schema.get_mut("properties") {
                for (key, value) in override_value.entries() {
                    if let Some(property) = properties.get_mut(key) {
                        require_overridden(property, value);
                    }
                }
            }
        }
        Override::Array(_) => {
            if let Some(Value::Array(items)) = schema.get_mut("items") {
                for (index, item) in items.iter_mut().enumerate() {
                    require_overridden(item, override_value.item(index));
                }
            }
        }
        _ => return,
    }

    for keyword in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(branches)) = schema.get_mut(keyword) {
            for branch in branches {
                require_overridden(branch, override_value);
            }
        }
    }
}
