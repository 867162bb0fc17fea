use serde_json::Value;
use thiserror::Error;

use crate::kind::Kind;
use crate::path::SchemaPath;

/// Errors raised while coercing a schema or producing data for an override.
#[derive(Debug, Error)]
pub enum Error {
    /// No schema was given to the generator factory.
    #[error("A json-schema must be provided")]
    MissingSchema,
    /// The override's kind is not allowed by the schema `type`.
    #[error("Invalid {path} type \"{found}\" for schema type \"{expected}\"")]
    TypeMismatch {
        path: SchemaPath,
        found: Kind,
        expected: String,
    },
    /// Structural pre-check failure: extra keys, missing required keys, tuple arity.
    #[error("{0}")]
    Shape(String),
    #[error("{path} does not deep equal \"const\"")]
    ConstMismatch { path: SchemaPath },
    #[error("{path} does not deep equal a member of \"enum\"")]
    EnumMismatch { path: SchemaPath },
    /// No `anyOf`/`oneOf` branch admits the override.
    #[error("{}", join_messages(.failures))]
    CombinatorExhausted {
        keyword: &'static str,
        path: SchemaPath,
        failures: Vec<Error>,
    },
    /// The merged data does not satisfy the original schema.
    #[error("{}", final_report(.schema, .message, .data))]
    FinalValidation {
        schema: Value,
        message: String,
        data: Value,
    },
    #[error("invalid schema at {path}: {message}")]
    InvalidSchema { path: SchemaPath, message: String },
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl Error {
    pub(crate) fn invalid_schema(path: &SchemaPath, message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            path: path.clone(),
            message: message.into(),
        }
    }
}

/// Failures of a [`FakeDataGenerator`](crate::FakeDataGenerator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("unsatisfiable schema: {0}")]
    Unsatisfiable(String),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Convenience alias for results returned by schemock crates.
pub type Result<T> = std::result::Result<T, Error>;

fn join_messages(failures: &[Error]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn final_report(schema: &Value, message: &str, data: &Value) -> String {
    let schema = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    let data = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    [
        "Data Generator Error".to_string(),
        format!("Validation error: {message}"),
        "Original Schema:".to_string(),
        schema,
        "Generated Mock Data:".to_string(),
        data,
    ]
    .join("\n")
}
