use serde_json::Value;

use crate::error::GenerationError;

/// Produces random data for a (coerced) schema.
///
/// Contract: when `schema.type` is a single concrete type the result has that
/// kind, and when `minItems == maxItems` an array result has exactly that
/// length.
pub trait FakeDataGenerator: Send + Sync {
    fn generate(&self, schema: &Value) -> Result<Value, GenerationError>;
}
