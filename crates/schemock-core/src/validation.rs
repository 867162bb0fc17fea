use std::fmt;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::ROOT_TOKEN;

/// Validates data against a schema.
///
/// Implementations must be usable from several threads at once; the
/// generator facade shares one validator between all generators it builds.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema: &Value, data: &Value) -> Result<(), ValidationFailure>;
}

/// A single validation error located inside the validated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location relative to the document root, rendered as `.name` / `[index]`.
    pub instance_path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(instance_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            instance_path: instance_path.into(),
            message: message.into(),
        }
    }
}

/// Failed validation, renderable against any root name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationFailure {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// The schema itself could not be compiled.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::new(vec![ValidationIssue::new(
            "",
            format!("invalid schema: {}", message.into()),
        )])
    }

    /// Generic text, rooted at [`ROOT_TOKEN`].
    pub fn text(&self) -> String {
        self.rooted_at(ROOT_TOKEN)
    }

    /// Text with the generic root token replaced by `root`.
    pub fn rooted_at(&self, root: &str) -> String {
        self.issues
            .iter()
            .map(|issue| format!("{root}{}: {}", issue.instance_path, issue.message))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl std::error::Error for ValidationFailure {}

/// [`SchemaValidator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone)]
pub struct JsonSchemaValidator {
    draft: Draft,
}

impl JsonSchemaValidator {
    pub fn new(draft: Draft) -> Self {
        Self { draft }
    }
}

impl Default for JsonSchemaValidator {
    /// Draft 7 keeps array-form `items` (tuples) and `additionalItems`.
    fn default() -> Self {
        Self::new(Draft::Draft7)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, data: &Value) -> Result<(), ValidationFailure> {
        let compiled = JSONSchema::options()
            .with_draft(self.draft)
            .compile(schema)
            .map_err(|err| ValidationFailure::invalid_schema(err.to_string()))?;

        if let Err(errors) = compiled.validate(data) {
            let issues = errors
                .map(|error| {
                    ValidationIssue::new(
                        render_pointer(&error.instance_path.to_string()),
                        error.to_string(),
                    )
                })
                .collect();
            return Err(ValidationFailure::new(issues));
        }

        Ok(())
    }
}

/// Render a JSON pointer (`/a/0`) in path notation (`.a[0]`).
fn render_pointer(pointer: &str) -> String {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            if !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_digit()) {
                format!("[{segment}]")
            } else {
                format!(".{segment}")
            }
        })
        .collect()
}
