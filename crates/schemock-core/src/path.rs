use std::fmt;

use crate::OVERRIDE_ROOT;

/// Display path of the override fragment being coerced.
///
/// Used only in diagnostics, e.g. `override.items[2]<oneOf[0]>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaPath(String);

impl SchemaPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    /// The `override` root used by the generator facade.
    pub fn root() -> Self {
        Self::new(OVERRIDE_ROOT)
    }

    pub fn property(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    /// Pattern-matched keys are quoted since they may contain any character.
    pub fn quoted_property(&self, name: &str) -> Self {
        Self(format!("{}.\"{name}\"", self.0))
    }

    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    pub fn branch(&self, keyword: &str, index: usize) -> Self {
        Self(format!("{}<{keyword}[{index}]>", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SchemaPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
