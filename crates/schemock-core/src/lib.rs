//! Core contracts and helpers for schemock.
//!
//! This crate owns the override model, the schema coercion algorithm and the
//! collaborator traits shared by the generator facade and the CLI.

pub mod coerce;
pub mod error;
pub mod freeze;
pub mod generator;
pub mod kind;
pub mod merge;
pub mod overrides;
pub mod path;
pub mod shape;
pub mod validation;

pub use coerce::{Coercer, Combinator};
pub use error::{Error, GenerationError, Result};
pub use freeze::{FrozenValue, freeze};
pub use generator::FakeDataGenerator;
pub use kind::Kind;
pub use merge::merge;
pub use overrides::Override;
pub use path::SchemaPath;
pub use shape::shallow_validate;
pub use validation::{JsonSchemaValidator, SchemaValidator, ValidationFailure, ValidationIssue};

/// Name validators give the validated document in generic error text.
pub const ROOT_TOKEN: &str = "data";

/// Path of the top-level override in diagnostics.
pub const OVERRIDE_ROOT: &str = "override";
