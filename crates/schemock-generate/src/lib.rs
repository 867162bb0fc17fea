//! Override-aware fake data generation for schemock.
//!
//! [`make_generator`] turns a JSON schema into a [`DataGenerator`]. Each call
//! to [`DataGenerator::generate`] narrows the schema to the given override,
//! fills the unspecified parts with random data, merges the override on top
//! and validates the result against the original schema.

pub mod engine;
pub mod model;
pub mod random;

pub use engine::{Data, DataGenerator, make_generator, make_generators};
pub use model::{GenerateOptions, GeneratorSettings};
pub use random::RandomDataGenerator;
