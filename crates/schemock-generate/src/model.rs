use serde::{Deserialize, Serialize};

/// Options for generators built by [`make_generator`](crate::make_generator).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Return deep-frozen arrays and objects.
    pub immutable: bool,
    /// Seed for the default random generator; entropy when unset.
    pub seed: Option<u64>,
    /// Tuning for the default random generator.
    pub generator: GeneratorSettings,
}

/// Tuning knobs for [`RandomDataGenerator`](crate::RandomDataGenerator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Nesting depth after which untyped schemas only produce scalars and
    /// optional properties are skipped.
    pub max_depth: usize,
    /// Chance of emitting each optional property.
    pub optional_probability: f64,
    /// Upper bound on array length when `maxItems` is not set.
    pub max_items: usize,
    /// Upper bound on string length when `maxLength` is not set.
    pub max_string_len: usize,
    /// Repetition cap for `*` and `+` in `pattern` regexes.
    pub max_repeat: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_depth: 8,
            optional_probability: 0.5,
            max_items: 4,
            max_string_len: 24,
            max_repeat: 16,
        }
    }
}

impl GeneratorSettings {
    /// Settings the generator can always use: a NaN probability falls back
    /// to the default, other probabilities are clamped to `0..=1` and a zero
    /// `max_repeat` becomes one.
    pub fn sanitized(mut self) -> Self {
        self.optional_probability = if self.optional_probability.is_nan() {
            Self::default().optional_probability
        } else {
            self.optional_probability.clamp(0.0, 1.0)
        };
        self.max_repeat = self.max_repeat.max(1);
        self
    }
}
