use std::path::Path;

use schemock_generate::{GenerateOptions, GeneratorSettings};
use serde::{Deserialize, Serialize};

use crate::CliError;

pub const DEFAULT_SETTINGS_FILE: &str = "schemock.toml";

/// Contents of `schemock.toml`. Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub immutable: bool,
    pub seed: Option<u64>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub log_json: bool,
    pub generator: GeneratorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            immutable: false,
            seed: None,
            log_level: "warn".to_string(),
            log_json: false,
            generator: GeneratorSettings::default(),
        }
    }
}

impl Settings {
    /// Generator options with command-line values taking precedence.
    pub fn generate_options(&self, seed: Option<u64>, immutable: bool) -> GenerateOptions {
        GenerateOptions {
            immutable: immutable || self.immutable,
            seed: seed.or(self.seed),
            generator: self.generator.clone(),
        }
    }
}

/// Load settings from `path`; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<Settings, CliError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

pub fn parse_settings(content: &str) -> Result<Settings, CliError> {
    let settings: Settings = toml::from_str(content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<(), CliError> {
    let probability = settings.generator.optional_probability;
    if !(0.0..=1.0).contains(&probability) {
        return Err(CliError::InvalidConfig(format!(
            "generator.optional_probability must be within 0..=1, got {probability}"
        )));
    }
    if settings.generator.max_repeat == 0 {
        return Err(CliError::InvalidConfig(
            "generator.max_repeat must be > 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = parse_settings("").expect("empty settings");
        assert!(!settings.immutable);
        assert_eq!(settings.seed, None);
        assert_eq!(settings.log_level, "warn");
        assert_eq!(settings.generator.max_depth, GeneratorSettings::default().max_depth);
    }

    #[test]
    fn parses_generator_section() {
        let settings = parse_settings(
            r#"
            immutable = true
            seed = 42
            log_level = "schemock=debug"
            log_json = true

            [generator]
            max_items = 2
            optional_probability = 1.0
            "#,
        )
        .expect("valid settings");

        assert!(settings.immutable);
        assert_eq!(settings.seed, Some(42));
        assert!(settings.log_json);
        assert_eq!(settings.generator.max_items, 2);
        assert_eq!(settings.generator.optional_probability, 1.0);
        assert_eq!(settings.generator.max_string_len, GeneratorSettings::default().max_string_len);
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let err = parse_settings("[generator]\noptional_probability = 1.5\n")
            .expect_err("probability above one");
        assert!(matches!(err, CliError::InvalidConfig(_)));
    }

    #[test]
    fn command_line_values_win() {
        let settings = Settings {
            seed: Some(1),
            ..Settings::default()
        };
        let options = settings.generate_options(Some(9), true);
        assert_eq!(options.seed, Some(9));
        assert!(options.immutable);
        assert_eq!(settings.generate_options(None, false).seed, Some(1));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = load_settings(Path::new("does/not/exist/schemock.toml"))
            .expect("defaults for a missing file");
        assert_eq!(settings.log_level, "warn");
    }
}
