mod logging;
mod settings;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use schemock_core::{Error as CoreError, Override};
use schemock_generate::{DataGenerator, GenerateOptions, make_generator, make_generators};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use logging::init_logging;
use settings::{DEFAULT_SETTINGS_FILE, Settings, load_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging error: {0}")]
    Logging(String),
}

#[derive(Parser, Debug)]
#[command(name = "schemock", version, about = "Schema-driven mock data with overrides")]
struct Cli {
    /// Settings file.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate data for a schema, keeping the override verbatim.
    Generate(GenerateArgs),
    /// Print the schema narrowed to an override.
    Coerce(CoerceArgs),
}

#[derive(Args, Debug)]
struct OverrideArgs {
    /// Override as inline JSON.
    #[arg(long = "override", value_name = "JSON", conflicts_with = "override_file")]
    override_json: Option<String>,
    /// File holding the override JSON.
    #[arg(long, value_name = "PATH")]
    override_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// JSON schema file.
    #[arg(long, value_name = "PATH")]
    schema: PathBuf,
    /// Treat the schema file as a map of named schemas and use this entry.
    #[arg(long)]
    name: Option<String>,
    #[command(flatten)]
    overrides: OverrideArgs,
    /// Number of documents to generate.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    count: u64,
    /// Seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
    /// Deep-freeze generated arrays and objects.
    #[arg(long, default_value_t = false)]
    immutable: bool,
    /// Pretty-print the output.
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct CoerceArgs {
    /// JSON schema file.
    #[arg(long, value_name = "PATH")]
    schema: PathBuf,
    #[command(flatten)]
    overrides: OverrideArgs,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;
    init_logging(&settings)?;

    match cli.command {
        Command::Generate(args) => run_generate(args, &settings),
        Command::Coerce(args) => run_coerce(args, &settings),
    }
}

fn run_generate(args: GenerateArgs, settings: &Settings) -> Result<(), CliError> {
    let options = settings.generate_options(args.seed, args.immutable);
    let schema = read_json(&args.schema)?;
    let generator = select_generator(schema, args.name.as_deref(), options)?;
    let override_value = read_override(&args.overrides)?;

    let count = usize::try_from(args.count)
        .map_err(|_| CliError::InvalidConfig(format!("count {} is too large", args.count)))?;
    info!(
        schema = %args.schema.display(),
        count,
        overridden = !override_value.is_absent(),
        "generating documents"
    );

    let documents = generator.generate_many(&override_value, count)?;
    let output = match documents.as_slice() {
        [single] => render(single, args.pretty)?,
        many => render(many, args.pretty)?,
    };
    println!("{output}");
    Ok(())
}

fn run_coerce(args: CoerceArgs, settings: &Settings) -> Result<(), CliError> {
    let schema = read_json(&args.schema)?;
    let generator = make_generator(Some(schema), settings.generate_options(None, false))?;
    let override_value = read_override(&args.overrides)?;

    let coerced = generator.coerce(&override_value)?;
    println!("{}", render(&coerced, true)?);
    Ok(())
}

fn select_generator(
    schema: Value,
    name: Option<&str>,
    options: GenerateOptions,
) -> Result<DataGenerator, CliError> {
    let Some(name) = name else {
        return Ok(make_generator(Some(schema), options)?);
    };

    let Value::Object(schemas) = schema else {
        return Err(CliError::InvalidConfig(
            "--name requires a schema file holding an object of named schemas".to_string(),
        ));
    };
    let mut generators = make_generators(schemas, options)?;
    generators
        .remove(name)
        .ok_or_else(|| CliError::InvalidConfig(format!("no schema named '{name}'")))
}

fn read_override(args: &OverrideArgs) -> Result<Override, CliError> {
    let text = match (&args.override_json, &args.override_file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Ok(Override::Absent),
    };
    let value: Value = serde_json::from_str(&text)?;
    Ok(Override::from(value))
}

fn read_json(path: &Path) -> Result<Value, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn render<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_generate_arguments() {
        let cli = Cli::try_parse_from([
            "schemock",
            "generate",
            "--schema",
            "user.json",
            "--override",
            r#"{"name": "ada"}"#,
            "--count",
            "3",
            "--seed",
            "7",
            "--immutable",
        ])
        .expect("valid arguments");

        let Command::Generate(args) = cli.command else {
            panic!("expected the generate command");
        };
        assert_eq!(args.schema, PathBuf::from("user.json"));
        assert_eq!(args.count, 3);
        assert_eq!(args.seed, Some(7));
        assert!(args.immutable);
        assert!(!args.pretty);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_SETTINGS_FILE));
    }

    #[test]
    fn rejects_both_override_sources() {
        let result = Cli::try_parse_from([
            "schemock",
            "coerce",
            "--schema",
            "s.json",
            "--override",
            "1",
            "--override-file",
            "o.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_count() {
        let result = Cli::try_parse_from(["schemock", "generate", "--schema", "s.json", "--count", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn inline_overrides_are_parsed() {
        let args = OverrideArgs {
            override_json: Some(r#"[1, {"a": null}]"#.to_string()),
            override_file: None,
        };
        let override_value = read_override(&args).expect("valid json");
        assert_eq!(override_value.to_value(), json!([1, {"a": null}]));

        let none = OverrideArgs {
            override_json: None,
            override_file: None,
        };
        assert!(read_override(&none).expect("no override").is_absent());
    }

    #[test]
    fn named_schemas_are_selected() {
        let schemas = json!({
            "user": {"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]},
            "flag": {"type": "boolean"},
        });
        let options = GenerateOptions {
            seed: Some(1),
            ..GenerateOptions::default()
        };

        let generator = select_generator(schemas.clone(), Some("flag"), options.clone())
            .expect("flag schema exists");
        assert_eq!(generator.schema(), &json!({"type": "boolean"}));

        let err = select_generator(schemas, Some("missing"), options).expect_err("unknown name");
        assert!(matches!(err, CliError::InvalidConfig(_)));
    }
}
