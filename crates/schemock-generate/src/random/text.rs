use chrono::{DateTime, SecondsFormat};
use fake::Fake;
use fake::faker::internet::en::{DomainSuffix, IPv4, IPv6, SafeEmail};
use fake::faker::lorem::en::{Word, Words};
use rand::Rng;
use rand_regex::Regex as RandRegex;
use serde_json::{Map, Value};

use schemock_core::GenerationError;

use crate::model::GeneratorSettings;

const PATTERN_ATTEMPTS: usize = 16;
// 2000-01-01T00:00:00Z .. 2030-01-01T00:00:00Z
const TIMESTAMP_MIN: i64 = 946_684_800;
const TIMESTAMP_MAX: i64 = 1_893_456_000;

pub(crate) fn generate_string<R: Rng>(
    schema: &Map<String, Value>,
    settings: &GeneratorSettings,
    rng: &mut R,
) -> Result<String, GenerationError> {
    let min_len = bound(schema, "minLength").unwrap_or(0);
    let max_len = bound(schema, "maxLength");
    if let Some(max_len) = max_len
        && max_len < min_len
    {
        return Err(GenerationError::Unsatisfiable(format!(
            "maxLength {max_len} is below minLength {min_len}"
        )));
    }

    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        return from_pattern(pattern, min_len, max_len, settings.max_repeat, rng);
    }

    if let Some(format) = schema.get("format").and_then(Value::as_str)
        && let Some(value) = from_format(format, rng)
    {
        let len = value.chars().count();
        if len >= min_len && max_len.is_none_or(|max_len| len <= max_len) {
            return Ok(value);
        }
    }

    let max_len = max_len.unwrap_or_else(|| min_len.max(settings.max_string_len));
    Ok(lorem(min_len, max_len, rng))
}

/// A string matching `pattern`, sampled with `rand_regex`.
pub(crate) fn from_pattern<R: Rng>(
    pattern: &str,
    min_len: usize,
    max_len: Option<usize>,
    max_repeat: u32,
    rng: &mut R,
) -> Result<String, GenerationError> {
    let regex = RandRegex::compile(pattern, max_repeat).map_err(|err| {
        GenerationError::InvalidSchema(format!("invalid regex pattern '{pattern}': {err}"))
    })?;

    for _ in 0..PATTERN_ATTEMPTS {
        let value: String = rng.sample(&regex);
        let len = value.chars().count();
        if len >= min_len && max_len.is_none_or(|max_len| len <= max_len) {
            return Ok(value);
        }
    }

    Err(GenerationError::Unsatisfiable(format!(
        "pattern '{pattern}' produced no string within the length bounds"
    )))
}

fn from_format<R: Rng>(format: &str, rng: &mut R) -> Option<String> {
    let value = match format {
        "email" => SafeEmail().fake_with_rng(rng),
        "uuid" => random_uuid(rng),
        "date-time" => timestamp(rng).to_rfc3339_opts(SecondsFormat::Secs, true),
        "date" => timestamp(rng).format("%Y-%m-%d").to_string(),
        "time" => timestamp(rng).format("%H:%M:%SZ").to_string(),
        "hostname" => hostname(rng),
        "uri" => {
            let path: String = Word().fake_with_rng(rng);
            format!("https://{}/{}", hostname(rng), path.to_lowercase())
        }
        "ipv4" => IPv4().fake_with_rng(rng),
        "ipv6" => IPv6().fake_with_rng(rng),
        _ => return None,
    };
    Some(value)
}

fn random_uuid<R: Rng>(rng: &mut R) -> String {
    let mut bytes = [0_u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
}

fn timestamp<R: Rng>(rng: &mut R) -> DateTime<chrono::Utc> {
    let seconds = rng.random_range(TIMESTAMP_MIN..TIMESTAMP_MAX);
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

fn hostname<R: Rng>(rng: &mut R) -> String {
    let name: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    format!("{}.{}", name.to_lowercase(), suffix)
}

/// Lorem words cut to a random length within `min_len..=max_len`.
fn lorem<R: Rng>(min_len: usize, max_len: usize, rng: &mut R) -> String {
    if max_len == 0 {
        return String::new();
    }
    let target = rng.random_range(min_len.max(1)..=max_len);

    let mut text = String::new();
    while text.chars().count() < target {
        let words: Vec<String> = Words(1..4).fake_with_rng(rng);
        for word in words {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&word);
        }
    }

    let mut text: String = text.chars().take(target).collect();
    if text.ends_with(' ') {
        text.pop();
        text.push('a');
    }
    text
}

fn bound(schema: &Map<String, Value>, keyword: &str) -> Option<usize> {
    schema
        .get(keyword)
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn schema(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object schema"),
        }
    }

    #[test]
    fn lorem_respects_length_bounds() {
        let settings = GeneratorSettings::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let schema = schema(json!({"type": "string", "minLength": 5, "maxLength": 9}));

        for _ in 0..50 {
            let value = generate_string(&schema, &settings, &mut rng).expect("string");
            let len = value.chars().count();
            assert!((5..=9).contains(&len), "{value:?}");
            assert!(!value.ends_with(' '), "{value:?}");
        }
    }

    #[test]
    fn patterns_are_sampled() {
        let settings = GeneratorSettings::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let schema = schema(json!({"type": "string", "pattern": "^[A-Z]{3}-[0-9]{2}$"}));
        let matcher = regex::Regex::new("^[A-Z]{3}-[0-9]{2}$").expect("regex");

        for _ in 0..20 {
            let value = generate_string(&schema, &settings, &mut rng).expect("pattern string");
            assert!(matcher.is_match(&value), "{value}");
        }
    }

    #[test]
    fn invalid_patterns_are_schema_errors() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let err = from_pattern("([a-z", 0, None, 8, &mut rng).expect_err("unbalanced group");
        assert!(matches!(err, GenerationError::InvalidSchema(_)));
    }

    #[test]
    fn formats_have_the_expected_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let email = from_format("email", &mut rng).expect("email");
        assert!(email.contains('@'), "{email}");

        let id = from_format("uuid", &mut rng).expect("uuid");
        assert!(uuid::Uuid::parse_str(&id).is_ok(), "{id}");

        let stamp = from_format("date-time", &mut rng).expect("date-time");
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok(), "{stamp}");

        let date = from_format("date", &mut rng).expect("date");
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok(), "{date}");

        let ip: std::net::Ipv4Addr = from_format("ipv4", &mut rng)
            .expect("ipv4")
            .parse()
            .expect("valid ipv4");
        assert!(!ip.to_string().is_empty());

        assert!(from_format("x-unknown", &mut rng).is_none());
    }
}
