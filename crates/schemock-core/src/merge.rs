use serde_json::Value;

use crate::overrides::Override;

/// Combine generated `base` data with an override.
///
/// Object and array overrides are merged deeply, the override winning at every
/// leaf; absent entries keep the base value and arrays merge by index. Any
/// other override replaces `base` entirely.
pub fn merge(base: Value, override_value: &Override) -> Value {
    match (base, override_value) {
        (base, Override::Absent) => base,
        (Value::Object(mut base), Override::Object(_)) => {
            for (key, value) in override_value.entries() {
                let current = base.remove(key).unwrap_or(Value::Null);
                base.insert(key.clone(), merge(current, value));
            }
            Value::Object(base)
        }
        (Value::Array(base), Override::Array(items)) => {
            let len = base.len().max(items.len());
            let mut base = base.into_iter();
            (0..len)
                .map(|index| {
                    let current = base.next().unwrap_or(Value::Null);
                    merge(current, override_value.item(index))
                })
                .collect()
        }
        (_, other) => other.to_value(),
    }
}
