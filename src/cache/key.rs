use std::collections::BTreeMap;
use serde::Serialize;
use uuid::Uuid;
use crate::core::error::Result;

/// Deterministic cache key for `prefix` + parameter map.
///
/// Parameters are re-collected into a `BTreeMap` so key order never matters,
/// serialized to canonical JSON, and hashed into a name-based UUID. Nested
/// JSON objects are re-ordered the same way. A parameter that cannot be
/// serialized is an error rather than a shared placeholder key.
pub fn generate_key<I, K, V>(prefix: &str, params: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Serialize,
{
    let sorted = params
        .into_iter()
        .map(|(k, v)| -> Result<(String, serde_json::Value)> {
            Ok((k.as_ref().to_string(), canonical(serde_json::to_value(v)?)))
        })
        .collect::<Result<BTreeMap<String, serde_json::Value>>>()?;

    let canonical = serde_json::to_string(&sorted)?;
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_OID, canonical.as_bytes());
    Ok(format!("{}:{}", prefix, digest.simple()))
}

fn canonical(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, canonical(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonical).collect()),
        other => other,
    }
}
