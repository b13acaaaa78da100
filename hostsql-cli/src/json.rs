//! JSON command-line values to [`Variant`].

use hostsql::Variant;
use serde_json::Value;

/// Parses `raw` as JSON; anything that is not valid JSON is taken as text.
pub fn parse_value(raw: &str) -> Variant {
    serde_json::from_str(raw).map_or_else(|_| Variant::from(raw), to_variant)
}

pub fn to_variant(value: Value) -> Variant {
    match value {
        Value::Null => Variant::Nil,
        Value::Bool(b) => Variant::Bool(b),
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| Variant::Float(n.as_f64().unwrap_or(f64::NAN)), Variant::Int),
        Value::String(s) => Variant::String(s),
        Value::Array(items) => Variant::Array(items.into_iter().map(to_variant).collect()),
        Value::Object(map) => {
            Variant::Dictionary(map.into_iter().map(|(k, v)| (k, to_variant(v))).collect())
        }
    }
}
