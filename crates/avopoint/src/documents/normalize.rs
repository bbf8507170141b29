use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Marker the extraction prompts ask the model to emit for missing fields.
const SENTINEL: &str = "NONE";

/// Replaces every `"NONE"` string leaf with JSON null, at any depth.
///
/// Runs once, at the boundary where an extraction payload enters the
/// pipeline; downstream code never sees the sentinel.
pub fn scrub_sentinels(value: &mut Value) {
    match value {
        Value::String(text) if text.as_str() == SENTINEL => *value = Value::Null,
        Value::Array(items) => items.iter_mut().for_each(scrub_sentinels),
        Value::Object(map) => map.values_mut().for_each(scrub_sentinels),
        _ => {}
    }
}

/// Accepts a JSON number or a numeric string; anything else reads as `None`.
/// The vision model is inconsistent about quoting speeds.
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|wide| u32::try_from(wide).ok())
            .or_else(|| number.as_f64().map(|float| float.round() as u32)),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}
