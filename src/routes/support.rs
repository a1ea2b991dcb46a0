use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

/// PATCH bodies need to distinguish "field absent" from "field set to null"
/// from "field set to a value"; plain `Option` collapses the first two.
pub(crate) enum NullableValue {
    Omitted,
    Null,
    String(String),
}

pub(crate) fn classify_nullable(optional_value: Option<&Value>) -> Result<NullableValue, String> {
    match optional_value {
        None => Ok(NullableValue::Omitted),
        Some(Value::Null) => Ok(NullableValue::Null),
        Some(Value::String(s)) => Ok(NullableValue::String(s.to_owned())),
        Some(other) => Err(format!("expected string or null, got {other}")),
    }
}
