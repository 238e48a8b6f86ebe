use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub fn field<'a>(fields: &'a Value, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| v.get("nullValue").is_none())
}

pub fn string_field<'a>(fields: &'a Value, name: &str) -> Option<&'a str> {
    field(fields, name)
        .and_then(|v| v.get("stringValue"))
        .and_then(|v| v.as_str())
}

pub fn bool_field(fields: &Value, name: &str) -> Option<bool> {
    field(fields, name)
        .and_then(|v| v.get("booleanValue"))
        .and_then(|v| v.as_bool())
}

pub fn timestamp_field(fields: &Value, name: &str) -> Option<DateTime<Utc>> {
    field(fields, name)
        .and_then(|v| v.get("timestampValue"))
        .and_then(|v| v.as_str())
        .and_then(parse_timestamp)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

pub fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

pub fn bool_value(value: bool) -> Value {
    json!({ "booleanValue": value })
}
