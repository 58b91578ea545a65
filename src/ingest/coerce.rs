// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-collection type coercion for loaded rows.
//!
//! CSV cells arrive as strings; these rules turn them into the stored types.
//! Values that do not parse are left unchanged.

use super::Collection;
use crate::db::Fields;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde_json::{Number, Value};

/// Coerce one row for `collection`, defaulting its timestamp to `now`.
///
/// A present RFC3339 timestamp is rewritten in the stored UTC form so ingested
/// rows sort alongside ones created through the API.
pub fn coerce_row(collection: Collection, mut row: Fields, now: DateTime<Utc>) -> Fields {
    let timestamp_field = match collection {
        Collection::Users => "createdAt",
        Collection::History => "ts",
        Collection::Objects => {
            coerce_object(&mut row);
            "ts"
        }
        Collection::Flags => {
            coerce_flag(&mut row);
            "updatedAt"
        }
    };

    let stamp = match row.get(timestamp_field) {
        None => format_utc_rfc3339(now),
        Some(value) if is_blank(value) => format_utc_rfc3339(now),
        Some(Value::String(raw)) => match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(parsed) => format_utc_rfc3339(parsed.with_timezone(&Utc)),
            Err(_) => return row,
        },
        Some(_) => return row,
    };
    row.insert(timestamp_field.to_string(), Value::String(stamp));
    row
}

fn coerce_object(row: &mut Fields) {
    if let Some(confidence) = row.get_mut("confidence") {
        if let Some(n) = to_float(confidence) {
            *confidence = n;
        }
    }

    if let Some(Value::String(raw)) = row.get("langs") {
        let langs = parse_langs(raw);
        row.insert("langs".to_string(), langs);
    }
}

fn coerce_flag(row: &mut Fields) {
    let Some(flag_type) = row.get("type").map(|t| match t {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }) else {
        return;
    };

    let value = row.get("value").cloned().unwrap_or(Value::Null);
    let coerced = match flag_type.as_str() {
        "bool" => normalize_bool(value),
        "num" => to_float(&value).unwrap_or(value),
        "json" => match value {
            Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
            other => other,
        },
        _ => return,
    };
    row.insert("value".to_string(), coerced);
}

/// Interpret common spellings of yes/no, including Spanish `si`/`sí`.
pub fn normalize_bool(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" | "si" | "sí" => Value::Bool(true),
            "false" | "0" | "no" | "n" => Value::Bool(false),
            _ => Value::String(s),
        },
        other => other,
    }
}

/// Parse `"es,en"` or `'["es","en"]'` into a list of language codes.
pub fn parse_langs(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(list @ Value::Array(_)) = serde_json::from_str::<Value>(raw) {
            return list;
        }
    }

    let inner = raw.trim_start_matches('[').trim_end_matches(']');
    Value::Array(
        inner
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
    )
}

fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

/// Missing-equivalent values: null, empty strings and `false`/zero.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
