//! Canonical payload shapes.
//!
//! Backends send some tags in two shapes: a legacy wrapper keyed by the tag
//! name (`{"dataframe": {...}}`) and the inner object directly. Both
//! collapse to the canonical shape here, once, before validation, so every
//! consumer only ever sees one layout.

use serde_json::{Map, Value};

use crate::tag::Tag;

/// Rewrite `value` into the canonical shape for `tag`.
pub fn normalize(tag: Tag, value: &Value) -> Value {
    let value = parse_embedded_json(tag, value);
    let value = unwrap_legacy(tag, value);

    match tag {
        Tag::Text | Tag::Error => scalar_to_text(value),
        Tag::ImageBase64 => strip_data_uri(scalar_to_text(value)),
        Tag::VideoUrl => trim_text(value),
        Tag::MultiSectionReport => wrap_array(value, "sections"),
        Tag::MultiForecastDisplay => wrap_array(value, "forecasts"),
        Tag::KeyValue => wrap_key_value(value),
        Tag::MetricGrid => wrap_data_object(value),
        Tag::PlatformData | Tag::CountryListenershipData => unwrap_data_array(value),
        Tag::Dataframe
        | Tag::Table
        | Tag::ViralityReport
        | Tag::ForecastChart
        | Tag::PlaylistRecommendationReport => value,
    }
}

/// Structured tags sometimes arrive as a JSON document inside a string.
fn parse_embedded_json(tag: Tag, value: &Value) -> Value {
    let takes_text = matches!(tag, Tag::Text | Tag::Error | Tag::ImageBase64 | Tag::VideoUrl);
    if !takes_text {
        if let Value::String(s) = value {
            let trimmed = s.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                    return parsed;
                }
            }
        }
    }
    value.clone()
}

/// Field names that mark an object as already canonical for `tag`.
fn canonical_fields(tag: Tag) -> &'static [&'static str] {
    match tag {
        Tag::Dataframe | Tag::Table => &["columns", "data"],
        Tag::KeyValue | Tag::MetricGrid => &["data"],
        Tag::ViralityReport => &["artist_name", "virality_score"],
        Tag::ForecastChart => &["historical_data", "forecast_data"],
        Tag::MultiForecastDisplay => &["forecasts"],
        Tag::PlaylistRecommendationReport => &["recommendations"],
        Tag::MultiSectionReport => &["sections"],
        Tag::Text
        | Tag::Error
        | Tag::PlatformData
        | Tag::CountryListenershipData
        | Tag::ImageBase64
        | Tag::VideoUrl => &[],
    }
}

/// `{"<tag>": inner}` becomes `inner`; a sibling `title` is carried over.
fn unwrap_legacy(tag: Tag, value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if canonical_fields(tag).iter().any(|field| map.contains_key(*field)) {
        return Value::Object(map);
    }

    let wrapper_keys: &[&str] = match tag {
        Tag::Dataframe | Tag::Table => &["dataframe", "table"],
        _ => &[tag.as_str()],
    };
    let Some(key) = wrapper_keys.iter().find(|key| map.contains_key(**key)) else {
        return Value::Object(map);
    };

    let title = map.get("title").cloned();
    match map.remove(*key) {
        Some(Value::Object(mut inner)) => {
            if let Some(title) = title {
                inner.entry("title").or_insert(title);
            }
            Value::Object(inner)
        }
        Some(other) if !other.is_null() => other,
        Some(_) | None => Value::Object(map),
    }
}

fn scalar_to_text(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other,
    }
}

fn trim_text(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

/// `data:image/png;base64,AAAA` keeps only the payload.
fn strip_data_uri(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            let payload = match (trimmed.starts_with("data:"), trimmed.find(',')) {
                (true, Some(comma)) => &trimmed[comma + 1..],
                _ => trimmed,
            };
            Value::String(payload.to_string())
        }
        other => other,
    }
}

fn wrap_array(value: Value, field: &str) -> Value {
    match value {
        Value::Array(items) => {
            let mut map = Map::new();
            map.insert(field.to_string(), Value::Array(items));
            Value::Object(map)
        }
        other => other,
    }
}

/// Flat `{metric: value}` objects become `{data: {...}, title?}`.
fn wrap_key_value(value: Value) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    if map.get("data").map(Value::is_object).unwrap_or(false) {
        return Value::Object(map);
    }

    let title = match map.get("title") {
        Some(Value::String(_)) => map.remove("title"),
        _ => None,
    };
    let mut wrapped = Map::new();
    wrapped.insert("data".to_string(), Value::Object(map));
    if let Some(title) = title {
        wrapped.insert("title".to_string(), title);
    }
    Value::Object(wrapped)
}

fn wrap_data_object(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    if map.get("data").map(Value::is_object).unwrap_or(false) {
        return Value::Object(map);
    }
    let mut wrapped = Map::new();
    wrapped.insert("data".to_string(), Value::Object(map));
    Value::Object(wrapped)
}

fn unwrap_data_array(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Value::Array(items),
            Some(other) => {
                map.insert("data".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}
