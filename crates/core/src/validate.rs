//! Structure validation.
//!
//! Payloads are checked against a list of required field paths before any
//! consumer touches them. Validation is total: any JSON value yields a
//! pass/fail answer, never a panic.

use serde_json::Value;

use crate::normalize::normalize;
use crate::tag::Tag;

/// Maximum characters of the offending value kept in a malformed-data log record
const MAX_LOGGED_VALUE_CHARS: usize = 2_000;

/// Walk a dot-separated path (`"historical_data.data"`).
///
/// Returns `None` as soon as a segment is missing, `null`, or the walk
/// has to descend into a scalar. Numeric segments index into arrays. The
/// empty path addresses the root itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if value.is_null() {
        return None;
    }
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// True when every required path resolves to a non-null value.
pub fn validate(value: &Value, required_paths: &[&str]) -> bool {
    required_paths.iter().all(|path| lookup(value, path).is_some())
}

/// Expected JSON shape at a schema path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Any non-null value
    Present,
    Array,
    /// An array whose elements are all arrays (table rows)
    ArrayOfArrays,
    Object,
    Text,
    Number,
}

impl Shape {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Present => !value.is_null(),
            Shape::Array => value.is_array(),
            Shape::ArrayOfArrays => value
                .as_array()
                .map(|rows| rows.iter().all(Value::is_array))
                .unwrap_or(false),
            Shape::Object => value.is_object(),
            Shape::Text => value.is_string(),
            Shape::Number => value.is_number(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Shape::Present => "a value",
            Shape::Array => "an array",
            Shape::ArrayOfArrays => "an array of arrays",
            Shape::Object => "an object",
            Shape::Text => "a string",
            Shape::Number => "a number",
        }
    }
}

/// Required-field schema for one tag.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub checks: &'static [(&'static str, Shape)],
}

impl Schema {
    pub fn required_paths(&self) -> Vec<&'static str> {
        self.checks.iter().map(|(path, _)| *path).collect()
    }

    /// Explain the first failed check, if any.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        for (path, shape) in self.checks {
            let shown = if path.is_empty() { "<root>" } else { path };
            match lookup(value, path) {
                None => return Err(format!("missing required field '{}'", shown)),
                Some(found) if !shape.matches(found) => {
                    return Err(format!("field '{}' should be {}", shown, shape.describe()));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }
}

impl Tag {
    /// Schema for the canonical (normalized) payload of this tag.
    pub fn schema(self) -> Schema {
        let checks: &'static [(&'static str, Shape)] = match self {
            Tag::Text | Tag::Error | Tag::ImageBase64 | Tag::VideoUrl => &[("", Shape::Text)],
            Tag::Dataframe | Tag::Table => &[("columns", Shape::Array), ("data", Shape::ArrayOfArrays)],
            Tag::KeyValue | Tag::MetricGrid => &[("data", Shape::Object)],
            Tag::ViralityReport => &[("artist_name", Shape::Text), ("virality_score", Shape::Present)],
            Tag::ForecastChart => &[
                ("historical_data.data", Shape::ArrayOfArrays),
                ("forecast_data.data", Shape::ArrayOfArrays),
            ],
            Tag::MultiForecastDisplay => &[("forecasts", Shape::Array)],
            Tag::PlaylistRecommendationReport => &[("recommendations", Shape::Array)],
            Tag::MultiSectionReport => &[("sections", Shape::Array)],
            Tag::PlatformData | Tag::CountryListenershipData => &[("", Shape::Array)],
        };
        Schema { checks }
    }
}

/// Normalize then check a payload against its tag's schema.
pub fn validate_tag(tag: Tag, value: &Value) -> bool {
    tag.schema().is_valid(&normalize(tag, value))
}

/// Structured diagnostic for the malformed-data fallback.
pub fn log_malformed(context: &str, value: &Value) {
    let mut shown = value.to_string();
    if shown.chars().count() > MAX_LOGGED_VALUE_CHARS {
        shown = shown.chars().take(MAX_LOGGED_VALUE_CHARS).collect::<String>() + "…";
    }
    log::warn!(target: "statdeck::malformed", "context={} value={}", context, shown);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_walks_nested_paths() {
        let value = json!({"dataframe": {"columns": ["a"], "data": []}});
        assert!(validate(&value, &["dataframe.columns", "dataframe.data"]));
        assert!(!validate(&value, &["dataframe.index"]));
    }

    #[test]
    fn test_validate_fails_closed_on_null_and_scalars() {
        assert!(!validate(&json!({"a": null}), &["a"]));
        assert!(!validate(&json!({"a": 5}), &["a.b"]));
        assert!(!validate(&json!(null), &[""]));
        assert!(!validate(&json!("text"), &["columns"]));
        assert!(validate(&json!({"a": {"b": 0}}), &["a.b"]));
    }

    #[test]
    fn test_validate_indexes_arrays() {
        let value = json!({"rows": [[1, 2], [3]]});
        assert!(validate(&value, &["rows.1.0"]));
        assert!(!validate(&value, &["rows.1.1"]));
        assert!(!validate(&value, &["rows.x"]));
    }

    #[test]
    fn test_empty_path_list_always_passes() {
        assert!(validate(&json!(42), &[]));
    }

    #[test]
    fn test_dataframe_schema_requires_array_of_arrays() {
        assert!(validate_tag(Tag::Dataframe, &json!({"columns": ["a"], "data": [[1]]})));
        assert!(validate_tag(Tag::Dataframe, &json!({"columns": [], "data": []})));
        assert!(!validate_tag(Tag::Dataframe, &json!({"columns": "a", "data": [[1]]})));
        assert!(!validate_tag(Tag::Dataframe, &json!({"columns": ["a"], "data": [1, 2]})));
        assert!(!validate_tag(Tag::Dataframe, &json!({"columns": ["a"]})));
    }

    #[test]
    fn test_legacy_dataframe_wrapper_validates() {
        let legacy = json!({"dataframe": {"columns": ["a"], "data": [["x"]]}});
        assert!(validate_tag(Tag::Dataframe, &legacy));
    }

    #[test]
    fn test_check_reports_first_failure() {
        let err = Tag::ForecastChart
            .schema()
            .check(&json!({"historical_data": {"data": []}}))
            .unwrap_err();
        assert!(err.contains("forecast_data.data"), "{}", err);

        let err = Tag::PlatformData.schema().check(&json!({"x": 1})).unwrap_err();
        assert!(err.contains("<root>"), "{}", err);
    }
}
