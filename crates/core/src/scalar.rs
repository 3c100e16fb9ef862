use serde::Serialize;
use serde_json::Value;

use crate::format::plain_number;

/// A single cell or metric value after decoding.
///
/// Nested JSON (objects/arrays inside a cell) is kept as its compact JSON
/// text so every cell has a printable form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Null
    }
}

impl Scalar {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Null,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view of the value. Text is parsed when it is a plain number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Unformatted display string. Null prints as empty.
    pub fn display(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => plain_number(*n),
            Scalar::Text(s) => s.clone(),
        }
    }
}

/// Lenient numeric read of a raw JSON value (numbers and numeric strings).
pub fn json_f64(value: &Value) -> Option<f64> {
    Scalar::from_json(value).as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_variants() {
        assert_eq!(Scalar::from_json(&json!(null)), Scalar::Null);
        assert_eq!(Scalar::from_json(&json!(true)), Scalar::Bool(true));
        assert_eq!(Scalar::from_json(&json!(2.5)), Scalar::Number(2.5));
        assert_eq!(Scalar::from_json(&json!("x")), Scalar::Text("x".into()));
        assert_eq!(Scalar::from_json(&json!({"a": 1})), Scalar::Text("{\"a\":1}".into()));
    }

    #[test]
    fn test_as_f64_parses_numeric_text() {
        assert_eq!(Scalar::Text(" 42.5 ".into()).as_f64(), Some(42.5));
        assert_eq!(Scalar::Text("n/a".into()).as_f64(), None);
        assert_eq!(Scalar::Bool(true).as_f64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Scalar::Null.display(), "");
        assert_eq!(Scalar::Number(1200.0).display(), "1200");
        assert_eq!(Scalar::Number(0.126).display(), "0.13");
    }
}
