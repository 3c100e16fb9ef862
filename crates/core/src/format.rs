//! Value formatting shared by the display dispatcher and both export engines.
//!
//! Every function here is pure and total over its input. A new presentation
//! rule goes here once so on-screen and exported values never disagree.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::scalar::Scalar;

/// Default vocabulary for currency detection (case-insensitive substrings)
pub const DEFAULT_EARNINGS_KEYWORDS: &[&str] = &[
    "earning", "revenue", "royalt", "income", "payout", "payment", "sales", "profit",
];

pub const DEFAULT_CURRENCY_SYMBOL: &str = "$";

/// Epoch numbers below this are seconds, at or above it milliseconds
const EPOCH_MILLIS_THRESHOLD: f64 = 1e10;

const COMPACT_STEPS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

// =============================================================================
// Numbers
// =============================================================================

/// `1234567` -> `1.2M`. Non-numeric input is returned as its display string.
pub fn format_number_compact(value: &Value) -> String {
    match value.as_f64() {
        Some(n) => compact_number(n),
        None => display_value(value),
    }
}

/// `1500` -> `$1.5K`; sign goes before the symbol.
pub fn format_currency_compact(value: &Value, symbol: &str) -> String {
    match value.as_f64() {
        Some(n) => compact_currency(n, symbol),
        None => display_value(value),
    }
}

/// Compact scaling at 1e3/1e6/1e9/1e12 with one decimal, trailing `.0` stripped.
pub fn compact_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let sign = if n < 0.0 { "-" } else { "" };
    let abs = n.abs();
    for (i, (threshold, suffix)) in COMPACT_STEPS.iter().enumerate() {
        if abs < *threshold {
            continue;
        }
        // 999_960 would read "1000K"
        if (abs / threshold * 10.0).round() >= 10_000.0 && i > 0 {
            let (larger, larger_suffix) = COMPACT_STEPS[i - 1];
            return format!("{}{}{}", sign, one_decimal(abs / larger), larger_suffix);
        }
        return format!("{}{}{}", sign, one_decimal(abs / threshold), suffix);
    }
    format!("{}{}", sign, plain_number(abs))
}

pub fn compact_currency(n: f64, symbol: &str) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    let body = compact_number(n.abs());
    if n < 0.0 {
        format!("-{}{}", symbol, body)
    } else {
        format!("{}{}", symbol, body)
    }
}

/// Integers print bare, fractions with at most two decimals.
pub fn plain_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let text = format!("{:.2}", n);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn one_decimal(n: f64) -> String {
    let text = format!("{:.1}", n);
    match text.strip_suffix(".0") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// `12.345` -> `12.3%`.
pub fn format_percentage(n: f64) -> String {
    format!("{}%", one_decimal(n))
}

/// Growth rates carry an explicit `+` when positive.
pub fn format_growth(n: f64) -> String {
    if n > 0.0 {
        format!("+{}", format_percentage(n))
    } else {
        format_percentage(n)
    }
}

/// Display string of a raw value: strings unquoted, null empty.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(plain_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

// =============================================================================
// Smart values
// =============================================================================

/// Picks currency vs compact-number presentation from the field name.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFormatter {
    currency_symbol: String,
    earnings_keywords: Vec<String>,
}

impl Default for ValueFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_SYMBOL, DEFAULT_EARNINGS_KEYWORDS.iter().copied())
    }
}

impl ValueFormatter {
    pub fn new<I, S>(currency_symbol: impl Into<String>, earnings_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            currency_symbol: currency_symbol.into(),
            earnings_keywords: earnings_keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub fn earnings_keywords(&self) -> &[String] {
        &self.earnings_keywords
    }

    pub fn is_earnings_key(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.earnings_keywords.iter().any(|word| key.contains(word.as_str()))
    }

    pub fn format_smart_value(&self, key: &str, value: &Value) -> String {
        match value.as_f64() {
            Some(n) if self.is_earnings_key(key) => compact_currency(n, &self.currency_symbol),
            Some(n) => compact_number(n),
            None => display_value(value),
        }
    }

    /// Smart formatting for decoded cells.
    pub fn format_scalar(&self, key: &str, value: &Scalar) -> String {
        match value {
            Scalar::Number(n) if self.is_earnings_key(key) => compact_currency(*n, &self.currency_symbol),
            Scalar::Number(n) => compact_number(*n),
            other => other.display(),
        }
    }

    pub fn format_currency(&self, n: f64) -> String {
        compact_currency(n, &self.currency_symbol)
    }
}

// =============================================================================
// Text
// =============================================================================

/// `monthly_listeners` -> `Monthly Listeners`. Idempotent.
pub fn snake_to_title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_word = false;
    for ch in text.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let is_word = ch.is_alphanumeric();
        if is_word && !prev_is_word {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        prev_is_word = is_word;
    }
    out
}

// =============================================================================
// Timestamps
// =============================================================================

/// Parse a timestamp, or `None` when the input is unreadable.
///
/// Accepts epoch numbers (seconds below 1e10, milliseconds above), numeric
/// strings, RFC 3339 and the common `YYYY-MM-DD[ HH:MM:SS]` forms.
pub fn try_parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => from_epoch(n.as_f64()?),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// Parse a timestamp, falling back to `now` when unreadable.
pub fn parse_timestamp_at(value: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    try_parse_timestamp(value).unwrap_or(now)
}

/// Parse a timestamp, falling back to the current time when unreadable.
pub fn parse_timestamp(value: &Value) -> DateTime<Utc> {
    parse_timestamp_at(value, Utc::now())
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    let millis = if n.abs() < EPOCH_MILLIS_THRESHOLD { n * 1000.0 } else { n };
    DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<f64>() {
        return from_epoch(n);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(naive.and_utc());
        }
    }
    for pattern in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// `2024-06-01`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// `Jun 01, 2024`
pub fn format_timestamp_long(ts: &DateTime<Utc>) -> String {
    ts.format("%b %d, %Y").to_string()
}
