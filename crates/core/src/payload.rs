//! Turn payload classification.
//!
//! One payload can satisfy more than one heuristic, so shapes are tried
//! most-specific first:
//!
//! 1. multi-section containers (`{sections: [...]}` or a bare array of
//!    `{section_type, content}` objects)
//! 2. platform-list and country-list arrays
//! 3. any other non-empty array, sniffed per element and titled `Result N`
//! 4. the tag named by `data_type`
//!
//! Display and export both go through [`classify_payload`] so a payload
//! renders and exports as the same sections.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::section::Section;
use crate::tag::Tag;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PayloadShape<'a> {
    /// `{sections: [...]}` object; the items are its wire sections
    Container(&'a [Value]),
    /// Bare array of wire sections
    SectionList(&'a [Value]),
    /// Array of platform or country records
    Records(Tag),
    /// Untyped array, one sniffed section per element
    Results(&'a [Value]),
    /// Payload of the tag named by `data_type`
    Tagged,
}

pub fn classify_payload<'a>(data_type: &str, value: &'a Value) -> PayloadShape<'a> {
    match value {
        Value::Object(map) => match map.get("sections").and_then(Value::as_array) {
            Some(items) => PayloadShape::Container(items),
            None => PayloadShape::Tagged,
        },
        Value::Array(items) if items.is_empty() => PayloadShape::Tagged,
        Value::Array(items) if items.iter().all(Section::is_wire_section) => PayloadShape::SectionList(items),
        Value::Array(items) => {
            if let Some(tag) = detect_record_list(items) {
                return PayloadShape::Records(tag);
            }
            let array_tag = matches!(
                Tag::parse(data_type),
                Some(Tag::PlatformData | Tag::CountryListenershipData | Tag::MultiForecastDisplay)
            );
            if array_tag {
                PayloadShape::Tagged
            } else {
                PayloadShape::Results(items)
            }
        }
        _ => PayloadShape::Tagged,
    }
}

/// Title given to the `index`th element of an untyped array.
pub fn result_title(index: usize) -> String {
    format!("Result {}", index + 1)
}

/// Sections of a turn payload, split the way the display splits it.
///
/// A `{sections}` container stays one multi-section report; a bare list of
/// wire sections expands into its elements.
pub fn payload_sections(data_type: &str, value: &Value, now: DateTime<Utc>) -> Vec<Section> {
    match classify_payload(data_type, value) {
        PayloadShape::Container(_) => {
            vec![Section::from_value_at(Tag::MultiSectionReport.as_str(), value, None, now)]
        }
        PayloadShape::SectionList(items) => items.iter().map(|item| Section::from_wire_at(item, now)).collect(),
        PayloadShape::Records(tag) => vec![Section::from_value_at(tag.as_str(), value, None, now)],
        PayloadShape::Results(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Section::from_value_at(sniff_tag(item).as_str(), item, Some(result_title(i)), now))
            .collect(),
        PayloadShape::Tagged => vec![Section::from_value_at(data_type, value, None, now)],
    }
}

fn is_platform_record(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    map.get("name").map(Value::is_string).unwrap_or(false)
        && map.keys().all(|k| k == "name" || k == "icon_url")
}

fn is_country_record(value: &Value) -> bool {
    let code = value.get("countryCode").or_else(|| value.get("country_code"));
    code.map(Value::is_string).unwrap_or(false) && value.get("percentage").is_some()
}

fn detect_record_list(items: &[Value]) -> Option<Tag> {
    if items.is_empty() {
        None
    } else if items.iter().all(is_platform_record) {
        Some(Tag::PlatformData)
    } else if items.iter().all(is_country_record) {
        Some(Tag::CountryListenershipData)
    } else {
        None
    }
}

/// Best-guess tag for one element of an untyped array.
pub fn sniff_tag(item: &Value) -> Tag {
    let has = |key: &str| item.get(key).is_some();
    if has("columns") && has("data") {
        Tag::Dataframe
    } else if has("artist_name") && has("virality_score") {
        Tag::ViralityReport
    } else if has("historical_data") && has("forecast_data") {
        Tag::ForecastChart
    } else if has("recommendations") {
        Tag::PlaylistRecommendationReport
    } else if item.is_object() {
        Tag::KeyValue
    } else {
        Tag::Text
    }
}
