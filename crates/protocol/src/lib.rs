//! Assistant turn wire format.
//!
//! Each assistant turn delivered by the chat layer carries the answer text
//! and an optional structured payload:
//!
//! ```json
//! {"answer_str": "...", "display_data": {...}, "data_type": "dataframe",
//!  "query_str": "...", "status_bool": true}
//! ```
//!
//! This crate owns the serde types for that contract and the conversion of
//! a turn (or a saved transcript) into core `Section`s. Golden vectors in
//! `golden/*.jsonl` are the compatibility source of truth.
//!
//! # Usage
//!
//! ```ignore
//! use statdeck_protocol::{parse_document, Document};
//!
//! let value: serde_json::Value = serde_json::from_str(&line)?;
//! let sections = parse_document(&value)?.sections();
//! ```

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use serde_json::Value;

use statdeck_core::{payload_sections, Section, Tag};

/// One assistant response as received from the chat layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantTurn {
    #[serde(default)]
    pub answer_str: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_data: Option<Value>,
    #[serde(default)]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_bool: Option<bool>,
}

impl AssistantTurn {
    /// Structured payload, treating JSON `null` as absent.
    pub fn payload(&self) -> Option<&Value> {
        self.display_data.as_ref().filter(|v| !v.is_null())
    }

    /// True when the backend reported a failed request.
    pub fn failed(&self) -> bool {
        self.status_bool == Some(false)
    }

    /// Sections for export: the answer as text, then the payload.
    ///
    /// The payload is split exactly as the display splits it; see
    /// `statdeck_core::payload`.
    pub fn to_sections(&self) -> Vec<Section> {
        self.to_sections_at(Utc::now())
    }

    /// Like [`AssistantTurn::to_sections`] with an explicit clock.
    pub fn to_sections_at(&self, now: DateTime<Utc>) -> Vec<Section> {
        let mut sections = Vec::new();
        if !self.answer_str.trim().is_empty() {
            let tag = if self.failed() { Tag::Error } else { Tag::Text };
            sections.push(Section::from_value_at(
                tag.as_str(),
                &Value::String(self.answer_str.clone()),
                None,
                now,
            ));
        }

        if let Some(payload) = self.payload() {
            sections.extend(payload_sections(&self.data_type, payload, now));
        }
        sections
    }
}

/// Input documents accepted by renderers and exporters.
#[derive(Debug, Clone)]
pub enum Document {
    Turn(AssistantTurn),
    Transcript(Vec<AssistantTurn>),
    /// Array of `{section_type, content, title?}` objects
    Sections(Vec<Value>),
}

impl Document {
    pub fn sections(&self) -> Vec<Section> {
        match self {
            Document::Turn(turn) => turn.to_sections(),
            Document::Transcript(turns) => turns.iter().flat_map(AssistantTurn::to_sections).collect(),
            Document::Sections(items) => items.iter().map(Section::from_wire).collect(),
        }
    }

    /// Turns in the document; wire-section documents have none.
    pub fn turns(&self) -> Vec<&AssistantTurn> {
        match self {
            Document::Turn(turn) => vec![turn],
            Document::Transcript(turns) => turns.iter().collect(),
            Document::Sections(_) => Vec::new(),
        }
    }
}

fn looks_like_turn(value: &Value) -> bool {
    value.is_object()
        && ["answer_str", "display_data", "data_type"]
            .iter()
            .any(|key| value.get(key).is_some())
}

/// Classify a parsed JSON document.
pub fn parse_document(value: &Value) -> Result<Document, String> {
    match value {
        Value::Array(items) if items.iter().all(Section::is_wire_section) => Ok(Document::Sections(items.clone())),
        Value::Array(items) if items.iter().all(looks_like_turn) => {
            let turns = items
                .iter()
                .map(|item| serde_json::from_value(item.clone()))
                .collect::<Result<Vec<AssistantTurn>, _>>()
                .map_err(|e| format!("invalid assistant turn: {}", e))?;
            Ok(Document::Transcript(turns))
        }
        Value::Array(_) => Err("array elements must all be sections or all be assistant turns".to_string()),
        Value::Object(_) if Section::is_wire_section(value) => Ok(Document::Sections(vec![value.clone()])),
        Value::Object(_) if looks_like_turn(value) => serde_json::from_value(value.clone())
            .map(Document::Turn)
            .map_err(|e| format!("invalid assistant turn: {}", e)),
        _ => Err("expected an assistant turn, a transcript, or a list of sections".to_string()),
    }
}

/// Sections of any accepted document shape.
pub fn sections_from_document(value: &Value) -> Result<Vec<Section>, String> {
    parse_document(value).map(|doc| doc.sections())
}

/// Parse newline-delimited turns (blank lines skipped).
pub fn parse_jsonl(contents: &str) -> Result<Vec<AssistantTurn>, String> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| serde_json::from_str(line).map_err(|e| format!("line {}: {}", n + 1, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use statdeck_core::SectionBody;

    #[test]
    fn test_turn_defaults() {
        let turn: AssistantTurn = serde_json::from_value(json!({"answer_str": "hi"})).unwrap();
        assert_eq!(turn.data_type, "");
        assert!(turn.payload().is_none());
        assert_eq!(turn.to_sections().len(), 1);
    }

    #[test]
    fn test_null_display_data_is_absent() {
        let turn: AssistantTurn =
            serde_json::from_value(json!({"answer_str": "", "display_data": null, "data_type": "dataframe"})).unwrap();
        assert!(turn.to_sections().is_empty());
    }

    #[test]
    fn test_failed_turn_answer_becomes_error_section() {
        let turn: AssistantTurn =
            serde_json::from_value(json!({"answer_str": "Backend timeout", "status_bool": false})).unwrap();
        assert_eq!(turn.to_sections()[0].tag(), Some(Tag::Error));
    }

    #[test]
    fn test_array_of_wire_sections_expands() {
        let turn: AssistantTurn = serde_json::from_value(json!({
            "answer_str": "Here you go",
            "data_type": "multi_section_report",
            "display_data": [
                {"section_type": "text", "content": "a"},
                {"section_type": "key_value", "content": {"data": {"x": 1}}}
            ]
        }))
        .unwrap();
        let sections = turn.to_sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[2].tag(), Some(Tag::KeyValue));
    }

    #[test]
    fn test_unknown_data_type_is_unsupported_section() {
        let turn: AssistantTurn =
            serde_json::from_value(json!({"answer_str": "", "display_data": {"foo": 1}, "data_type": "nonexistent_tag"}))
                .unwrap();
        let sections = turn.to_sections();
        assert!(matches!(sections[0].body(), SectionBody::Unsupported { .. }));
    }

    #[test]
    fn test_bare_country_array_exports_as_country_table() {
        let turn: AssistantTurn = serde_json::from_value(json!({
            "answer_str": "Top markets",
            "data_type": "dataframe",
            "display_data": [{"countryCode": "US", "percentage": 60}, {"countryCode": "DE", "percentage": 40}]
        }))
        .unwrap();
        let sections = turn.to_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].tag(), Some(Tag::CountryListenershipData));
        assert!(sections[1].is_valid());
    }

    #[test]
    fn test_untyped_array_exports_one_section_per_result() {
        let turn: AssistantTurn = serde_json::from_value(json!({
            "answer_str": "",
            "data_type": "analysis",
            "display_data": [{"columns": ["x"], "data": [[1]]}, {"total": 5}]
        }))
        .unwrap();
        let sections = turn.to_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].tag(), Some(Tag::Dataframe));
        assert_eq!(sections[1].title(), Some("Result 2"));
    }

    #[test]
    fn test_parse_document_shapes() {
        assert!(matches!(parse_document(&json!({"answer_str": "x"})), Ok(Document::Turn(_))));
        assert!(matches!(
            parse_document(&json!([{"answer_str": "x"}, {"answer_str": "y"}])),
            Ok(Document::Transcript(t)) if t.len() == 2
        ));
        assert!(matches!(
            parse_document(&json!([{"section_type": "text", "content": "x"}])),
            Ok(Document::Sections(_))
        ));
        assert!(parse_document(&json!(42)).is_err());
        assert!(parse_document(&json!([{"answer_str": "x"}, 3])).is_err());
    }

    #[test]
    fn test_parse_jsonl_reports_line_numbers() {
        let err = parse_jsonl("{\"answer_str\": \"a\"}\n\nnot json\n").unwrap_err();
        assert!(err.starts_with("line 3"), "{}", err);
    }
}
