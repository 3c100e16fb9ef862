//! Golden vector compatibility test for assistant turns.
//!
//! Every line of `golden/turns_v1.jsonl` is a real-shaped turn the chat layer
//! has sent. If this test fails, fix the types, not the vectors.

use std::fs;
use std::path::PathBuf;

use statdeck_core::{SectionBody, Tag};
use statdeck_protocol::{parse_jsonl, AssistantTurn};

fn golden_turns() -> Vec<AssistantTurn> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("golden/turns_v1.jsonl");
    let contents = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    parse_jsonl(&contents).unwrap_or_else(|e| panic!("golden vectors must parse: {}", e))
}

#[test]
fn test_every_golden_turn_parses() {
    assert_eq!(golden_turns().len(), 14);
}

#[test]
fn test_every_golden_payload_validates() {
    for turn in golden_turns() {
        for section in turn.to_sections() {
            assert!(
                section.is_valid(),
                "{} payload should validate: {:?}",
                turn.data_type,
                section.body()
            );
        }
    }
}

#[test]
fn test_golden_tags_cover_the_closed_set() {
    let mut seen: Vec<Tag> = golden_turns()
        .iter()
        .filter_map(|turn| Tag::parse(&turn.data_type))
        .collect();
    seen.sort_by_key(|tag| tag.as_str());
    seen.dedup();
    // text is only ever produced from answer_str
    assert_eq!(seen.len(), Tag::ALL.len() - 1);
}

#[test]
fn test_golden_serialization_is_stable() {
    for turn in golden_turns() {
        let json = serde_json::to_string(&turn).unwrap();
        let back: AssistantTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }
}

#[test]
fn test_golden_error_turn_is_error_sections() {
    let turns = golden_turns();
    let error_turn = turns.last().unwrap();
    let sections = error_turn.to_sections();
    assert!(sections.iter().all(|s| s.tag() == Some(Tag::Error)));
    assert!(matches!(sections[1].body(), SectionBody::Ready(_)));
}
