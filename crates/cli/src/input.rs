// Input loading: files or stdin, JSON or JSONL

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde_json::Value;

use statdeck_protocol::{parse_document, parse_jsonl, Document};

use crate::CliError;

/// Read `path`, or stdin when the path is `-`.
pub fn read_source(path: &Path) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| CliError::io(format!("failed to read stdin: {}", e)))?;
        if input.trim().is_empty() {
            return Err(CliError::parse("no input received on stdin")
                .with_hint("cat turns.jsonl | sdeck render -"));
        }
        return Ok(input);
    }
    fs::read_to_string(path).map_err(|e| {
        CliError::io(format!("{}: {}", path.display(), e)).with_hint("pass '-' to read from stdin")
    })
}

/// A single JSON document, or newline-delimited turns.
pub fn parse_input(contents: &str) -> Result<Document, String> {
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Err("input is empty".to_string());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => parse_document(&value),
        Err(_) => parse_jsonl(trimmed).map(Document::Transcript),
    }
}

pub fn load_document(path: &Path) -> Result<Document, CliError> {
    let contents = read_source(path)?;
    parse_input(&contents).map_err(|e| {
        CliError::parse(e).with_hint("expected an assistant turn, a JSON array of turns or sections, or JSONL turns")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_turn_document() {
        let doc = parse_input(r#"{"answer_str": "hi", "data_type": "text"}"#).unwrap();
        assert!(matches!(doc, Document::Turn(_)));
    }

    #[test]
    fn test_jsonl_becomes_transcript() {
        let doc = parse_input("{\"answer_str\": \"a\"}\n{\"answer_str\": \"b\"}\n").unwrap();
        assert_eq!(doc.turns().len(), 2);
    }

    #[test]
    fn test_garbage_reports_line() {
        let err = parse_input("{\"answer_str\": \"a\"}\nnope\n").unwrap_err();
        assert!(err.starts_with("line 2"), "{}", err);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_input("  \n").is_err());
    }
}
