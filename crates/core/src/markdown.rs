//! The small markdown subset assistant answers use: `**bold**` spans and
//! pipe tables. Everything else passes through as plain text.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "block", rename_all = "snake_case")]
pub enum Block {
    Paragraph { spans: Vec<Span> },
    Table { header: Vec<String>, rows: Vec<Vec<String>> },
}

/// Split `**bold**` markers into spans. An unmatched marker stays literal.
pub fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if start > 0 {
            spans.push(Span { text: rest[..start].to_string(), bold: false });
        }
        if end > 0 {
            spans.push(Span { text: after[..end].to_string(), bold: true });
        }
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        spans.push(Span { text: rest.to_string(), bold: false });
    }
    spans
}

/// Text with bold markers removed (PDF and spreadsheet cells).
pub fn strip_markers(text: &str) -> String {
    parse_spans(text).into_iter().map(|s| s.text).collect()
}

fn is_table_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('|') && line.len() > 1
}

fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(|cell| strip_markers(cell.trim())).collect()
}

/// `|---|:---:|` rows carry alignment only.
fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
}

fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph { spans: parse_spans(&paragraph.join("\n")) });
        paragraph.clear();
    }
}

/// Parse text into paragraphs and tables. Blank lines end a paragraph.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut lines = text.lines().peekable();

    while let Some(line) = lines.next() {
        if is_table_line(line) {
            flush(&mut paragraph, &mut blocks);
            let header = split_cells(line);
            let mut rows = Vec::new();
            while let Some(next) = lines.peek() {
                if !is_table_line(next) {
                    break;
                }
                let cells = split_cells(next);
                if !is_separator(&cells) {
                    rows.push(cells);
                }
                lines.next();
            }
            blocks.push(Block::Table { header, rows });
        } else if line.trim().is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_spans() {
        assert_eq!(
            parse_spans("Total **streams** rose"),
            vec![
                Span { text: "Total ".into(), bold: false },
                Span { text: "streams".into(), bold: true },
                Span { text: " rose".into(), bold: false },
            ]
        );
    }

    #[test]
    fn test_unmatched_marker_is_literal() {
        assert_eq!(strip_markers("a ** b"), "a ** b");
        assert_eq!(strip_markers("**x** and **y"), "x and **y");
    }

    #[test]
    fn test_paragraphs_and_table() {
        let text = "**Summary**: good\nsecond line\n\n| Track | Streams |\n|---|---:|\n| Glow | 10 |\n| **Drift** | 5 |\nAfter";
        let blocks = parse_blocks(text);
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Paragraph { spans } if spans[0].bold && spans.len() == 2));
        assert_eq!(
            blocks[1],
            Block::Table {
                header: vec!["Track".into(), "Streams".into()],
                rows: vec![vec!["Glow".into(), "10".into()], vec!["Drift".into(), "5".into()]],
            }
        );
        assert!(matches!(&blocks[2], Block::Paragraph { spans } if spans[0].text == "After"));
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("\n\n").is_empty());
    }
}
