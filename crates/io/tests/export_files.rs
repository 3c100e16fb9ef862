//! End-to-end exports of the golden transcript to files on disk.

use std::fs;
use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use statdeck_core::Section;
use statdeck_io::media::{image_filename, save_image};
use statdeck_io::{
    build_pdf_layout, build_workbook_plan, export_filename, export_to_excel, export_to_pdf, ExportKind,
    ExportOptions,
};
use statdeck_protocol::{parse_jsonl, AssistantTurn};

fn golden_sections() -> Vec<Section> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../protocol/golden/turns_v1.jsonl");
    let contents = fs::read_to_string(&path).unwrap();
    parse_jsonl(&contents).unwrap().iter().flat_map(|turn| turn.to_sections()).collect()
}

fn options() -> ExportOptions {
    let mut opts = ExportOptions::default();
    opts.now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
    opts
}

#[test]
fn golden_transcript_exports_to_pdf_file() {
    let sections = golden_sections();
    let opts = options();
    let (bytes, result) = export_to_pdf(&sections, &opts).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(export_filename(&opts.filename_prefix, ExportKind::Pdf, opts.now.date_naive()));
    fs::write(&path, &bytes).unwrap();

    assert_eq!(path.file_name().unwrap(), "chat-export-2024-06-15.pdf");
    assert!(fs::read(&path).unwrap().starts_with(b"%PDF"));
    assert_eq!(result.sections_exported, sections.len());
    assert!(result.units >= 1);
    // Image payloads never reach the PDF
    assert!(result.placeholders >= 1);
}

#[test]
fn golden_transcript_exports_to_xlsx_file() {
    let sections = golden_sections();
    let opts = options();
    let (bytes, result) = export_to_excel(&sections, &opts).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(export_filename(&opts.filename_prefix, ExportKind::Xlsx, opts.now.date_naive()));
    fs::write(&path, &bytes).unwrap();

    assert!(fs::read(&path).unwrap().starts_with(b"PK"));
    assert!(result.units >= sections.len());
}

#[test]
fn golden_sheet_names_are_unique_and_short() {
    let plan = build_workbook_plan(&golden_sections(), &options());
    let mut names: Vec<String> = plan.sheet_names().iter().map(|n| n.to_lowercase()).collect();
    assert!(names.iter().all(|n| n.chars().count() <= 31));
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total);
}

#[test]
fn golden_pdf_layout_keeps_section_order() {
    let layout = build_pdf_layout(&golden_sections(), &options());
    let texts = layout.texts();
    assert_eq!(texts.first().copied(), Some("Chat Export"));
    assert!(texts.iter().any(|t| t.starts_with("Video: ")));
}

#[test]
fn image_payload_saves_with_sniffed_extension() {
    let payload = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";
    let dir = tempfile::tempdir().unwrap();
    let date = options().now.date_naive();

    let probe = statdeck_io::media::decode_image(payload).unwrap();
    let path = dir.path().join(image_filename(probe.format, date));
    let saved = save_image(payload, &path).unwrap();

    assert_eq!(path.file_name().unwrap(), "chat-image-2024-06-15.png");
    assert_eq!(fs::read(&path).unwrap(), saved.bytes);
}

#[test]
fn bare_country_array_exports_as_country_sheet() {
    let turn: AssistantTurn = serde_json::from_value(serde_json::json!({
        "answer_str": "Top markets",
        "data_type": "dataframe",
        "display_data": [{"countryCode": "DE", "percentage": 40}, {"countryCode": "US", "percentage": 60}]
    }))
    .unwrap();
    let plan = build_workbook_plan(&turn.to_sections(), &options());
    assert_eq!(plan.malformed_sections, 0);
    assert_eq!(plan.sheets.len(), 2);
    assert_eq!(plan.sheets[1].cell_text(1, 0).as_deref(), Some("United States"));
}
