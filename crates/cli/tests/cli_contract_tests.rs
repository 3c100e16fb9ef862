// Integration tests for the sdeck shell contract: exit codes, stdout shape
// and files written.
//
// Run with: cargo test -p statdeck-cli --test cli_contract_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const PNG_1PX: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

fn sdeck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sdeck"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    // Keep user settings out of the contract
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("sdeck-contract-config"));
    cmd
}

fn golden() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../protocol/golden/turns_v1.jsonl")
}

fn write_input(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run sdeck")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

const TRACKS: &str = r#"{"answer_str": "Top tracks", "data_type": "dataframe", "display_data": {"columns": ["track", "streams", "earnings"], "data": [["Glow", 1250000, 4200.5], ["Drift", 830000, 2900]]}}"#;

// ===========================================================================
// render
// ===========================================================================

#[test]
fn render_prints_formatted_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "turn.json", TRACKS);

    let output = run(sdeck().args(["render", input.to_str().unwrap()]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Top tracks"));
    assert!(text.contains("Glow"));
    assert!(text.contains("$4.2K"), "{}", text);
}

#[test]
fn render_sort_descending_reorders_rows() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "turn.json", TRACKS);

    let asc = stdout(&run(sdeck().args(["render", input.to_str().unwrap(), "--sort", "streams"])));
    let desc = stdout(&run(sdeck().args(["render", input.to_str().unwrap(), "--sort", "streams:desc"])));
    assert!(asc.find("Drift").unwrap() < asc.find("Glow").unwrap());
    assert!(desc.find("Glow").unwrap() < desc.find("Drift").unwrap());
}

#[test]
fn render_json_is_single_view_tree() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "turn.json", TRACKS);

    let output = run(sdeck().args(["render", input.to_str().unwrap(), "--json"]));
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value["kind"], "stack");
}

#[test]
fn render_transcript_from_stdin() {
    use std::io::Write;
    use std::process::Stdio;

    let contents = fs::read_to_string(golden()).unwrap();
    let mut child = sdeck()
        .args(["render", "-", "--json"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(contents.as_bytes()).unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 14);
}

#[test]
fn render_unknown_window_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "turn.json", TRACKS);

    let output = run(sdeck().args(["render", input.to_str().unwrap(), "--window", "fortnight"]));
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("unknown time window"));
}

#[test]
fn missing_input_is_io_error() {
    let output = run(sdeck().args(["render", "does-not-exist.json"]));
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn garbage_input_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "bad.jsonl", "{\"answer_str\": \"ok\"}\nnot json at all\n");

    let output = run(sdeck().args(["render", input.to_str().unwrap()]));
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("line 2"));
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_golden_transcript_passes() {
    let output = run(sdeck().args(["validate", golden().to_str().unwrap()]));
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(!stdout(&output).contains("malformed"));
}

#[test]
fn validate_reports_malformed_sections() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "turn.json",
        r#"{"answer_str": "", "data_type": "forecast_chart", "display_data": {"title": "no data"}}"#,
    );

    let output = run(sdeck().args(["validate", input.to_str().unwrap(), "--json"]));
    assert_eq!(output.status.code(), Some(10));
    let value: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(value["valid"], false);
    assert_eq!(value["sections"][0]["status"], "malformed");
}

// ===========================================================================
// export
// ===========================================================================

#[test]
fn export_pdf_to_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.pdf");

    let output = run(sdeck().args([
        "export",
        golden().to_str().unwrap(),
        "--to",
        "pdf",
        "-o",
        out.to_str().unwrap(),
    ]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(fs::read(&out).unwrap().starts_with(b"%PDF"));
    assert!(stderr(&output).contains("Exported"));
}

#[test]
fn export_xlsx_uses_dated_default_name() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(sdeck()
        .current_dir(dir.path())
        .args(["export", golden().to_str().unwrap(), "--to", "excel", "--quiet"]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).is_empty());

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("chat-export-") && names[0].ends_with(".xlsx"), "{:?}", names);
    assert!(fs::read(dir.path().join(&names[0])).unwrap().starts_with(b"PK"));
}

// ===========================================================================
// save-media
// ===========================================================================

#[test]
fn save_media_writes_decoded_image() {
    let dir = tempfile::tempdir().unwrap();
    let turn = format!(r#"{{"answer_str": "Cover art", "data_type": "image_base64", "display_data": "{}"}}"#, PNG_1PX);
    let input = write_input(dir.path(), "turn.json", &turn);
    let out = dir.path().join("cover.png");

    let output = run(sdeck().args(["save-media", input.to_str().unwrap(), "-o", out.to_str().unwrap()]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(fs::read(&out).unwrap().starts_with(&[0x89, b'P', b'N', b'G']));
}

#[test]
fn save_media_lists_video_links() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "turn.json",
        r#"{"answer_str": "", "data_type": "video_url", "display_data": "https://cdn.example/clip.mp4"}"#,
    );

    let output = run(sdeck().args(["save-media", input.to_str().unwrap()]));
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "video: https://cdn.example/clip.mp4");
}

#[test]
fn save_media_without_media_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "turn.json", TRACKS);

    let output = run(sdeck().args(["save-media", input.to_str().unwrap()]));
    assert_eq!(output.status.code(), Some(21));
}
