// sdeck - render, validate and export assistant results from the command line

mod exit_codes;
mod input;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use statdeck_config::Settings;
use statdeck_core::{Section, SectionBody, Variant};
use statdeck_display::state::child_id;
use statdeck_display::{
    render, render_section, render_text, DisplayContext, ForecastLayout, SortDirection, TimeWindow, View, ViewState,
    ROOT_ID,
};
use statdeck_io::media::{check_video_url, decode_image, image_filename};
use statdeck_io::{export_filename, export_to_excel, export_to_pdf, ExportKind, ExportOptions};
use statdeck_protocol::Document;

use exit_codes::{
    EXIT_EXPORT, EXIT_INVALID, EXIT_IO, EXIT_MEDIA_DECODE, EXIT_NO_MEDIA, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE,
};
use input::load_document;

#[derive(Parser)]
#[command(name = "sdeck")]
#[command(about = "Render, validate and export assistant results")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/statdeck/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a turn, transcript or section list as text (or a JSON view tree)
    #[command(after_help = "\
Examples:
  sdeck render turn.json
  cat turns.jsonl | sdeck render -
  sdeck render turn.json --sort streams:desc --search pop
  sdeck render forecast.json --window 3mo
  sdeck render report.json --expand-all --json")]
    Render {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Print the view tree as JSON
        #[arg(long)]
        json: bool,

        /// Sort tables by column name, optionally `:desc`
        #[arg(long, value_name = "COL[:desc]")]
        sort: Option<String>,

        /// Filter table rows (case-insensitive substring)
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,

        /// Time window for forecast charts: all, 1y, 6mo, 3mo, 1mo, 2wk
        #[arg(long, value_name = "WINDOW")]
        window: Option<String>,

        /// Expand every collapsible block
        #[arg(long)]
        expand_all: bool,

        /// Show every forecast of a multi-forecast display at once
        #[arg(long)]
        forecast_grid: bool,
    },

    /// Report per-section validation results
    #[command(after_help = "\
Examples:
  sdeck validate turn.json
  sdeck validate turns.jsonl --json

Exit code 0 when every section is valid, 10 otherwise.")]
    Validate {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export sections to a PDF or Excel document
    #[command(after_help = "\
Examples:
  sdeck export turns.jsonl --to pdf
  sdeck export turns.jsonl --to xlsx -o report.xlsx
  cat turn.json | sdeck export - --to pdf -o - > out.pdf")]
    Export {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Output format
        #[arg(long, short = 't')]
        to: ExportFormat,

        /// Output file, or - for stdout (default: <prefix>-<date>.<ext>)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Do not print the export summary
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Save embedded images to files and list video links
    #[command(name = "save-media")]
    #[command(after_help = "\
Examples:
  sdeck save-media turn.json
  sdeck save-media turn.json -o cover.png")]
    SaveMedia {
        /// Input file, or - for stdin
        input: PathBuf,

        /// Output file for the first image; later images get -2, -3, ...
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Pdf,
    #[value(alias = "excel")]
    Xlsx,
}

impl ExportFormat {
    fn kind(self) -> ExportKind {
        match self {
            ExportFormat::Pdf => ExportKind::Pdf,
            ExportFormat::Xlsx => ExportKind::Xlsx,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn load_settings(path: Option<&Path>) -> Settings {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let settings = load_settings(cli.settings.as_deref());

    let result = match cli.command {
        Commands::Render { input, json, sort, search, window, expand_all, forecast_grid } => {
            let opts = RenderOptions { json, sort, search, window, expand_all, forecast_grid };
            cmd_render(&settings, &input, opts)
        }
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Export { input, to, output, quiet } => cmd_export(&settings, &input, to.kind(), output, quiet),
        Commands::SaveMedia { input, output } => cmd_save_media(&input, output),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EXPORT, message: msg.into(), hint: None }
    }

    /// Exit with `code` without printing anything (the command already reported).
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// render
// ============================================================================

struct RenderOptions {
    json: bool,
    sort: Option<String>,
    search: Option<String>,
    window: Option<String>,
    expand_all: bool,
    forecast_grid: bool,
}

/// `streams`, `streams:desc`, `streams:asc`
fn parse_sort(arg: &str) -> (String, SortDirection) {
    match arg.rsplit_once(':') {
        Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => (column.to_string(), SortDirection::Descending),
        Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => (column.to_string(), SortDirection::Ascending),
        _ => (arg.to_string(), SortDirection::Ascending),
    }
}

fn build_state(settings: &Settings, opts: &RenderOptions) -> Result<ViewState, CliError> {
    let mut state = ViewState::from_settings(settings, Utc::now());
    if let Some(sort) = &opts.sort {
        let (column, direction) = parse_sort(sort);
        state.set_default_sort(column, direction);
    }
    if let Some(search) = &opts.search {
        state.set_default_search(search.as_str());
    }
    if let Some(window) = &opts.window {
        let window = TimeWindow::parse(window).ok_or_else(|| {
            CliError::args(format!("unknown time window '{}'", window))
                .with_hint("use one of: all, 1y, 6mo, 3mo, 1mo, 2wk")
        })?;
        state.set_default_window(window);
    }
    if opts.expand_all {
        state.expand_all();
    }
    if opts.forecast_grid {
        state.set_default_layout(ForecastLayout::Grid);
    }
    Ok(state)
}

fn render_document(doc: &Document, state: &ViewState, ctx: &DisplayContext) -> Vec<View> {
    match doc {
        Document::Sections(items) => {
            let children = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let section = Section::from_wire_at(item, state.now);
                    render_section(&section, &child_id(ROOT_ID, i), state, ctx)
                })
                .collect();
            vec![View::stack(children)]
        }
        Document::Turn(_) | Document::Transcript(_) => doc
            .turns()
            .into_iter()
            .map(|turn| {
                let data = turn.display_data.clone().unwrap_or(Value::Null);
                render(&turn.data_type, &data, &turn.answer_str, state, ctx)
            })
            .collect(),
    }
}

fn cmd_render(settings: &Settings, input: &Path, opts: RenderOptions) -> Result<(), CliError> {
    let doc = load_document(input)?;
    let state = build_state(settings, &opts)?;
    let ctx = DisplayContext::from_settings(settings);

    let views = render_document(&doc, &state, &ctx);
    log::debug!("render: {} view(s)", views.len());

    if opts.json {
        let value = match views.as_slice() {
            [single] => serde_json::to_value(single),
            many => serde_json::to_value(many),
        }
        .map_err(|e| CliError::io(format!("failed to serialize view: {}", e)))?;
        let text = serde_json::to_string_pretty(&value).map_err(|e| CliError::io(e.to_string()))?;
        return write_stdout(&text);
    }

    let text: Vec<String> = views.iter().map(render_text).collect();
    write_stdout(text.join("\n").trim_end())
}

// ============================================================================
// validate
// ============================================================================

struct Finding {
    path: String,
    type_name: String,
    title: String,
    status: &'static str,
    reason: Option<String>,
}

fn collect_findings(sections: &[Section], prefix: &str, out: &mut Vec<Finding>) {
    for (i, section) in sections.iter().enumerate() {
        let path = if prefix.is_empty() { (i + 1).to_string() } else { format!("{}.{}", prefix, i + 1) };
        let (status, reason) = match section.body() {
            SectionBody::Ready(_) => ("ok", None),
            SectionBody::Malformed { reason, .. } => ("malformed", Some(reason.clone())),
            SectionBody::Unsupported { .. } => ("unsupported", None),
        };
        out.push(Finding {
            path: path.clone(),
            type_name: section.type_name().to_string(),
            title: section.display_title(),
            status,
            reason,
        });
        match section.variant() {
            Some(Variant::MultiSection(children)) => collect_findings(children, &path, out),
            Some(Variant::MultiForecast(set)) => collect_findings(&set.forecasts, &path, out),
            _ => {}
        }
    }
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), CliError> {
    let doc = load_document(input)?;
    let sections = doc.sections();

    let mut findings = Vec::new();
    collect_findings(&sections, "", &mut findings);
    let failures = findings.iter().filter(|f| f.status != "ok").count();

    if json {
        let report: Vec<Value> = findings
            .iter()
            .map(|f| {
                json!({
                    "path": f.path,
                    "type": f.type_name,
                    "title": f.title,
                    "status": f.status,
                    "reason": f.reason,
                })
            })
            .collect();
        let text = serde_json::to_string_pretty(&json!({
            "sections": report,
            "valid": failures == 0,
        }))
        .map_err(|e| CliError::io(e.to_string()))?;
        write_stdout(&text)?;
    } else {
        let width = findings.iter().map(|f| f.path.len()).max().unwrap_or(1);
        for f in &findings {
            let mut line = format!("{:<width$}  {:<11}  {}  {}", f.path, f.status, f.type_name, f.title, width = width);
            if let Some(reason) = &f.reason {
                line.push_str(&format!(" ({})", reason));
            }
            write_stdout(&line)?;
        }
        eprintln!("{} section(s), {} invalid", findings.len(), failures);
    }

    if failures > 0 {
        return Err(CliError::silent(EXIT_INVALID));
    }
    Ok(())
}

// ============================================================================
// export
// ============================================================================

fn cmd_export(
    settings: &Settings,
    input: &Path,
    kind: ExportKind,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let doc = load_document(input)?;
    let sections = doc.sections();
    if sections.is_empty() {
        return Err(CliError::args("nothing to export: input has no sections")
            .with_hint("turns need an answer_str or display_data"));
    }

    let opts = ExportOptions::from_settings(settings, Utc::now());
    let (bytes, result) = match kind {
        ExportKind::Pdf => export_to_pdf(&sections, &opts),
        ExportKind::Xlsx => export_to_excel(&sections, &opts),
    }
    .map_err(CliError::export)?;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(export_filename(&opts.filename_prefix, kind, opts.now.date_naive()))
    });
    if path.as_os_str() == "-" {
        io::stdout()
            .lock()
            .write_all(&bytes)
            .map_err(|e| CliError::io(format!("failed to write stdout: {}", e)))?;
    } else {
        fs::write(&path, &bytes).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
    }

    if !quiet {
        eprintln!("Exported {} ({})", path.display(), result.summary());
        if let Some(warning) = result.warning_summary() {
            eprintln!("warning: {}", warning);
        }
    }
    Ok(())
}

// ============================================================================
// save-media
// ============================================================================

enum Media<'a> {
    Image(&'a str),
    Video(&'a str),
}

fn collect_media<'a>(sections: &'a [Section], out: &mut Vec<Media<'a>>) {
    for section in sections {
        match section.variant() {
            Some(Variant::Image(payload)) => out.push(Media::Image(payload)),
            Some(Variant::Video(url)) => out.push(Media::Video(url)),
            Some(Variant::MultiSection(children)) => collect_media(children, out),
            _ => {}
        }
    }
}

/// `cover.png` -> `cover-2.png`
fn numbered_path(path: &Path, n: usize) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}-{}", stem, n),
    };
    path.with_file_name(name)
}

fn cmd_save_media(input: &Path, output: Option<PathBuf>) -> Result<(), CliError> {
    let doc = load_document(input)?;
    let sections = doc.sections();

    let mut media = Vec::new();
    collect_media(&sections, &mut media);
    if media.is_empty() {
        return Err(CliError { code: EXIT_NO_MEDIA, message: "no image or video sections found".to_string(), hint: None });
    }

    let today = Utc::now().date_naive();
    let mut saved = 0;
    for item in media {
        match item {
            Media::Image(payload) => {
                let image = decode_image(payload).map_err(|e| CliError {
                    code: EXIT_MEDIA_DECODE,
                    message: format!("image {}: {}", saved + 1, e),
                    hint: None,
                })?;
                saved += 1;
                let base = output.clone().unwrap_or_else(|| PathBuf::from(image_filename(image.format, today)));
                let path = if saved == 1 { base } else { numbered_path(&base, saved) };
                fs::write(&path, &image.bytes).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
                eprintln!("Saved {} ({} bytes, {})", path.display(), image.bytes.len(), image.format.mime_type());
            }
            Media::Video(url) => match check_video_url(url) {
                Ok(url) => write_stdout(&format!("video: {}", url))?,
                Err(e) => log::warn!("skipping video link '{}': {}", url, e),
            },
        }
    }
    Ok(())
}
